//! Authentication types.

use chrono::Utc;
use gatehouse_authz::IdentityClaims;
use serde::{Deserialize, Serialize};

/// Bearer token claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    #[serde(default)]
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Role claim. Absent and empty are distinct.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Claims for `sub` valid for `expires_in` seconds.
    pub fn new(sub: impl Into<String>, expires_in: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: sub.into(),
            name: None,
            email: None,
            roles: None,
            iat: now,
            exp: now + expires_in,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    /// Check if token is expired.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// Authenticated caller, stored in request extensions by the auth layer.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub identity: IdentityClaims,
}

impl AuthUser {
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            identity: IdentityClaims {
                sub: Some(claims.sub),
                name: claims.name,
                email: claims.email,
                roles: claims.roles,
            },
        }
    }

    /// Name to greet the caller with.
    pub fn display_name(&self) -> &str {
        self.identity
            .name
            .as_deref()
            .or(self.identity.email.as_deref())
            .or(self.identity.sub.as_deref())
            .unwrap_or("there")
    }
}
