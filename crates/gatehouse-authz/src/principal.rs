//! Principal construction from authenticated identity claims.

use crate::error::{AuthzError, AuthzResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Role assigned when the identity provider sends no role claim.
pub const DEFAULT_ROLE: &str = "user";

/// Identity claims as handed over by the authentication layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Subject identifier.
    #[serde(default)]
    pub sub: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Role or group claim. `None` means the claim was absent, which is not
    /// the same as an empty list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

impl IdentityClaims {
    /// Claims with a subject and no other fields.
    pub fn for_subject(sub: impl Into<String>) -> Self {
        Self {
            sub: Some(sub.into()),
            ..Self::default()
        }
    }

    /// Attach a role claim.
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = Some(roles.into_iter().map(Into::into).collect());
        self
    }
}

/// The acting principal, as sent to the PDP.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Principal {
    id: String,
    roles: BTreeSet<String>,
}

impl Principal {
    /// Subject identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Role set.
    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    /// Whether the principal carries `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// Maps identity claims to a [`Principal`].
///
/// The fallback role set is declared here once instead of at each call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalBuilder {
    default_roles: BTreeSet<String>,
}

impl PrincipalBuilder {
    /// Builder that assigns `default_roles` when the role claim is absent.
    pub fn new<I, S>(default_roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            default_roles: default_roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Builder with no fallback: a missing role claim yields an empty role set.
    pub fn without_default_roles() -> Self {
        Self {
            default_roles: BTreeSet::new(),
        }
    }

    /// Declared fallback roles.
    pub fn default_roles(&self) -> &BTreeSet<String> {
        &self.default_roles
    }

    /// Build the principal for one request.
    pub fn build(&self, claims: &IdentityClaims) -> AuthzResult<Principal> {
        let id = match claims.sub.as_deref() {
            Some(sub) if !sub.trim().is_empty() => sub.to_string(),
            Some(_) => return Err(AuthzError::InvalidIdentity("subject claim is empty".into())),
            None => return Err(AuthzError::InvalidIdentity("subject claim is missing".into())),
        };

        let roles = match &claims.roles {
            Some(roles) => roles.iter().cloned().collect(),
            None => self.default_roles.clone(),
        };

        Ok(Principal { id, roles })
    }
}

impl Default for PrincipalBuilder {
    fn default() -> Self {
        Self::new([DEFAULT_ROLE])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_roles_copied_from_claims() {
        let claims = IdentityClaims::for_subject("u1").with_roles(["admin", "user"]);
        let principal = PrincipalBuilder::default().build(&claims).unwrap();
        assert_eq!(principal.id(), "u1");
        assert!(principal.has_role("admin"));
        assert!(principal.has_role("user"));
    }

    #[test]
    fn test_missing_roles_use_declared_default() {
        let principal = PrincipalBuilder::default()
            .build(&IdentityClaims::for_subject("u1"))
            .unwrap();
        assert_eq!(principal.roles().iter().collect::<Vec<_>>(), vec!["user"]);

        let principal = PrincipalBuilder::new(["guest"])
            .build(&IdentityClaims::for_subject("u1"))
            .unwrap();
        assert!(principal.has_role("guest"));
    }

    #[test]
    fn test_empty_role_claim_is_kept_empty() {
        let claims = IdentityClaims::for_subject("u1").with_roles(Vec::<String>::new());
        let principal = PrincipalBuilder::default().build(&claims).unwrap();
        assert!(principal.roles().is_empty());
    }

    #[test]
    fn test_without_default_roles() {
        let principal = PrincipalBuilder::without_default_roles()
            .build(&IdentityClaims::for_subject("u1"))
            .unwrap();
        assert!(principal.roles().is_empty());
    }

    #[test]
    fn test_missing_or_blank_subject_is_invalid() {
        let builder = PrincipalBuilder::default();
        assert!(matches!(
            builder.build(&IdentityClaims::default()),
            Err(AuthzError::InvalidIdentity(_))
        ));
        assert!(matches!(
            builder.build(&IdentityClaims::for_subject("  ")),
            Err(AuthzError::InvalidIdentity(_))
        ));
    }

    #[test]
    fn test_claims_deserialize_without_roles() {
        let claims: IdentityClaims =
            serde_json::from_str(r#"{"sub":"00u1","name":"Ada"}"#).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("00u1"));
        assert!(claims.roles.is_none());
    }

    #[test]
    fn test_principal_serializes_roles_as_list() {
        let principal = PrincipalBuilder::default()
            .build(&IdentityClaims::for_subject("u1"))
            .unwrap();
        let json = serde_json::to_value(&principal).unwrap();
        assert_eq!(json, serde_json::json!({ "id": "u1", "roles": ["user"] }));
    }

    proptest! {
        #[test]
        fn prop_build_is_deterministic_and_total(
            sub in "[a-zA-Z0-9_-]{1,24}",
            roles in proptest::option::of(proptest::collection::vec("[a-z]{1,8}", 0..5)),
        ) {
            let claims = IdentityClaims {
                sub: Some(sub.clone()),
                roles,
                ..IdentityClaims::default()
            };
            let builder = PrincipalBuilder::default();
            let first = builder.build(&claims);
            let second = builder.build(&claims);
            prop_assert!(first.is_ok());
            let first = first.unwrap();
            prop_assert_eq!(first.id(), sub.as_str());
            prop_assert_eq!(Some(first), second.ok());
        }
    }
}
