//! Authorization error types.

use crate::action::Action;
use gatehouse_common_http::HttpError;
use thiserror::Error;

/// Result type for authorization operations.
pub type AuthzResult<T> = Result<T, AuthzError>;

/// Boxed source for transport failures raised by arbitrary adapters.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Everything that can go wrong between an identity arriving and a decision
/// being reduced.
///
/// A well-formed negative decision is not an error: it is reported as
/// [`crate::Outcome::Denied`]. None of these variants may be read as a denial.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// The identity carried no usable subject.
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// An existing entity had no `id` field.
    #[error("{kind} entity has no identifier")]
    MissingIdentifier { kind: String },

    /// The entity did not serialize to an attribute map.
    #[error("{kind} entity is not an attribute map: {reason}")]
    InvalidEntity { kind: String, reason: String },

    /// Two requests in one batch named the same resource.
    #[error("resource `{0}` appears more than once in a batch")]
    DuplicateResource(String),

    /// The PDP could not be asked: network failure, timeout, non-2xx status.
    #[error("policy decision point unavailable: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The PDP answered with something that cannot be correlated to the request.
    #[error("malformed policy decision: {0}")]
    MalformedResponse(String),

    /// A decision was queried for an action that was never requested.
    #[error("action `{action}` was not requested for resource `{resource_id}`")]
    UnknownAction { resource_id: String, action: Action },

    /// The entity store lookup failed.
    #[error("entity store error: {0}")]
    Store(String),
}

impl AuthzError {
    /// Transport failure without an underlying error value.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Transport failure wrapping the adapter's own error.
    pub fn transport_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Shorthand for [`AuthzError::MalformedResponse`].
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    /// Whether the PDP was unreachable rather than consulted.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Whether the PDP broke the request/response contract.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::MalformedResponse(_) | Self::UnknownAction { .. })
    }

    /// Whether the caller supplied bad input (identity or entity shape).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidIdentity(_))
    }
}

impl From<HttpError> for AuthzError {
    fn from(err: HttpError) -> Self {
        let message = err.to_string();
        Self::transport_with(message, err)
    }
}
