//! Decision client abstraction.

use crate::decision::{AuthzRequest, Decision};
use crate::error::AuthzResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Transport to a policy decision point.
///
/// Implementations must allow many calls in flight at once without
/// serializing them, and must never report an unreachable PDP as a denial.
#[async_trait]
pub trait DecisionClient: Send + Sync {
    /// Short adapter name for logs, e.g. `http` or `local`.
    fn name(&self) -> &'static str;

    /// Ask about exactly one resource.
    ///
    /// The returned decision names the request's resource.
    async fn check_one(&self, request: &AuthzRequest) -> AuthzResult<Decision>;

    /// Ask about several resources in one round trip.
    ///
    /// Decisions may come back in any order and a resource may be missing
    /// from the answer; callers correlate by resource id. A decision for a
    /// resource that was not asked about is an error, never dropped silently.
    async fn check_many(&self, requests: &[AuthzRequest]) -> AuthzResult<Vec<Decision>>;
}

#[async_trait]
impl<T: DecisionClient + ?Sized> DecisionClient for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn check_one(&self, request: &AuthzRequest) -> AuthzResult<Decision> {
        (**self).check_one(request).await
    }

    async fn check_many(&self, requests: &[AuthzRequest]) -> AuthzResult<Vec<Decision>> {
        (**self).check_many(requests).await
    }
}
