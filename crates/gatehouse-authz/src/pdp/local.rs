//! In-process decision point backed by a role policy.

use crate::action::Action;
use crate::client::DecisionClient;
use crate::correlate::RequestIndex;
use crate::decision::{AuthzRequest, Decision};
use crate::error::AuthzResult;
use crate::principal::Principal;
use crate::resource::ResourceDescriptor;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Attribute compared with the principal id by owner-scoped grants.
pub const DEFAULT_OWNER_ATTRIBUTE: &str = "owner";

/// A permission on one resource kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grant {
    pub kind: String,
    pub action: Action,
    /// Only applies when the principal owns the resource.
    pub owner_only: bool,
}

/// Named set of grants.
#[derive(Debug, Clone)]
pub struct Role {
    pub name: String,
    pub grants: HashSet<Grant>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            grants: HashSet::new(),
        }
    }

    pub fn with_grant(mut self, kind: &str, action: Action) -> Self {
        self.grants.insert(Grant {
            kind: kind.to_string(),
            action,
            owner_only: false,
        });
        self
    }

    pub fn with_owned_grant(mut self, kind: &str, action: Action) -> Self {
        self.grants.insert(Grant {
            kind: kind.to_string(),
            action,
            owner_only: true,
        });
        self
    }

    pub fn with_full_access(mut self, kind: &str) -> Self {
        for action in Action::ALL {
            self = self.with_grant(kind, action);
        }
        self
    }

    fn permits(&self, resource: &ResourceDescriptor, action: Action, is_owner: bool) -> bool {
        self.grants.iter().any(|grant| {
            grant.kind == resource.kind()
                && grant.action == action
                && (!grant.owner_only || is_owner)
        })
    }
}

/// Role registry evaluated locally.
#[derive(Debug, Clone)]
pub struct RolePolicy {
    roles: HashMap<String, Role>,
    owner_attribute: String,
}

impl RolePolicy {
    /// Empty policy: denies everything.
    pub fn new() -> Self {
        Self {
            roles: HashMap::new(),
            owner_attribute: DEFAULT_OWNER_ATTRIBUTE.to_string(),
        }
    }

    /// Standard roles for one resource kind:
    /// `admin` may do anything, `user` may read, list and create, and may
    /// update or delete what it owns, `viewer` may read and list.
    pub fn standard(kind: &str) -> Self {
        let mut policy = Self::new();
        policy.register(Role::new("admin").with_full_access(kind));
        policy.register(
            Role::new("user")
                .with_grant(kind, Action::Read)
                .with_grant(kind, Action::List)
                .with_grant(kind, Action::Create)
                .with_owned_grant(kind, Action::Update)
                .with_owned_grant(kind, Action::Delete),
        );
        policy.register(
            Role::new("viewer")
                .with_grant(kind, Action::Read)
                .with_grant(kind, Action::List),
        );
        policy
    }

    /// Use a different ownership attribute.
    pub fn with_owner_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.owner_attribute = attribute.into();
        self
    }

    pub fn register(&mut self, role: Role) {
        self.roles.insert(role.name.clone(), role);
    }

    pub fn get(&self, name: &str) -> Option<&Role> {
        self.roles.get(name)
    }

    /// Whether any of the principal's roles grants `action` on `resource`.
    pub fn evaluate(
        &self,
        principal: &Principal,
        resource: &ResourceDescriptor,
        action: Action,
    ) -> bool {
        let is_owner = matches!(
            resource.attributes().get(&self.owner_attribute),
            Some(Value::String(owner)) if owner == principal.id()
        );

        principal.roles().iter().any(|role_name| {
            self.roles
                .get(role_name)
                .map(|role| role.permits(resource, action, is_owner))
                .unwrap_or(false)
        })
    }
}

impl Default for RolePolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Decision client that evaluates a [`RolePolicy`] in process.
#[derive(Debug, Clone)]
pub struct LocalDecisionClient {
    policy: Arc<RolePolicy>,
}

impl LocalDecisionClient {
    pub fn new(policy: RolePolicy) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }

    pub fn policy(&self) -> &RolePolicy {
        &self.policy
    }

    fn decide(&self, request: &AuthzRequest) -> AuthzResult<Decision> {
        let allowed = request.actions().iter().copied().filter(|action| {
            self.policy
                .evaluate(request.principal(), request.resource(), *action)
        });
        Decision::for_request(request, allowed)
    }
}

#[async_trait]
impl DecisionClient for LocalDecisionClient {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn check_one(&self, request: &AuthzRequest) -> AuthzResult<Decision> {
        self.decide(request)
    }

    async fn check_many(&self, requests: &[AuthzRequest]) -> AuthzResult<Vec<Decision>> {
        RequestIndex::build(requests)?;
        requests.iter().map(|request| self.decide(request)).collect()
    }
}
