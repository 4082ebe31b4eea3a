//! Authorization requests and decisions.

use crate::action::Action;
use crate::error::{AuthzError, AuthzResult};
use crate::principal::Principal;
use crate::resource::{Identified, ResourceDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One unit of work for the PDP: may `principal` perform `actions` on `resource`?
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthzRequest {
    principal: Principal,
    resource: ResourceDescriptor,
    actions: Vec<Action>,
}

impl AuthzRequest {
    /// Build a request. Repeated actions are collapsed, first occurrence wins.
    pub fn new(
        principal: Principal,
        resource: ResourceDescriptor,
        actions: impl IntoIterator<Item = Action>,
    ) -> Self {
        let mut ordered = Vec::new();
        for action in actions {
            if !ordered.contains(&action) {
                ordered.push(action);
            }
        }
        Self {
            principal,
            resource,
            actions: ordered,
        }
    }

    /// Acting principal.
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Target resource.
    pub fn resource(&self) -> &ResourceDescriptor {
        &self.resource
    }

    /// Requested actions, in request order.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Whether `action` is part of this request.
    pub fn requests(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }
}

impl Identified for AuthzRequest {
    fn resource_id(&self) -> &str {
        self.resource.id()
    }
}

/// The PDP's answer for one resource: an outcome for every requested action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    resource_id: String,
    outcomes: BTreeMap<Action, bool>,
}

impl Decision {
    /// Decision with explicit per-action outcomes.
    pub fn new(resource_id: impl Into<String>, outcomes: BTreeMap<Action, bool>) -> Self {
        Self {
            resource_id: resource_id.into(),
            outcomes,
        }
    }

    /// Decision for `request` granting exactly `allowed`.
    ///
    /// Every requested action gets an outcome. Granting an action that was
    /// never requested is a contract violation.
    pub fn for_request(
        request: &AuthzRequest,
        allowed: impl IntoIterator<Item = Action>,
    ) -> AuthzResult<Self> {
        let mut outcomes: BTreeMap<Action, bool> =
            request.actions().iter().map(|action| (*action, false)).collect();

        for action in allowed {
            match outcomes.get_mut(&action) {
                Some(outcome) => *outcome = true,
                None => {
                    return Err(AuthzError::malformed(format!(
                        "decision for `{}` allows unrequested action `{}`",
                        request.resource_id(),
                        action
                    )))
                }
            }
        }

        Ok(Self {
            resource_id: request.resource_id().to_string(),
            outcomes,
        })
    }

    /// Decision for `request` built from a wire payload.
    ///
    /// The payload must name the request's resource and only use known
    /// action names.
    pub fn from_payload(request: &AuthzRequest, payload: DecisionPayload) -> AuthzResult<Self> {
        if payload.resource_id != request.resource_id() {
            return Err(AuthzError::malformed(format!(
                "decision names resource `{}` but the request was for `{}`",
                payload.resource_id,
                request.resource_id()
            )));
        }

        let allowed = payload
            .allowed_actions
            .iter()
            .map(|name| {
                name.parse::<Action>().map_err(|e| {
                    AuthzError::malformed(format!("decision for `{}`: {e}", payload.resource_id))
                })
            })
            .collect::<AuthzResult<Vec<_>>>()?;

        Self::for_request(request, allowed)
    }

    /// Identifier of the resource this decision answers.
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// Outcome for `action`, `None` if it was not requested.
    pub fn outcome(&self, action: Action) -> Option<bool> {
        self.outcomes.get(&action).copied()
    }

    /// Actions that were granted.
    pub fn allowed_actions(&self) -> impl Iterator<Item = Action> + '_ {
        self.outcomes
            .iter()
            .filter(|(_, allowed)| **allowed)
            .map(|(action, _)| *action)
    }
}

impl Identified for Decision {
    fn resource_id(&self) -> &str {
        &self.resource_id
    }
}

/// Wire form of a decision: `{ resource_id, allowed_actions: [..] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionPayload {
    pub resource_id: String,
    #[serde(default)]
    pub allowed_actions: Vec<String>,
}

impl From<&Decision> for DecisionPayload {
    fn from(decision: &Decision) -> Self {
        Self {
            resource_id: decision.resource_id.clone(),
            allowed_actions: decision
                .allowed_actions()
                .map(|action| action.as_str().to_string())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::{IdentityClaims, PrincipalBuilder};
    use serde_json::json;

    fn request(id: &str, actions: &[Action]) -> AuthzRequest {
        let principal = PrincipalBuilder::default()
            .build(&IdentityClaims::for_subject("u1"))
            .unwrap();
        let resource = ResourceDescriptor::for_entity("contact", &json!({ "id": id })).unwrap();
        AuthzRequest::new(principal, resource, actions.iter().copied())
    }

    #[test]
    fn test_request_dedupes_actions_in_order() {
        let req = request("c1", &[Action::Update, Action::Read, Action::Update]);
        assert_eq!(req.actions(), &[Action::Update, Action::Read]);
    }

    #[test]
    fn test_request_wire_shape() {
        let req = request("c1", &[Action::Read]);
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "principal": { "id": "u1", "roles": ["user"] },
                "resource": { "kind": "contact", "id": "c1", "attributes": { "id": "c1" } },
                "actions": ["read"]
            })
        );
    }

    #[test]
    fn test_for_request_fills_unlisted_actions_as_denied() {
        let req = request("c1", &[Action::Read, Action::Update]);
        let decision = Decision::for_request(&req, [Action::Read]).unwrap();
        assert_eq!(decision.outcome(Action::Read), Some(true));
        assert_eq!(decision.outcome(Action::Update), Some(false));
        assert_eq!(decision.outcome(Action::Delete), None);
    }

    #[test]
    fn test_for_request_rejects_unrequested_grant() {
        let req = request("c1", &[Action::Read]);
        let err = Decision::for_request(&req, [Action::Delete]).unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_from_payload_checks_resource_id() {
        let req = request("c1", &[Action::Read]);
        let payload = DecisionPayload {
            resource_id: "c2".into(),
            allowed_actions: vec!["read".into()],
        };
        assert!(Decision::from_payload(&req, payload).unwrap_err().is_contract_violation());
    }

    #[test]
    fn test_from_payload_rejects_unknown_action_names() {
        let req = request("c1", &[Action::Read]);
        let payload = DecisionPayload {
            resource_id: "c1".into(),
            allowed_actions: vec!["approve".into()],
        };
        assert!(matches!(
            Decision::from_payload(&req, payload),
            Err(AuthzError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_payload_roundtrip_through_decision() {
        let req = request("c1", &[Action::Read, Action::List]);
        let decision = Decision::for_request(&req, [Action::List]).unwrap();
        let payload = DecisionPayload::from(&decision);
        assert_eq!(payload.allowed_actions, vec!["list".to_string()]);
        assert_eq!(Decision::from_payload(&req, payload).unwrap(), decision);
    }
}
