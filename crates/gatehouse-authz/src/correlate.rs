//! Matching decisions back to resources and reducing them.
//!
//! Correlation is always by resource identifier, never by position: a PDP is
//! free to reorder a batch answer or leave resources out of it.

use crate::action::Action;
use crate::decision::{AuthzRequest, Decision};
use crate::error::{AuthzError, AuthzResult};
use crate::resource::Identified;
use std::collections::HashMap;

/// Whether `decision` grants `action`.
///
/// Asking about an action the decision has no outcome for is an error rather
/// than a silent default in either direction.
pub fn is_allowed(decision: &Decision, action: Action) -> AuthzResult<bool> {
    decision
        .outcome(action)
        .ok_or_else(|| AuthzError::UnknownAction {
            resource_id: decision.resource_id().to_string(),
            action,
        })
}

/// Keep the resources whose decision grants `action`, in their original order.
///
/// A resource with no matching decision is treated as denied.
pub fn filter_allowed<T: Identified>(
    resources: Vec<T>,
    decisions: &[Decision],
    action: Action,
) -> AuthzResult<Vec<T>> {
    let index = DecisionIndex::build(decisions)?;
    let mut kept = Vec::with_capacity(resources.len());

    for resource in resources {
        let allowed = match index.get(resource.resource_id()) {
            Some(decision) => is_allowed(decision, action)?,
            None => false,
        };
        if allowed {
            kept.push(resource);
        }
    }

    Ok(kept)
}

/// Identifier-keyed view over a slice of decisions.
#[derive(Debug)]
pub struct DecisionIndex<'a> {
    by_id: HashMap<&'a str, &'a Decision>,
}

impl<'a> DecisionIndex<'a> {
    /// Index `decisions`. Two decisions for one resource are rejected.
    pub fn build(decisions: &'a [Decision]) -> AuthzResult<Self> {
        let mut by_id = HashMap::with_capacity(decisions.len());
        for decision in decisions {
            if by_id.insert(decision.resource_id(), decision).is_some() {
                return Err(AuthzError::malformed(format!(
                    "more than one decision for resource `{}`",
                    decision.resource_id()
                )));
            }
        }
        Ok(Self { by_id })
    }

    /// Decision for `resource_id`, if any.
    pub fn get(&self, resource_id: &str) -> Option<&'a Decision> {
        self.by_id.get(resource_id).copied()
    }

    /// Number of indexed decisions.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether no decisions were indexed.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Identifier-keyed view over a batch of requests.
#[derive(Debug)]
pub struct RequestIndex<'a> {
    by_id: HashMap<&'a str, &'a AuthzRequest>,
}

impl<'a> RequestIndex<'a> {
    /// Index `requests`. A batch naming one resource twice cannot be
    /// correlated and is rejected.
    pub fn build(requests: &'a [AuthzRequest]) -> AuthzResult<Self> {
        let mut by_id = HashMap::with_capacity(requests.len());
        for request in requests {
            if by_id.insert(request.resource_id(), request).is_some() {
                return Err(AuthzError::DuplicateResource(request.resource_id().to_string()));
            }
        }
        Ok(Self { by_id })
    }

    /// Request for `resource_id`, if any.
    pub fn get(&self, resource_id: &str) -> Option<&'a AuthzRequest> {
        self.by_id.get(resource_id).copied()
    }
}

/// A request paired with its decision, if the PDP returned one.
#[derive(Debug, Clone, PartialEq)]
pub struct Correlated {
    pub request: AuthzRequest,
    pub decision: Option<Decision>,
}

/// Requests and decisions of one operation, matched by resource id.
///
/// Entries keep request order. Lives only for the operation that built it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CorrelationSet {
    entries: Vec<Correlated>,
}

impl CorrelationSet {
    /// Match `decisions` to `requests`.
    ///
    /// Fails on duplicate request ids, duplicate decisions, and decisions for
    /// resources that were not requested. Requests left without a decision
    /// are kept with `decision: None`.
    pub fn correlate(requests: Vec<AuthzRequest>, decisions: Vec<Decision>) -> AuthzResult<Self> {
        RequestIndex::build(&requests)?;

        let mut by_id: HashMap<String, Decision> = HashMap::with_capacity(decisions.len());
        for decision in decisions {
            let id = decision.resource_id().to_string();
            if by_id.insert(id.clone(), decision).is_some() {
                return Err(AuthzError::malformed(format!(
                    "more than one decision for resource `{id}`"
                )));
            }
        }

        let entries: Vec<Correlated> = requests
            .into_iter()
            .map(|request| {
                let decision = by_id.remove(request.resource_id());
                Correlated { request, decision }
            })
            .collect();

        if let Some(stray) = by_id.keys().next() {
            return Err(AuthzError::malformed(format!(
                "decision for resource `{stray}` that was not requested"
            )));
        }

        for entry in &entries {
            if let Some(decision) = &entry.decision {
                for action in decision.allowed_actions() {
                    if !entry.request.requests(action) {
                        return Err(AuthzError::malformed(format!(
                            "decision for `{}` allows unrequested action `{action}`",
                            decision.resource_id()
                        )));
                    }
                }
            }
        }

        Ok(Self { entries })
    }

    /// Correlated entries in request order.
    pub fn iter(&self) -> impl Iterator<Item = &Correlated> {
        self.entries.iter()
    }

    /// Number of requests.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set holds no requests.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids of requested resources the PDP said nothing about.
    pub fn missing(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|entry| entry.decision.is_none())
            .map(|entry| entry.request.resource_id())
    }

    /// The returned decisions, in request order.
    pub fn into_decisions(self) -> Vec<Decision> {
        self.entries
            .into_iter()
            .filter_map(|entry| entry.decision)
            .collect()
    }
}
