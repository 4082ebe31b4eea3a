//! Authorization audit logging.

use crate::action::Action;
use crate::principal::Principal;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

/// One authorization decision as recorded in the audit log.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionAuditEvent {
    pub timestamp: DateTime<Utc>,
    pub principal_id: String,
    pub roles: Vec<String>,
    pub kind: String,
    pub resource_id: String,
    pub action: Action,
    pub granted: bool,
}

impl DecisionAuditEvent {
    pub fn new(
        principal: &Principal,
        kind: &str,
        resource_id: &str,
        action: Action,
        granted: bool,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            principal_id: principal.id().to_string(),
            roles: principal.roles().iter().cloned().collect(),
            kind: kind.to_string(),
            resource_id: resource_id.to_string(),
            action,
            granted,
        }
    }

    pub fn log(&self) {
        if self.granted {
            info!(
                event = "authz_allowed",
                principal_id = %self.principal_id,
                kind = %self.kind,
                resource_id = %self.resource_id,
                action = %self.action,
                "Authorization granted"
            );
        } else {
            info!(
                event = "authz_denied",
                principal_id = %self.principal_id,
                roles = ?self.roles,
                kind = %self.kind,
                resource_id = %self.resource_id,
                action = %self.action,
                "Authorization denied"
            );
        }
    }
}

/// Log a single-resource decision.
pub fn log_decision(
    principal: &Principal,
    kind: &str,
    resource_id: &str,
    action: Action,
    granted: bool,
) {
    DecisionAuditEvent::new(principal, kind, resource_id, action, granted).log();
}

/// Log the result of filtering a collection.
pub fn log_list_filtered(
    principal: &Principal,
    kind: &str,
    action: Action,
    candidates: usize,
    kept: usize,
) {
    info!(
        event = "authz_list_filtered",
        principal_id = %principal.id(),
        kind = %kind,
        action = %action,
        candidates,
        kept,
        "Collection filtered by authorization"
    );
}
