//! Decision client adapters.

pub mod http;
pub mod local;

pub use http::{HttpDecisionClient, HttpPdpConfig, DEFAULT_BATCH_PATH, DEFAULT_CHECK_PATH};
pub use local::{Grant, LocalDecisionClient, Role, RolePolicy, DEFAULT_OWNER_ATTRIBUTE};
