//! Error handling for the Gatehouse API server.

pub mod response;
pub mod types;

pub use types::{ApiError, ApiResult};
