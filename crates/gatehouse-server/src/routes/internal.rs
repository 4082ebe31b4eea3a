//! Internal routes for health checks.

use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;

/// Create the internal routes router.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "contacts": state.contacts.len(),
        "list_strategy": state.gateway.config().list_strategy,
    }))
}
