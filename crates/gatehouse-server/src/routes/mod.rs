//! Route configuration for the Gatehouse API server.

mod contacts;
mod internal;

use crate::config::ServerConfig;
use crate::error::ApiResult;
use crate::middleware::auth::{Auth, AuthLayer, MaybeAuth};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderName, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use gatehouse_authz::IdentityClaims;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Create the main application router.
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let common_middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
        .layer(PropagateRequestIdLayer::new(request_id))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::new(config.server.request_timeout()));

    Router::new()
        .route("/", get(root_handler))
        .route("/profile", get(profile_handler))
        .nest("/contacts", contacts::router())
        .nest("/internal", internal::router())
        .fallback(fallback_handler)
        .layer(AuthLayer::new(config.auth.jwt_secret.clone()))
        .layer(DefaultBodyLimit::max(config.server.body_limit_bytes))
        .layer(common_middleware)
        .with_state(state)
}

async fn root_handler(MaybeAuth(user): MaybeAuth) -> impl IntoResponse {
    match user {
        Some(user) => format!("Hello {}!", user.display_name()),
        None => "Please log in".to_string(),
    }
}

async fn profile_handler(Auth(user): Auth) -> ApiResult<Json<IdentityClaims>> {
    Ok(Json(user.identity))
}

async fn fallback_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "success": false,
            "error": {
                "code": "not_found",
                "message": "The requested resource was not found"
            }
        })),
    )
}
