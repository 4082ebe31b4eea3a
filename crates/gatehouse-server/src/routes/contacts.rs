//! Contact collection routes.
//!
//! Every handler asks the gateway first and touches the store only after an
//! `Allowed` outcome.

use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::Auth;
use crate::state::AppState;
use crate::store::{Contact, ContactPatch, NewContact};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use gatehouse_authz::Outcome;
use serde_json::{json, Value};
use tracing::info;

/// Create the contact routes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_contacts))
        .route("/new", post(create_contact))
        .route(
            "/:id",
            get(get_contact).patch(update_contact).delete(delete_contact),
        )
}

fn permit<T>(outcome: Outcome<T>) -> ApiResult<T> {
    match outcome {
        Outcome::Allowed(value) => Ok(value),
        Outcome::Denied => Err(ApiError::Forbidden),
        Outcome::NotFound => Err(ApiError::NotFound("Contact".into())),
    }
}

async fn get_contact(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(id): Path<String>,
) -> ApiResult<Json<Contact>> {
    let contact = permit(state.gateway.authorize_read(&user.identity, &id).await?)?;
    Ok(Json(contact))
}

async fn create_contact(
    State(state): State<AppState>,
    Auth(user): Auth,
    Json(new): Json<NewContact>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    permit(state.gateway.authorize_create(&user.identity).await?)?;

    let contact = state.contacts.insert(new, user.identity.sub.clone());
    info!(contact_id = %contact.id, "Created contact");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "result": "Created contact", "contact": contact })),
    ))
}

async fn update_contact(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(id): Path<String>,
    Json(patch): Json<ContactPatch>,
) -> ApiResult<Json<Value>> {
    permit(state.gateway.authorize_update(&user.identity, &id).await?)?;

    let contact = state
        .contacts
        .update(&id, patch)
        .ok_or_else(|| ApiError::NotFound("Contact".into()))?;
    Ok(Json(json!({ "result": format!("Updated contact {id}"), "contact": contact })))
}

async fn delete_contact(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    permit(state.gateway.authorize_delete(&user.identity, &id).await?)?;

    state
        .contacts
        .remove(&id)
        .ok_or_else(|| ApiError::NotFound("Contact".into()))?;
    Ok(Json(json!({ "result": format!("Contact {id} deleted") })))
}

async fn list_contacts(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> ApiResult<Json<Vec<Contact>>> {
    let contacts = state.gateway.list(&user.identity).await?;
    Ok(Json(contacts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permit_maps_outcomes() {
        assert_eq!(permit(Outcome::Allowed(3)).unwrap(), 3);
        assert!(matches!(permit::<()>(Outcome::Denied), Err(ApiError::Forbidden)));
        assert!(matches!(permit::<()>(Outcome::NotFound), Err(ApiError::NotFound(_))));
    }
}
