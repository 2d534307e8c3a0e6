use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use serde_json::json;

use crate::workflows::error::WorkflowError;
use crate::workflows::identity::Actor;
use crate::workflows::state::WorkflowState;

pub fn mailbox_routes() -> Router<WorkflowState> {
    Router::new()
        .route(
            "/api/v1/notifications",
            get(list_all_handler).delete(clear_handler),
        )
        .route("/api/v1/notifications/unread", get(list_unread_handler))
        .route(
            "/api/v1/notifications/:notification_id",
            axum::routing::delete(delete_handler),
        )
        .route(
            "/api/v1/notifications/:notification_id/read",
            patch(mark_read_handler),
        )
}

pub(crate) async fn list_all_handler(
    State(state): State<WorkflowState>,
    actor: Actor,
) -> Result<impl IntoResponse, WorkflowError> {
    Ok(Json(state.mailbox.list_all(&actor.account_id)?))
}

pub(crate) async fn list_unread_handler(
    State(state): State<WorkflowState>,
    actor: Actor,
) -> Result<impl IntoResponse, WorkflowError> {
    Ok(Json(state.mailbox.list_unread(&actor.account_id)?))
}

pub(crate) async fn mark_read_handler(
    State(state): State<WorkflowState>,
    actor: Actor,
    Path(notification_id): Path<String>,
) -> Result<impl IntoResponse, WorkflowError> {
    let entry = state
        .mailbox
        .mark_read(&actor.account_id, &notification_id)?;
    Ok(Json(entry))
}

pub(crate) async fn delete_handler(
    State(state): State<WorkflowState>,
    actor: Actor,
    Path(notification_id): Path<String>,
) -> Result<impl IntoResponse, WorkflowError> {
    let entry = state.mailbox.delete(&actor.account_id, &notification_id)?;
    Ok(Json(json!({ "message": "notification deleted", "id": entry.id })))
}

pub(crate) async fn clear_handler(
    State(state): State<WorkflowState>,
    actor: Actor,
) -> Result<impl IntoResponse, WorkflowError> {
    let removed = state.mailbox.clear(&actor.account_id)?;
    Ok(Json(json!({ "message": "notifications cleared", "removed": removed })))
}
