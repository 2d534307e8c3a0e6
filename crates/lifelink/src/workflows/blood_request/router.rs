use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use super::domain::{BloodRequestForm, BloodRequestId};
use crate::workflows::error::WorkflowError;
use crate::workflows::identity::Actor;
use crate::workflows::state::WorkflowState;

pub fn blood_request_routes() -> Router<WorkflowState> {
    Router::new()
        .route("/api/v1/blood-requests", post(submit_handler))
        .route("/api/v1/blood-requests/history", get(history_handler))
        .route(
            "/api/v1/blood-requests/:request_id",
            get(get_handler).delete(delete_handler),
        )
}

pub(crate) async fn submit_handler(
    State(state): State<WorkflowState>,
    actor: Actor,
    Json(form): Json<BloodRequestForm>,
) -> Result<impl IntoResponse, WorkflowError> {
    let receipt = state.blood_requests.submit(&actor, form).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub(crate) async fn history_handler(
    State(state): State<WorkflowState>,
    actor: Actor,
) -> Result<impl IntoResponse, WorkflowError> {
    let requests = state.blood_requests.history(&actor)?;
    Ok(Json(json!({ "count": requests.len(), "requests": requests })))
}

pub(crate) async fn get_handler(
    State(state): State<WorkflowState>,
    _actor: Actor,
    Path(request_id): Path<String>,
) -> Result<impl IntoResponse, WorkflowError> {
    Ok(Json(state.blood_requests.get(&BloodRequestId(request_id))?))
}

pub(crate) async fn delete_handler(
    State(state): State<WorkflowState>,
    actor: Actor,
    Path(request_id): Path<String>,
) -> Result<impl IntoResponse, WorkflowError> {
    let removed = state
        .blood_requests
        .delete(&actor, &BloodRequestId(request_id))?;
    Ok(Json(json!({ "message": "blood request deleted", "id": removed.id })))
}
