use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, put},
    Json, Router,
};
use serde_json::json;

use super::domain::{AppointmentId, AppointmentStatus, BookingForm, ResponseForm};
use crate::workflows::error::WorkflowError;
use crate::workflows::identity::Actor;
use crate::workflows::state::WorkflowState;

pub fn appointment_routes() -> Router<WorkflowState> {
    Router::new()
        .route(
            "/api/v1/appointments",
            get(list_handler).post(book_handler),
        )
        .route(
            "/api/v1/appointments/status/:status",
            get(list_by_status_handler),
        )
        .route(
            "/api/v1/appointments/:appointment_id/respond",
            put(respond_handler),
        )
        .route(
            "/api/v1/appointments/:appointment_id/cancel",
            patch(cancel_handler),
        )
}

pub(crate) async fn book_handler(
    State(state): State<WorkflowState>,
    actor: Actor,
    Json(form): Json<BookingForm>,
) -> Result<impl IntoResponse, WorkflowError> {
    let appointment = state.appointments.book(&actor, form).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

pub(crate) async fn list_handler(
    State(state): State<WorkflowState>,
    actor: Actor,
) -> Result<impl IntoResponse, WorkflowError> {
    let appointments = state.appointments.list_for(&actor, None)?;
    Ok(Json(json!({ "count": appointments.len(), "appointments": appointments })))
}

pub(crate) async fn list_by_status_handler(
    State(state): State<WorkflowState>,
    actor: Actor,
    Path(status): Path<String>,
) -> Result<impl IntoResponse, WorkflowError> {
    let status = AppointmentStatus::parse(&status).ok_or_else(|| {
        WorkflowError::validation(format!("unknown appointment status '{status}'"))
    })?;
    let appointments = state.appointments.list_for(&actor, Some(status))?;
    Ok(Json(json!({ "count": appointments.len(), "appointments": appointments })))
}

pub(crate) async fn respond_handler(
    State(state): State<WorkflowState>,
    actor: Actor,
    Path(appointment_id): Path<String>,
    Json(form): Json<ResponseForm>,
) -> Result<impl IntoResponse, WorkflowError> {
    let appointment = state
        .appointments
        .respond(&actor, &AppointmentId(appointment_id), form)
        .await?;
    Ok(Json(appointment))
}

pub(crate) async fn cancel_handler(
    State(state): State<WorkflowState>,
    actor: Actor,
    Path(appointment_id): Path<String>,
) -> Result<impl IntoResponse, WorkflowError> {
    let appointment = state
        .appointments
        .cancel(&actor, &AppointmentId(appointment_id))?;
    Ok(Json(appointment))
}
