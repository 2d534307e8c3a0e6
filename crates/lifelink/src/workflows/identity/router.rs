use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    AccountId, KycDecision, KycDocumentKind, KycForm, KycId, PaymentPlan, Registration,
};
use super::kyc::MAX_KYC_DOCUMENT_BYTES;
use super::session::Actor;
use crate::workflows::error::WorkflowError;
use crate::workflows::state::WorkflowState;

/// Room for every required document in base64 plus the surrounding JSON.
const KYC_BODY_LIMIT: usize =
    KycDocumentKind::REQUIRED.len() * MAX_KYC_DOCUMENT_BYTES / 3 * 4 + 64 * 1024;

pub fn identity_routes() -> Router<WorkflowState> {
    Router::new()
        .route("/api/v1/auth/register", post(register_handler))
        .route("/api/v1/auth/verify/:token", post(verify_email_handler))
        .route(
            "/api/v1/auth/resend-verification",
            post(resend_verification_handler),
        )
        .route("/api/v1/auth/logout", post(logout_handler))
        .route(
            "/api/v1/hospital/kyc",
            post(submit_kyc_handler).layer(DefaultBodyLimit::max(KYC_BODY_LIMIT)),
        )
        .route("/api/v1/hospital/donors", get(search_donors_handler))
        .route("/api/v1/admin/kyc", get(list_kyc_handler))
        .route("/api/v1/admin/kyc/:kyc_id/approve", patch(approve_kyc_handler))
        .route("/api/v1/admin/kyc/:kyc_id/decline", patch(decline_kyc_handler))
        .route(
            "/api/v1/admin/accounts/:account_id",
            delete(delete_account_handler),
        )
        .route("/api/v1/payments", post(initialize_payment_handler))
        .route(
            "/api/v1/payments/:reference/verify",
            post(verify_payment_handler),
        )
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResendRequest {
    email: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PaymentRequest {
    plan: PaymentPlan,
}

pub(crate) async fn register_handler(
    State(state): State<WorkflowState>,
    Json(registration): Json<Registration>,
) -> Result<impl IntoResponse, WorkflowError> {
    let account = state.identity.register(registration).await?;
    let session = state.sessions.issue(&account)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "account": account,
            "token": session.token,
            "expiresAt": session.claims.expires_at(),
        })),
    ))
}

pub(crate) async fn verify_email_handler(
    State(state): State<WorkflowState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, WorkflowError> {
    let outcome = state.identity.verify_email(&token).await?;
    Ok(Json(outcome))
}

pub(crate) async fn resend_verification_handler(
    State(state): State<WorkflowState>,
    Json(request): Json<ResendRequest>,
) -> Result<impl IntoResponse, WorkflowError> {
    let issued = state.identity.resend_verification(&request.email).await?;
    Ok(Json(json!({
        "message": "verification email sent",
        "expiresAt": issued.claims.expires_at(),
    })))
}

pub(crate) async fn logout_handler(
    State(state): State<WorkflowState>,
    actor: Actor,
) -> Result<impl IntoResponse, WorkflowError> {
    state.sessions.revoke(&actor)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn submit_kyc_handler(
    State(state): State<WorkflowState>,
    actor: Actor,
    Json(form): Json<KycForm>,
) -> Result<impl IntoResponse, WorkflowError> {
    let submission = state.kyc.submit(&actor, form).await?;
    Ok((StatusCode::CREATED, Json(submission)))
}

pub(crate) async fn search_donors_handler(
    State(state): State<WorkflowState>,
    actor: Actor,
) -> Result<impl IntoResponse, WorkflowError> {
    let donors = state.identity.search_donors(&actor)?;
    Ok(Json(json!({ "count": donors.len(), "donors": donors })))
}

pub(crate) async fn list_kyc_handler(
    State(state): State<WorkflowState>,
    actor: Actor,
) -> Result<impl IntoResponse, WorkflowError> {
    Ok(Json(state.kyc.list(&actor)?))
}

pub(crate) async fn approve_kyc_handler(
    State(state): State<WorkflowState>,
    actor: Actor,
    Path(kyc_id): Path<String>,
) -> Result<impl IntoResponse, WorkflowError> {
    let submission = state
        .kyc
        .review(&actor, &KycId(kyc_id), KycDecision::Approve)?;
    Ok(Json(submission))
}

pub(crate) async fn decline_kyc_handler(
    State(state): State<WorkflowState>,
    actor: Actor,
    Path(kyc_id): Path<String>,
) -> Result<impl IntoResponse, WorkflowError> {
    let submission = state
        .kyc
        .review(&actor, &KycId(kyc_id), KycDecision::Decline)?;
    Ok(Json(submission))
}

pub(crate) async fn delete_account_handler(
    State(state): State<WorkflowState>,
    actor: Actor,
    Path(account_id): Path<String>,
) -> Result<impl IntoResponse, WorkflowError> {
    let removed = state
        .identity
        .delete_account(&actor, &AccountId(account_id))?;
    Ok(Json(json!({
        "message": "account deleted",
        "id": removed.id,
        "role": removed.role(),
    })))
}

pub(crate) async fn initialize_payment_handler(
    State(state): State<WorkflowState>,
    actor: Actor,
    Json(request): Json<PaymentRequest>,
) -> Result<impl IntoResponse, WorkflowError> {
    let checkout = state.payments.initialize(&actor, request.plan).await?;
    Ok((StatusCode::CREATED, Json(checkout)))
}

pub(crate) async fn verify_payment_handler(
    State(state): State<WorkflowState>,
    actor: Actor,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, WorkflowError> {
    let record = state.payments.verify(&actor, &reference).await?;
    Ok(Json(record))
}
