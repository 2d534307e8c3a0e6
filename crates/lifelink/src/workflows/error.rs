//! Error taxonomy shared by every workflow component.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::identity::token::TokenError;
use super::outbound::UpstreamError;

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists or changed concurrently")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Discriminated failure returned by every workflow operation.
///
/// Business conditions (already verified, already cancelled, KYC pending) are typed variants;
/// only `Repository(Unavailable)` represents a genuine fault.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("authentication required: {0}")]
    Unauthenticated(String),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl WorkflowError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }

    /// Stable machine-readable code included in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            WorkflowError::Validation(_) => "VALIDATION_ERROR",
            WorkflowError::NotFound { .. } => "NOT_FOUND",
            WorkflowError::Conflict(_) => "CONFLICT",
            WorkflowError::Forbidden(_) => "FORBIDDEN",
            WorkflowError::Unauthenticated(_) => "UNAUTHENTICATED",
            WorkflowError::Token(TokenError::Expired { .. }) => "TOKEN_EXPIRED",
            WorkflowError::Token(TokenError::Invalid(_)) => "TOKEN_INVALID",
            WorkflowError::Token(TokenError::Revoked) => "TOKEN_REVOKED",
            WorkflowError::Upstream(_) => "UPSTREAM_ERROR",
            WorkflowError::Repository(RepositoryError::Conflict) => "CONFLICT",
            WorkflowError::Repository(RepositoryError::NotFound) => "NOT_FOUND",
            WorkflowError::Repository(RepositoryError::Unavailable(_)) => "STORE_UNAVAILABLE",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            WorkflowError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WorkflowError::NotFound { .. } => StatusCode::NOT_FOUND,
            WorkflowError::Conflict(_) => StatusCode::CONFLICT,
            WorkflowError::Forbidden(_) => StatusCode::FORBIDDEN,
            WorkflowError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            WorkflowError::Token(TokenError::Revoked) => StatusCode::UNAUTHORIZED,
            WorkflowError::Token(_) => StatusCode::BAD_REQUEST,
            WorkflowError::Upstream(UpstreamError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            WorkflowError::Upstream(_) => StatusCode::BAD_GATEWAY,
            WorkflowError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            WorkflowError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            WorkflowError::Repository(RepositoryError::Unavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }
}

impl IntoResponse for WorkflowError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let payload = json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        (status, Json(payload)).into_response()
    }
}
