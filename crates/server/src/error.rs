use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shared::ErrorResponse;

use crate::db::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No valid caller identity
    #[error("{0}")]
    Unauthenticated(String),

    /// Caller lacks approval or role, or claims someone else's identity
    #[error("{0}")]
    Forbidden(String),

    /// Malformed, missing or oversized input
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Webhook authenticity check failed
    #[error("Invalid signature")]
    SignatureInvalid,

    /// Only raised on the outbound path; inbound translation failures are absorbed
    #[error("Translation failed: {0}")]
    TranslationFailed(String),

    #[error("Storage error: {0}")]
    Storage(StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => {
                AppError::NotFound(format!("{} not found: {}", entity, id))
            }
            other => AppError::Storage(other),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) | AppError::SignatureInvalid => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::TranslationFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Storage(err) => {
                tracing::error!("Storage error: {}", err);
                "Database error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::SignatureInvalid => {
                tracing::warn!("Rejected webhook with invalid signature");
                self.to_string()
            }
            other => {
                tracing::debug!("Request failed ({}): {}", status, other);
                other.to_string()
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
