//! Error handling

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::logic::calibration::CalibrationError;
use crate::logic::ledger::LedgerError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    /// Bad upload schema or rows; the whole batch was rejected.
    MalformedInput(String),
    /// The ledger could not durably commit; the caller may retry.
    StoreUnavailable(String),
    /// The persisted chain failed verification; surfaced, never repaired.
    ChainCorrupted { sequence: u64, reason: String },
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::MalformedInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::StoreUnavailable(msg) => {
                tracing::error!("Ledger unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Ledger store unavailable, retry later".to_string(),
                )
            }
            AppError::ChainCorrupted { sequence, reason } => {
                tracing::error!("Ledger corrupted at sequence {}: {}", sequence, reason);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ledger chain failed verification".to_string(),
                )
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Unavailable(io) => AppError::StoreUnavailable(io.to_string()),
            LedgerError::Corrupted { sequence, reason } => {
                AppError::ChainCorrupted { sequence, reason }
            }
        }
    }
}

impl From<CalibrationError> for AppError {
    fn from(err: CalibrationError) -> Self {
        match err {
            CalibrationError::Ledger(inner) => inner.into(),
            other => AppError::MalformedInput(other.to_string()),
        }
    }
}
