//! Error handling

use std::collections::BTreeMap;

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use ivf_estimator_core::CalculationError;
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    // Request errors
    #[error("invalid request format: {0}")]
    InvalidRequest(String),

    #[error("validation failed")]
    ValidationFailed(BTreeMap<String, String>),

    // Calculation errors
    #[error("{0}")]
    NoMatchingFormula(String),

    #[error("{0}")]
    InvalidNumericResult(String),

    // Generic errors
    #[error("{0}")]
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, mut body) = match &self {
            AppError::InvalidRequest(details) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "invalid request format", "details": details }),
            ),
            AppError::ValidationFailed(errors) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "validation failed", "errors": errors }),
            ),
            AppError::NoMatchingFormula(msg) => {
                tracing::warn!("No matching formula: {}", msg);
                (StatusCode::UNPROCESSABLE_ENTITY, json!({ "error": msg }))
            }
            AppError::InvalidNumericResult(msg) => {
                tracing::error!("Numeric error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };

        body["status"] = json!(status.as_u16());

        (status, Json(body)).into_response()
    }
}

impl From<CalculationError> for AppError {
    fn from(err: CalculationError) -> Self {
        match err {
            CalculationError::NoMatchingModel(_) => AppError::NoMatchingFormula(err.to_string()),
            CalculationError::InvalidNumericResult(_) => AppError::InvalidNumericResult(err.to_string()),
        }
    }
}
