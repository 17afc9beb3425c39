//! Maps engine errors onto HTTP responses.
//!
//! Every failure body has the same shape: `{"error": <kind>, "message": ...}`
//! plus `fields` for validation errors and `reason` for conflicts.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use tracing::error;
use vr_core::error::AppError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            Self::App(AppError::ValidationError(_)) => "validation",
            Self::App(AppError::Conflict(_)) => "conflict",
            Self::App(AppError::NotFound(_, _)) => "not_found",
            Self::App(AppError::Forbidden(_)) => "forbidden",
            Self::App(AppError::InvalidTransition { .. }) => "invalid_transition",
            Self::App(AppError::StoreUnavailable(_)) => "store_unavailable",
            Self::Unauthenticated(_) => "unauthenticated",
            Self::BadRequest(_) => "bad_request",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::App(AppError::ValidationError(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::App(AppError::Conflict(_)) => StatusCode::CONFLICT,
            Self::App(AppError::InvalidTransition { .. }) => StatusCode::CONFLICT,
            Self::App(AppError::NotFound(_, _)) => StatusCode::NOT_FOUND,
            Self::App(AppError::Forbidden(_)) => StatusCode::FORBIDDEN,
            Self::App(AppError::StoreUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::App(AppError::ValidationError(errors)) => json!({
                "error": self.kind(),
                "message": "the request has invalid fields",
                "fields": errors,
            }),
            Self::App(AppError::Conflict(reason)) => json!({
                "error": self.kind(),
                "message": reason.to_string(),
                "reason": reason,
            }),
            Self::App(AppError::StoreUnavailable(detail)) => {
                // Store details stay in the log.
                error!(%detail, "store unavailable");
                json!({
                    "error": self.kind(),
                    "message": "service temporarily unavailable",
                })
            }
            other => json!({
                "error": self.kind(),
                "message": other.to_string(),
            }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
