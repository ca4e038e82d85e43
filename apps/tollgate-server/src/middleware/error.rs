//! Error handling - every failure leaves as a structured `{ "error": ... }` body.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use std::fmt;

use tollgate_core::ports::CountError;
use tollgate_shared::ErrorBody;

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    CountLookup(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::CountLookup(msg) => write!(f, "Count lookup failed: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::CountLookup(detail) => {
                tracing::error!("Count lookup failed: {}", detail);
                ErrorBody::new("count lookup failed")
            }
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<CountError> for AppError {
    fn from(err: CountError) -> Self {
        AppError::CountLookup(err.to_string())
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;
