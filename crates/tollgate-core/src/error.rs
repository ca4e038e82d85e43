//! Domain-level error types.

use thiserror::Error;

/// Domain errors - invalid values rejected before they reach a backend.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid configuration for {key}: {reason}")]
    Config { key: &'static str, reason: String },
}
