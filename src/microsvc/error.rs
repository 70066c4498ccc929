//! Error types for microsvc command handlers.

use thiserror::Error;

use crate::idempotency::IdempotencyError;

/// Error type for command handler operations.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// No handler registered for this command name.
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    /// Payload decode / deserialization failed.
    #[error("decode failed: {0}")]
    DecodeFailed(String),
    /// Business logic rejected the command (validation, invariant violation).
    #[error("rejected: {0}")]
    Rejected(String),
    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Missing or invalid authentication / authorization.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// The idempotency guard refused or could not process the request.
    #[error(transparent)]
    Idempotency(#[from] IdempotencyError),
    /// Other error.
    #[error("handler error: {0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::DecodeFailed(err.to_string())
    }
}

impl HandlerError {
    /// Map this error to an HTTP-style status code.
    pub fn status_code(&self) -> u16 {
        match self {
            HandlerError::UnknownCommand(_) => 404,
            HandlerError::DecodeFailed(_) => 400,
            HandlerError::Rejected(_) => 422,
            HandlerError::NotFound(_) => 404,
            HandlerError::Unauthorized(_) => 401,
            HandlerError::Idempotency(err) => match err {
                IdempotencyError::MissingKey { .. } => 400,
                IdempotencyError::InFlight { .. } => 409,
                IdempotencyError::StoreUnavailable(_) => 500,
                IdempotencyError::CorruptEntry { .. } => 500,
            },
            HandlerError::Other(_) => 500,
        }
    }

    /// Whether the same request may succeed if sent again later.
    pub fn is_retryable(&self) -> bool {
        match self {
            HandlerError::Idempotency(err) => err.is_retryable(),
            _ => false,
        }
    }
}
