use thiserror::Error;

use crate::store::StoreError;

/// Faults raised by the guard itself, before or instead of calling the handler.
#[derive(Debug, Error)]
pub enum IdempotencyError {
    /// The request carried no usable idempotency key.
    #[error("missing idempotency key: metadata field `{field}` is absent or empty")]
    MissingKey { field: String },

    /// Another invocation for this key has not finished yet.
    #[error("request with idempotency key {key} is already in flight")]
    InFlight { key: String },

    /// The exchange against the store failed. Never a cache miss.
    #[error("idempotency store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    /// The stored value is neither the placeholder nor a decodable response.
    #[error("cached response for idempotency key {key} is corrupt: {source}")]
    CorruptEntry {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl IdempotencyError {
    /// Whether the caller may retry the same request after a backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, IdempotencyError::InFlight { .. })
    }
}

/// Error returned by `IdempotencyGuard::intercept`.
///
/// Keeps guard faults apart from the wrapped handler's own error, which is
/// passed through untouched.
#[derive(Debug, Error)]
pub enum GuardError<E> {
    #[error(transparent)]
    Idempotency(#[from] IdempotencyError),

    #[error("{0}")]
    Handler(E),
}

impl<E> GuardError<E> {
    /// The handler's error, if this is one.
    pub fn into_handler_error(self) -> Option<E> {
        match self {
            GuardError::Handler(err) => Some(err),
            GuardError::Idempotency(_) => None,
        }
    }
}
