use thiserror::Error;

/// Failure talking to the backing store.
///
/// Always distinct from a missing key: a store that cannot be reached must
/// never be read as "no previous value".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached (connect, IO, timeout).
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The store answered with something the adapter did not expect.
    #[error("unexpected store reply: {0}")]
    Protocol(String),
    /// An in-process store lock was poisoned.
    #[error("store lock poisoned: {0}")]
    Poisoned(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(feature = "redis")]
impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error() || err.is_connection_dropped() || err.is_timeout() {
            StoreError::Unavailable(err.to_string())
        } else {
            StoreError::Protocol(err.to_string())
        }
    }
}
