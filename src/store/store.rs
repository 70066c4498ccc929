use std::time::Duration;

use super::{StoreError, StoreResult};

/// Result of an atomic exchange.
///
/// Three explicit outcomes so a transport failure can never be mistaken for
/// a cache miss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exchange {
    /// The key already held this value; nothing was written.
    Found(Vec<u8>),
    /// The key did not exist (or had expired) and now holds the new value.
    NotFound,
    /// The exchange could not be performed.
    Failure(StoreError),
}

impl Exchange {
    /// Build an outcome from an adapter reply where `None` means "no previous value".
    pub fn from_reply(reply: StoreResult<Option<Vec<u8>>>) -> Self {
        match reply {
            Ok(Some(previous)) => Exchange::Found(previous),
            Ok(None) => Exchange::NotFound,
            Err(err) => Exchange::Failure(err),
        }
    }
}

/// Key-value store with an atomic claim-or-read primitive.
///
/// Implementations must make `exchange` a single indivisible operation that
/// is visible to every process sharing the store. The in-memory store does
/// this with one mutex section; the Redis store with one Lua script.
pub trait AtomicStore: Send + Sync {
    /// If `key` holds a live value, return it and leave both the value and
    /// its expiry untouched. Otherwise write `value` with the given
    /// time-to-live and report `NotFound`. One step either way.
    fn exchange(&self, key: &str, value: &[u8], ttl: Duration) -> Exchange;

    /// Overwrite `key` with `value`, expiring after `ttl`.
    fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()>;

    /// Delete `key`. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> StoreResult<()>;
}
