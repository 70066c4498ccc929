//! Redis adapter for `AtomicStore`.
//!
//! Requires the `redis` feature. `exchange` runs as a Lua script so the
//! read and the conditional write happen in one step on the server.

use std::time::Duration;

use redis::{Client, Connection, Script};
use tracing::debug;

use super::{AtomicStore, Exchange, StoreError, StoreResult};

/// `AtomicStore` backed by a Redis server shared by every replica.
///
/// Each operation opens a connection from the shared `Client`, so concurrent
/// requests never queue behind one another inside this process.
pub struct RedisStore {
    client: Client,
    claim: Script,
}

/// Return the live value untouched, or write ARGV[1] with a PX of ARGV[2].
const CLAIM_SCRIPT: &str = r#"
local previous = redis.call('GET', KEYS[1])
if previous then
    return previous
end
redis.call('SET', KEYS[1], ARGV[1], 'PX', ARGV[2])
return false
"#;

impl RedisStore {
    /// Create a store for the given URL (e.g. `redis://127.0.0.1:6379`).
    ///
    /// Only parses the URL; connectivity problems surface per operation as
    /// `StoreError::Unavailable`.
    pub fn open(url: &str) -> StoreResult<Self> {
        let client = Client::open(url).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            claim: Script::new(CLAIM_SCRIPT),
        })
    }

    fn connection(&self) -> StoreResult<Connection> {
        self.client.get_connection().map_err(StoreError::from)
    }
}

fn ttl_millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}

impl AtomicStore for RedisStore {
    fn exchange(&self, key: &str, value: &[u8], ttl: Duration) -> Exchange {
        let reply = self.connection().and_then(|mut conn| {
            self.claim
                .key(key)
                .arg(value)
                .arg(ttl_millis(ttl))
                .invoke::<Option<Vec<u8>>>(&mut conn)
                .map_err(StoreError::from)
        });
        debug!(key, found = matches!(reply, Ok(Some(_))), "redis exchange");
        Exchange::from_reply(reply)
    }

    fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()> {
        let mut conn = self.connection()?;
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query::<()>(&mut conn)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.connection()?;
        redis::cmd("DEL").arg(key).query::<i64>(&mut conn)?;
        Ok(())
    }
}
