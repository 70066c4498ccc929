use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::{AtomicStore, Clock, Exchange, StoreError, StoreResult, SystemClock};

/// How often writes sweep out expired entries.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

struct Entries {
    map: HashMap<String, Entry>,
    next_sweep: Instant,
}

impl Entries {
    fn live(&self, key: &str, now: Instant) -> Option<&Entry> {
        self.map.get(key).filter(|entry| entry.expires_at > now)
    }

    /// Drop every expired entry once per `interval`. Keys are usually
    /// unique per operation, so lazily expiring on access alone would let
    /// the map grow forever.
    fn sweep(&mut self, now: Instant, interval: Duration) {
        if now < self.next_sweep {
            return;
        }
        self.map.retain(|_, entry| entry.expires_at > now);
        self.next_sweep = now + interval;
    }

    fn insert(&mut self, key: &str, value: &[u8], expires_at: Instant) {
        self.map.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at,
            },
        );
    }
}

/// In-process store backed by a `Mutex<HashMap>`.
///
/// The default store and the one the tests run against. Every operation is a
/// single critical section, so `exchange` is atomic for all guards sharing
/// the same instance (one process). Expired entries read as absent and are
/// purged by a periodic sweep on write.
pub struct InMemoryStore {
    entries: Mutex<Entries>,
    clock: Arc<dyn Clock>,
    sweep_interval: Duration,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Use a custom time source, e.g. a `ManualClock` in tests.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        InMemoryStore {
            entries: Mutex::new(Entries {
                map: HashMap::new(),
                next_sweep: now + DEFAULT_SWEEP_INTERVAL,
            }),
            clock,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        let now = self.clock.now();
        if let Ok(entries) = self.entries.get_mut() {
            entries.next_sweep = now + interval;
        }
        self.sweep_interval = interval;
        self
    }

    /// Current (unexpired) value for `key`, without modifying it.
    pub fn peek(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let now = self.clock.now();
        let entries = self.entries()?;
        Ok(entries.live(key, now).map(|entry| entry.value.clone()))
    }

    /// Number of unexpired entries.
    pub fn len(&self) -> StoreResult<usize> {
        let now = self.clock.now();
        let entries = self.entries()?;
        Ok(entries.map.values().filter(|e| e.expires_at > now).count())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    fn entries(&self) -> StoreResult<MutexGuard<'_, Entries>> {
        self.entries
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomicStore for InMemoryStore {
    fn exchange(&self, key: &str, value: &[u8], ttl: Duration) -> Exchange {
        let now = self.clock.now();
        let mut entries = match self.entries() {
            Ok(entries) => entries,
            Err(err) => return Exchange::Failure(err),
        };
        if let Some(existing) = entries.live(key, now) {
            return Exchange::Found(existing.value.clone());
        }
        entries.sweep(now, self.sweep_interval);
        entries.insert(key, value, now + ttl);
        Exchange::NotFound
    }

    fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()> {
        let now = self.clock.now();
        let mut entries = self.entries()?;
        entries.sweep(now, self.sweep_interval);
        entries.insert(key, value, now + ttl);
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.entries()?.map.remove(key);
        Ok(())
    }
}
