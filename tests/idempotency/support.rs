//! Shared fixtures: a counting handler, a recording logger, and stores.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use microhub::idempotency::{
    CallInfo, CallLogger, Completion, GuardConfig, IdempotencyGuard, DEFAULT_KEY_FIELD,
};
use microhub::store::{AtomicStore, Exchange, InMemoryStore, ManualClock, StoreError, StoreResult};
use serde::{Deserialize, Serialize};

pub const TTL: Duration = Duration::from_secs(20);

/// Request payload used throughout the suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    pub account: String,
    pub amount: u64,
}

/// Response payload used throughout the suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: String,
    pub amount: u64,
}

pub fn charge() -> Charge {
    Charge {
        account: "acct-1".into(),
        amount: 250,
    }
}

/// Counts how many times the inner handler actually ran.
#[derive(Default)]
pub struct Counter(AtomicUsize);

impl Counter {
    pub fn hit(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Logger that remembers what it was told.
#[derive(Default)]
pub struct RecordingLogger {
    events: Mutex<Vec<String>>,
}

impl RecordingLogger {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl CallLogger for RecordingLogger {
    fn before(&self, call: &CallInfo, request: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("before {} {}", call.method, request));
    }

    fn after(&self, call: &CallInfo, completion: Completion<'_>) {
        let outcome = match (completion.response, completion.error) {
            (Some(response), _) => format!("ok {response}"),
            (None, Some(error)) => format!("err {error}"),
            (None, None) => "none".to_string(),
        };
        self.events
            .lock()
            .unwrap()
            .push(format!("after {} {}", call.method, outcome));
    }
}

/// Store whose every operation fails as if the server were down.
pub struct DownStore;

impl AtomicStore for DownStore {
    fn exchange(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Exchange {
        Exchange::Failure(StoreError::Unavailable("connection refused".into()))
    }

    fn set_with_ttl(&self, _key: &str, _value: &[u8], _ttl: Duration) -> StoreResult<()> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    fn remove(&self, _key: &str) -> StoreResult<()> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

/// Store that exchanges fine but cannot write responses back.
pub struct ReadOnlyStore(pub InMemoryStore);

impl AtomicStore for ReadOnlyStore {
    fn exchange(&self, key: &str, value: &[u8], ttl: Duration) -> Exchange {
        self.0.exchange(key, value, ttl)
    }

    fn set_with_ttl(&self, _key: &str, _value: &[u8], _ttl: Duration) -> StoreResult<()> {
        Err(StoreError::Unavailable("read only".into()))
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.0.remove(key)
    }
}

/// Store that can hold one `exchange` open after it ran, so other callers
/// can be interleaved at that point.
pub struct PausingStore {
    pub inner: InMemoryStore,
    gate: Mutex<Option<(Sender<()>, Receiver<()>)>>,
}

impl PausingStore {
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            gate: Mutex::new(None),
        }
    }

    /// The next exchange reports on the first channel once it has run, then
    /// waits for a message on the second.
    pub fn pause_next(&self) -> (Receiver<()>, Sender<()>) {
        let (paused_tx, paused_rx) = mpsc::channel();
        let (resume_tx, resume_rx) = mpsc::channel();
        *self.gate.lock().unwrap() = Some((paused_tx, resume_rx));
        (paused_rx, resume_tx)
    }
}

impl AtomicStore for PausingStore {
    fn exchange(&self, key: &str, value: &[u8], ttl: Duration) -> Exchange {
        let outcome = self.inner.exchange(key, value, ttl);
        let gate = self.gate.lock().unwrap().take();
        if let Some((paused, resume)) = gate {
            paused.send(()).unwrap();
            resume.recv().unwrap();
        }
        outcome
    }

    fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()> {
        self.inner.set_with_ttl(key, value, ttl)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.inner.remove(key)
    }
}

/// A guard over an in-memory store driven by a manual clock.
pub struct Fixture {
    pub guard: Arc<IdempotencyGuard>,
    pub store: Arc<InMemoryStore>,
    pub clock: ManualClock,
    pub logger: Arc<RecordingLogger>,
}

pub fn fixture() -> Fixture {
    fixture_with(GuardConfig::default().with_ttl(TTL))
}

pub fn fixture_with(config: GuardConfig) -> Fixture {
    let clock = ManualClock::new();
    let store = Arc::new(InMemoryStore::with_clock(Arc::new(clock.clone())));
    let logger = Arc::new(RecordingLogger::default());
    let guard = IdempotencyGuard::new(store.clone(), config)
        .unwrap()
        .with_logger(logger.clone());
    Fixture {
        guard: Arc::new(guard),
        store,
        clock,
        logger,
    }
}

pub fn meta(key: &str) -> HashMap<String, String> {
    HashMap::from([(DEFAULT_KEY_FIELD.to_string(), key.to_string())])
}

pub fn call() -> CallInfo {
    CallInfo {
        service: "payments".into(),
        instance_id: "i-1".into(),
        method: "charge".into(),
        address: "10.0.0.1:8080".into(),
        version: "1.0.0".into(),
        content_type: "application/json".into(),
    }
}
