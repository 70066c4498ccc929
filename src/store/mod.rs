//! Atomic key-value stores the idempotency guard synchronizes through.
//!
//! The guard only needs two primitives: an atomic exchange and a TTL-bounded
//! set. `InMemoryStore` serves a single process and the tests;
//! `RedisStore` (feature `redis`) is shared across replicas.

mod clock;
mod error;
mod in_memory;
mod store;

#[cfg(feature = "redis")]
mod redis;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{StoreError, StoreResult};
pub use in_memory::InMemoryStore;
pub use store::{AtomicStore, Exchange};

#[cfg(feature = "redis")]
pub use self::redis::RedisStore;
