//! Idempotency guard: at-most-once handler execution per client key.
//!
//! A request carries an idempotency key in its metadata. The guard claims
//! that key with a placeholder in one atomic step. If the key was already
//! live the store hands back its value untouched, and the guard branches on it:
//!
//! - nothing: run the handler, then cache its response for the TTL
//! - the placeholder: another call is running, reject as in flight
//! - a cached response: return it without running the handler
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use microhub::idempotency::{GuardConfig, IdempotencyGuard};
//! use microhub::store::InMemoryStore;
//!
//! let guard = IdempotencyGuard::new(Arc::new(InMemoryStore::new()), GuardConfig::default())?;
//! let total: u64 = guard.intercept(&call, &metadata, &order, |order| charge(order))?;
//! ```

mod entry;
mod error;
mod guard;
mod key;
mod logger;

pub use entry::{EntryState, DEFAULT_PLACEHOLDER};
pub use error::{GuardError, IdempotencyError};
pub use guard::{FailurePolicy, GuardConfig, IdempotencyGuard, DEFAULT_KEY_PREFIX, DEFAULT_TTL};
pub use key::{extract, IdempotencyKey, MetadataSource, DEFAULT_KEY_FIELD};
pub use logger::{CallInfo, CallLogger, Completion, TracingLogger};

pub(crate) use key::lookup;
