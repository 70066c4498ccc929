//! microhub: idempotent command handling for microservices.
//!
//! - [`idempotency`]: the guard that runs a handler at most once per
//!   client-supplied key within a TTL window
//! - [`store`]: atomic key-value stores the guard synchronizes through
//! - [`microsvc`]: command service, middleware chain, HTTP/gRPC transports
//! - [`config`] and [`logging`]: process setup

pub mod config;
pub mod idempotency;
pub mod logging;
pub mod microsvc;
pub mod store;

pub use config::{ConfigError, HubConfig};
pub use idempotency::{GuardConfig, GuardError, IdempotencyError, IdempotencyGuard};
pub use microsvc::{HandlerError, ServerInfo, Service, Session};
pub use store::{AtomicStore, Exchange, InMemoryStore, StoreError};
