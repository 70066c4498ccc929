//! microsvc: command handler framework with middleware.
//!
//! Build microservices by registering command handlers on a `Service` and
//! wrapping them in middleware such as the idempotency guard. Each handler
//! receives a `Context` with the input payload, session metadata, and the
//! identity of the serving instance.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use microhub::idempotency::{GuardConfig, IdempotencyGuard};
//! use microhub::microsvc::{self, ServerInfo, Service, Session};
//! use microhub::store::InMemoryStore;
//! use serde_json::json;
//!
//! let guard = IdempotencyGuard::new(Arc::new(InMemoryStore::new()), GuardConfig::default())?;
//! let service = Arc::new(
//!     Service::new(ServerInfo::new("orders"))
//!         .wrap(guard)
//!         .command("order.create", |ctx| {
//!             let input = ctx.input::<CreateOrderInput>()?;
//!             Ok(json!({ "id": input.id }))
//!         })
//! );
//!
//! // Direct dispatch; the session must carry the idempotency key.
//! let session = Session::new().with("x-sole-id", "order-7f3a");
//! let result = service.dispatch("order.create", json!({ "id": "o1" }), session);
//!
//! // HTTP transport (requires "http" feature)
//! // microsvc::serve(service, "0.0.0.0:3000").await?;
//! ```

mod context;
mod error;
mod middleware;
mod server_info;
mod service;
mod session;

pub use context::{Context, DEFAULT_CONTENT_TYPE};
pub use error::HandlerError;
pub use middleware::{Middleware, Next};
pub use server_info::ServerInfo;
pub use service::{CommandRequest, CommandResponse, Service};
pub use session::Session;

// HTTP transport (requires "http" feature)
#[cfg(feature = "http")]
mod http;
#[cfg(feature = "http")]
pub use http::{router, serve};

// gRPC transport (requires "grpc" feature)
#[cfg(feature = "grpc")]
pub mod grpc;
#[cfg(feature = "grpc")]
pub use grpc::{grpc_server, serve_grpc};

/// Wire protocol a service is exposed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Http,
    Grpc,
}

impl std::str::FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Transport::Http),
            "grpc" => Ok(Transport::Grpc),
            other => Err(format!("unknown transport: {other}")),
        }
    }
}
