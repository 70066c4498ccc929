//! Service: command handler registry, middleware chain, and dispatch.
//!
//! `Service` holds the instance identity, a set of named command handlers,
//! and the middleware wrapped around them. Each handler receives a
//! `Context` and returns `Result<Value, HandlerError>`.
//!
//! ## Example
//!
//! ```ignore
//! use microhub::microsvc::{ServerInfo, Service, Session};
//! use serde_json::json;
//!
//! let service = Service::new(ServerInfo::new("orders"))
//!     .wrap(guard)
//!     .command("order.create", |ctx| {
//!         let input = ctx.input::<CreateOrderInput>()?;
//!         Ok(json!({ "id": input.id }))
//!     });
//!
//! let result = service.dispatch("order.create", json!({"id": "1"}), Session::new());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::context::Context;
use super::error::HandlerError;
use super::middleware::Middleware;
use super::server_info::ServerInfo;
use super::session::Session;

type HandlerFn = dyn Fn(&Context) -> Result<Value, HandlerError> + Send + Sync;

/// A microservice that routes commands to handler functions.
pub struct Service {
    info: Arc<ServerInfo>,
    handlers: HashMap<String, Box<HandlerFn>>,
    middleware: Vec<Box<dyn Middleware>>,
}

impl Service {
    pub fn new(info: ServerInfo) -> Self {
        Self {
            info: Arc::new(info),
            handlers: HashMap::new(),
            middleware: Vec::new(),
        }
    }

    /// Register a command handler.
    ///
    /// Uses builder pattern, returns `self` for chaining.
    pub fn command<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&Context) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        self.handlers.insert(name.to_string(), Box::new(handler));
        self
    }

    /// Wrap every command handler in `middleware`.
    ///
    /// The first middleware registered is the outermost one.
    pub fn wrap<M>(mut self, middleware: M) -> Self
    where
        M: Middleware + 'static,
    {
        self.middleware.push(Box::new(middleware));
        self
    }

    /// Dispatch a command by name through the middleware chain.
    pub fn dispatch(
        &self,
        command: &str,
        input: Value,
        session: Session,
    ) -> Result<Value, HandlerError> {
        let handler = self
            .handlers
            .get(command)
            .ok_or_else(|| HandlerError::UnknownCommand(command.to_string()))?;

        let ctx = Context::new(command.to_string(), input, session, self.info.clone());
        run_chain(&self.middleware, &ctx, &**handler)
    }

    /// Dispatch a `CommandRequest`, returning a `CommandResponse`.
    pub fn dispatch_request(&self, request: &CommandRequest) -> CommandResponse {
        let session = Session::from_map(request.session_variables.clone());
        match self.dispatch(&request.command, request.input.clone(), session) {
            Ok(value) => CommandResponse {
                status: 200,
                body: value,
            },
            Err(e) => CommandResponse {
                status: e.status_code(),
                body: error_body(&e),
            },
        }
    }

    /// List registered command names.
    pub fn commands(&self) -> Vec<&str> {
        self.handlers.keys().map(|s| s.as_str()).collect()
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }
}

fn run_chain(
    chain: &[Box<dyn Middleware>],
    ctx: &Context,
    handler: &HandlerFn,
) -> Result<Value, HandlerError> {
    match chain.split_first() {
        Some((outer, rest)) => outer.handle(ctx, &|ctx| run_chain(rest, ctx, handler)),
        None => handler(ctx),
    }
}

/// JSON body reported for a failed dispatch.
pub(crate) fn error_body(err: &HandlerError) -> Value {
    serde_json::json!({ "error": err.to_string(), "retryable": err.is_retryable() })
}

// =============================================================================
// Request / Response types
// =============================================================================

/// An inbound command request.
///
/// ```json
/// {
///   "command": "order.create",
///   "input": { "sku": "A1" },
///   "session_variables": { "x-sole-id": "order-7f3a" }
/// }
/// ```
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CommandRequest {
    pub command: String,
    /// JSON input payload.
    pub input: Value,
    /// Request metadata (idempotency key, content type, ...).
    #[serde(default)]
    pub session_variables: HashMap<String, String>,
}

/// Response from dispatching a command.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CommandResponse {
    /// HTTP-style status code.
    pub status: u16,
    /// Response body (handler result or error).
    pub body: Value,
}
