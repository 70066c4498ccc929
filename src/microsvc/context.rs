//! Context passed to command handlers and middleware.
//!
//! Carries the parsed input, session metadata, and the identity of the
//! serving instance.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::HandlerError;
use super::server_info::ServerInfo;
use super::session::Session;
use crate::idempotency::CallInfo;

/// Content type assumed when the request metadata does not name one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// The context passed to every command handler.
///
/// ## Example
///
/// ```ignore
/// pub fn handle(ctx: &Context) -> Result<Value, HandlerError> {
///     let input = ctx.input::<CreateOrderInput>()?;
///     // ...
/// }
/// ```
pub struct Context {
    /// The command name being handled.
    command_name: String,
    /// Raw JSON input from the request.
    input: Value,
    session: Session,
    server: Arc<ServerInfo>,
}

impl Context {
    pub(crate) fn new(
        command_name: String,
        input: Value,
        session: Session,
        server: Arc<ServerInfo>,
    ) -> Self {
        Self {
            command_name,
            input,
            session,
            server,
        }
    }

    /// Deserialize the input payload into a typed struct.
    pub fn input<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        serde_json::from_value(self.input.clone()).map_err(|e| HandlerError::DecodeFailed(e.to_string()))
    }

    /// Get the raw JSON input.
    pub fn raw_input(&self) -> &Value {
        &self.input
    }

    /// Get the command name.
    pub fn command_name(&self) -> &str {
        &self.command_name
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn server(&self) -> &ServerInfo {
        &self.server
    }

    /// Check if the raw input contains all specified fields.
    pub fn has_fields(&self, fields: &[&str]) -> bool {
        fields.iter().all(|f| self.input.get(f).is_some())
    }

    /// Identity of this call for request logging.
    pub fn call_info(&self) -> CallInfo {
        CallInfo {
            service: self.server.name.clone(),
            instance_id: self.server.id.clone(),
            method: self.command_name.clone(),
            address: self.server.advertised_address(),
            version: self.server.version.clone(),
            content_type: self
                .session
                .get("content-type")
                .unwrap_or(DEFAULT_CONTENT_TYPE)
                .to_string(),
        }
    }
}
