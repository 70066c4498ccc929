//! Request/response logging around a guarded handler invocation.
//!
//! Loggers are observers: they return nothing and cannot change what the
//! guard returns.

use std::time::Duration;

use serde::Serialize;
use tracing::info;

/// Identity of the call being logged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallInfo {
    pub service: String,
    pub instance_id: String,
    pub method: String,
    pub address: String,
    pub version: String,
    pub content_type: String,
}

impl CallInfo {
    /// `service-instance`, the form used in log lines.
    pub fn service_instance(&self) -> String {
        if self.instance_id.is_empty() {
            self.service.clone()
        } else {
            format!("{}-{}", self.service, self.instance_id)
        }
    }
}

/// Outcome of an inner handler call, as seen by a logger.
#[derive(Debug, Clone, Copy)]
pub struct Completion<'a> {
    pub elapsed: Duration,
    pub response: Option<&'a str>,
    pub error: Option<&'a str>,
}

/// Observer invoked before and after the inner handler runs.
pub trait CallLogger: Send + Sync {
    fn before(&self, call: &CallInfo, request: &str);
    fn after(&self, call: &CallInfo, completion: Completion<'_>);
}

/// Emits `HUB_REQ` / `HUB_RSP` events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl CallLogger for TracingLogger {
    fn before(&self, call: &CallInfo, request: &str) {
        info!(
            target: "microhub::hub",
            service = %call.service_instance(),
            method = %call.method,
            address = %call.address,
            version = %call.version,
            content_type = %call.content_type,
            request,
            "HUB_REQ"
        );
    }

    fn after(&self, call: &CallInfo, completion: Completion<'_>) {
        info!(
            target: "microhub::hub",
            duration_ms = completion.elapsed.as_secs_f64() * 1000.0,
            service = %call.service_instance(),
            method = %call.method,
            address = %call.address,
            version = %call.version,
            content_type = %call.content_type,
            response = completion.response.unwrap_or(""),
            error = completion.error.unwrap_or(""),
            "HUB_RSP"
        );
    }
}

/// Render a value for a log line. Never fails.
pub(crate) fn render<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|err| format!("<unserializable: {err}>"))
}
