//! HTTP transport for microsvc: maps HTTP requests to command dispatch.
//!
//! Requires the `http` feature. Uses axum for routing.
//!
//! ## Routes
//!
//! - `POST /:command`: dispatch a command. Body = JSON input, request headers → Session.
//! - `GET /health`: health check returning `{ "ok": true, "commands": [...] }`.
//!
//! Retryable failures (an idempotency key already in flight) carry a
//! `retry-after` header.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use microhub::microsvc::{self, ServerInfo, Service};
//!
//! let service = Arc::new(
//!     Service::new(ServerInfo::new("orders"))
//!         .wrap(guard)
//!         .command("order.create", |ctx| { /* ... */ })
//! );
//!
//! // Get the router to compose with other axum routes
//! let app = microsvc::router(service.clone());
//!
//! // Or serve directly
//! microsvc::serve(service, "0.0.0.0:3000").await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::error;

use super::error::HandlerError;
use super::service::{error_body, Service};
use super::session::Session;

/// Seconds a client should wait before retrying an in-flight request.
const RETRY_AFTER_SECS: &str = "1";

/// Build an axum `Router` that dispatches commands via the given service.
pub fn router(service: Arc<Service>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/:command", post(command_handler))
        .with_state(service)
}

/// Serve the service over HTTP at the given address (e.g. `"0.0.0.0:3000"`).
pub async fn serve(service: Arc<Service>, addr: &str) -> Result<(), std::io::Error> {
    let app = router(service);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

/// `GET /health` returns `{ "ok": true, "commands": [...] }`.
async fn health_handler(State(service): State<Arc<Service>>) -> impl IntoResponse {
    let commands: Vec<&str> = service.commands();
    Json(json!({ "ok": true, "commands": commands }))
}

/// `POST /:command`: dispatch a command with JSON body and headers as session.
async fn command_handler(
    State(service): State<Arc<Service>>,
    Path(command): Path<String>,
    headers: HeaderMap,
    Json(input): Json<Value>,
) -> Response {
    let session = session_from_headers(&headers);
    // Dispatch may block on the idempotency store.
    let result =
        tokio::task::spawn_blocking(move || service.dispatch(&command, input, session)).await;
    match result {
        Ok(Ok(value)) => (StatusCode::OK, Json(value)).into_response(),
        Ok(Err(e)) => error_response(&e),
        Err(join_err) => {
            error!(error = %join_err, "command dispatch task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "dispatch task failed", "retryable": false })),
            )
                .into_response()
        }
    }
}

fn error_response(err: &HandlerError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = (status, Json(error_body(err))).into_response();
    if err.is_retryable() {
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECS));
    }
    response
}

/// Extract session variables from HTTP headers.
///
/// Header names arrive lowercased and are included as-is.
fn session_from_headers(headers: &HeaderMap) -> Session {
    let mut vars = HashMap::new();
    for (name, value) in headers.iter() {
        if let Ok(v) = value.to_str() {
            vars.insert(name.as_str().to_string(), v.to_string());
        }
    }
    Session::from_map(vars)
}
