//! gRPC transport for microsvc.
//!
//! Requires the `grpc` feature. Messages are declared with prost derives and
//! the service stubs are generated by `build.rs`, so there is no `.proto`
//! file to keep in sync.
//!
//! The idempotency key may arrive either as request metadata (`x-sole-id`)
//! or inside `session_variables`; the payload wins when both are present.
//! Guard faults come back as a normal reply with `status` set and
//! `retryable` telling the client whether resending the same key later can
//! succeed.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tonic::metadata::{KeyAndValueRef, MetadataMap};
use tonic::{Request, Response, Status};
use tracing::error;

use super::service::{error_body, Service};
use super::session::Session;

#[derive(Clone, prost::Message)]
pub struct DispatchRequest {
    #[prost(string, tag = "1")]
    pub command: String,
    /// JSON document; empty means `{}`.
    #[prost(string, tag = "2")]
    pub input: String,
    #[prost(map = "string, string", tag = "3")]
    pub session_variables: HashMap<String, String>,
}

#[derive(Clone, prost::Message)]
pub struct DispatchReply {
    /// HTTP-style status code.
    #[prost(uint32, tag = "1")]
    pub status: u32,
    /// JSON document: the handler result or `{ error, retryable }`.
    #[prost(string, tag = "2")]
    pub body: String,
    #[prost(bool, tag = "3")]
    pub retryable: bool,
}

#[derive(Clone, prost::Message)]
pub struct HealthRequest {}

#[derive(Clone, prost::Message)]
pub struct HealthReply {
    #[prost(bool, tag = "1")]
    pub ok: bool,
    #[prost(string, repeated, tag = "2")]
    pub commands: Vec<String>,
    /// `name-id` of the serving instance.
    #[prost(string, tag = "3")]
    pub instance: String,
    #[prost(string, tag = "4")]
    pub version: String,
}

include!(concat!(
    env!("OUT_DIR"),
    "/microhub.microsvc.CommandService.rs"
));

pub use command_service_client::CommandServiceClient;
pub use command_service_server::{CommandService, CommandServiceServer};

/// Serves a `Service` over the generated `CommandService` trait.
pub struct GrpcHandler {
    service: Arc<Service>,
}

impl GrpcHandler {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl CommandService for GrpcHandler {
    async fn dispatch(
        &self,
        request: Request<DispatchRequest>,
    ) -> Result<Response<DispatchReply>, Status> {
        let (metadata, _, req) = request.into_parts();
        let input = parse_input(&req.input)?;
        let session = build_session(&metadata, req.session_variables);

        let service = self.service.clone();
        let command = req.command;
        // The guard talks to its store synchronously.
        let result = tokio::task::spawn_blocking(move || service.dispatch(&command, input, session))
            .await
            .map_err(|e| {
                error!(error = %e, "command dispatch task failed");
                Status::internal("dispatch task failed")
            })?;

        let reply = match result {
            Ok(value) => DispatchReply {
                status: 200,
                body: value.to_string(),
                retryable: false,
            },
            Err(e) => DispatchReply {
                status: u32::from(e.status_code()),
                body: error_body(&e).to_string(),
                retryable: e.is_retryable(),
            },
        };
        Ok(Response::new(reply))
    }

    async fn health(
        &self,
        _request: Request<HealthRequest>,
    ) -> Result<Response<HealthReply>, Status> {
        let info = self.service.info();
        let mut commands: Vec<String> = self
            .service
            .commands()
            .into_iter()
            .map(str::to_string)
            .collect();
        commands.sort();

        Ok(Response::new(HealthReply {
            ok: true,
            commands,
            instance: format!("{}-{}", info.name, info.id),
            version: info.version.clone(),
        }))
    }
}

fn parse_input(raw: &str) -> Result<serde_json::Value, Status> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(Default::default()));
    }
    serde_json::from_str(raw).map_err(|e| Status::invalid_argument(format!("input is not JSON: {e}")))
}

/// Metadata entries first, then payload variables on top.
fn build_session(metadata: &MetadataMap, payload_vars: HashMap<String, String>) -> Session {
    let mut vars: HashMap<String, String> = metadata
        .iter()
        .filter_map(|entry| match entry {
            KeyAndValueRef::Ascii(key, value) => value
                .to_str()
                .ok()
                .map(|v| (key.as_str().to_string(), v.to_string())),
            KeyAndValueRef::Binary(..) => None,
        })
        .collect();
    vars.extend(payload_vars);
    Session::from_map(vars)
}

/// Create a `CommandServiceServer` from a shared `Service`.
pub fn grpc_server(service: Arc<Service>) -> CommandServiceServer<GrpcHandler> {
    CommandServiceServer::new(GrpcHandler::new(service))
}

/// Bind and serve the gRPC transport at the given address.
pub async fn serve_grpc(
    service: Arc<Service>,
    addr: SocketAddr,
) -> Result<(), tonic::transport::Error> {
    tonic::transport::Server::builder()
        .add_service(grpc_server(service))
        .serve(addr)
        .await
}
