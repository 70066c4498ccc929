//! HTTP transport integration tests.
//!
//! Starts an axum server and exercises it with reqwest.

use std::sync::Arc;

use microhub::idempotency::{DEFAULT_KEY_PREFIX, DEFAULT_PLACEHOLDER, DEFAULT_TTL};
use microhub::microsvc::{self, Service};
use microhub::store::AtomicStore;
use serde_json::json;

use crate::support::order_service;

/// Bind to port 0 and return the actual address.
async fn start_server(service: Arc<Service>) -> String {
    let app = microsvc::router(service);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn health_check() {
    let (service, _, _) = order_service();
    let base = start_server(Arc::new(service)).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
    let commands = body["commands"].as_array().unwrap();
    assert!(commands.iter().any(|c| c == "order.place"));
}

#[tokio::test]
async fn retried_post_replays_response() {
    let (service, placed, _) = order_service();
    let base = start_server(Arc::new(service)).await;
    let client = reqwest::Client::new();

    let mut bodies = Vec::new();
    for _ in 0..3 {
        let resp = client
            .post(format!("{base}/order.place"))
            .header("X-Sole-Id", "checkout-42")
            .json(&json!({ "sku": "B7", "quantity": 1 }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        bodies.push(resp.json::<serde_json::Value>().await.unwrap());
    }

    assert!(bodies.iter().all(|b| b == &bodies[0]));
    assert_eq!(bodies[0]["order"], "ord-1");
    assert_eq!(placed.count(), 1);
}

#[tokio::test]
async fn missing_key_header_is_400() {
    let (service, placed, _) = order_service();
    let base = start_server(Arc::new(service)).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/order.place"))
        .json(&json!({ "sku": "B7", "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert!(resp.headers().get("retry-after").is_none());

    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("x-sole-id"));
    assert_eq!(body["retryable"], false);
    assert_eq!(placed.count(), 0);
}

#[tokio::test]
async fn in_flight_key_is_409_with_retry_after() {
    let (service, placed, store) = order_service();
    let _ = store.exchange(
        &format!("{DEFAULT_KEY_PREFIX}slow"),
        DEFAULT_PLACEHOLDER,
        DEFAULT_TTL,
    );
    let base = start_server(Arc::new(service)).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/order.place"))
        .header("x-sole-id", "slow")
        .json(&json!({ "sku": "B7", "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    assert_eq!(resp.headers()["retry-after"], "1");

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["retryable"], true);
    assert_eq!(placed.count(), 0);
}

#[tokio::test]
async fn unknown_command_is_404() {
    let (service, _, _) = order_service();
    let base = start_server(Arc::new(service)).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/order.refund"))
        .header("x-sole-id", "r1")
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
