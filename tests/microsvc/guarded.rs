//! Commands dispatched through the idempotency middleware.

use std::sync::{Arc, Mutex};

use microhub::idempotency::{
    GuardConfig, IdempotencyError, IdempotencyGuard, DEFAULT_KEY_PREFIX, DEFAULT_PLACEHOLDER,
    DEFAULT_TTL,
};
use microhub::microsvc::{Context, HandlerError, Middleware, Next, ServerInfo, Service, Session};
use microhub::store::{AtomicStore, InMemoryStore};
use serde_json::{json, Value};

use crate::support::{keyed, order_service};

#[test]
fn same_key_places_one_order() {
    let (service, placed, _) = order_service();
    let input = json!({ "sku": "A1", "quantity": 3 });

    let first = service
        .dispatch("order.place", input.clone(), keyed("cart-9"))
        .unwrap();
    let second = service
        .dispatch("order.place", input, keyed("cart-9"))
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first["order"], "ord-1");
    assert_eq!(placed.count(), 1);
}

#[test]
fn distinct_keys_place_distinct_orders() {
    let (service, placed, _) = order_service();
    let input = json!({ "sku": "A1", "quantity": 1 });

    let a = service.dispatch("order.place", input.clone(), keyed("a")).unwrap();
    let b = service.dispatch("order.place", input, keyed("b")).unwrap();

    assert_ne!(a["order"], b["order"]);
    assert_eq!(placed.count(), 2);
}

#[test]
fn missing_key_is_bad_request() {
    let (service, placed, _) = order_service();

    let err = service
        .dispatch("order.place", json!({ "sku": "A1", "quantity": 1 }), Session::new())
        .unwrap_err();

    assert!(matches!(
        err,
        HandlerError::Idempotency(IdempotencyError::MissingKey { .. })
    ));
    assert_eq!(err.status_code(), 400);
    assert!(!err.is_retryable());
    assert_eq!(placed.count(), 0);
}

#[test]
fn key_header_is_case_insensitive() {
    let (service, placed, _) = order_service();
    let session = Session::new().with("X-Sole-Id", "mixed");

    service
        .dispatch("order.place", json!({ "sku": "A1", "quantity": 1 }), session)
        .unwrap();
    service
        .dispatch("order.place", json!({ "sku": "A1", "quantity": 1 }), keyed("mixed"))
        .unwrap();
    assert_eq!(placed.count(), 1);
}

#[test]
fn in_flight_key_is_conflict() {
    let (service, placed, store) = order_service();
    let _ = store.exchange(
        &format!("{DEFAULT_KEY_PREFIX}busy"),
        DEFAULT_PLACEHOLDER,
        DEFAULT_TTL,
    );

    let err = service
        .dispatch("order.place", json!({ "sku": "A1", "quantity": 1 }), keyed("busy"))
        .unwrap_err();

    assert_eq!(err.status_code(), 409);
    assert!(err.is_retryable());
    assert_eq!(placed.count(), 0);
}

#[test]
fn rejected_command_is_not_replayed() {
    let (service, placed, store) = order_service();

    let err = service
        .dispatch("order.place", json!({ "sku": "A1", "quantity": 0 }), keyed("zero"))
        .unwrap_err();
    assert!(matches!(err, HandlerError::Rejected(_)));
    assert_eq!(err.status_code(), 422);

    // Only the in-flight marker remains, never the error.
    let entry = store.peek(&format!("{DEFAULT_KEY_PREFIX}zero")).unwrap();
    assert_eq!(entry.as_deref(), Some(DEFAULT_PLACEHOLDER));
    assert_eq!(placed.count(), 0);
}

/// Records the order middleware is entered in.
struct Tag {
    name: &'static str,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl Middleware for Tag {
    fn handle(&self, ctx: &Context, next: Next<'_>) -> Result<Value, HandlerError> {
        self.log.lock().unwrap().push(self.name);
        next(ctx)
    }
}

#[test]
fn replay_short_circuits_inner_middleware() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let guard =
        IdempotencyGuard::new(Arc::new(InMemoryStore::new()), GuardConfig::default()).unwrap();
    let service = Service::new(ServerInfo::new("tagged"))
        .wrap(Tag {
            name: "outer",
            log: log.clone(),
        })
        .wrap(guard)
        .wrap(Tag {
            name: "inner",
            log: log.clone(),
        })
        .command("noop", |_| Ok(json!({ "ok": true })));

    service.dispatch("noop", json!({}), keyed("n1")).unwrap();
    service.dispatch("noop", json!({}), keyed("n1")).unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["outer", "inner", "outer"]);
}

#[test]
fn replayed_floats_match_the_original_bits() {
    let store = Arc::new(InMemoryStore::new());
    let guard = IdempotencyGuard::new(store, GuardConfig::default()).unwrap();
    let service = Service::new(ServerInfo::new("quotes"))
        .wrap(guard)
        .command("quote.price", |_| {
            Ok(json!({
                "sum": 0.1 + 0.2,
                "tiny": 2.2250738585072014e-308,
                "huge": 1.7976931348623157e308,
                "third": 1.0 / 3.0,
            }))
        });

    let first = service
        .dispatch("quote.price", json!({}), keyed("q-1"))
        .unwrap();
    let replay = service
        .dispatch("quote.price", json!({}), keyed("q-1"))
        .unwrap();

    assert_eq!(first, replay);
    for field in ["sum", "tiny", "huge", "third"] {
        assert_eq!(
            first[field].as_f64().unwrap().to_bits(),
            replay[field].as_f64().unwrap().to_bits()
        );
    }
}
