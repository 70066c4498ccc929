//! Handler middleware: code that runs around every command dispatch.

use std::sync::Arc;

use serde_json::Value;

use super::context::Context;
use super::error::HandlerError;
use crate::idempotency::{GuardError, IdempotencyGuard};

/// The rest of the chain, ending in the command handler.
pub type Next<'a> = &'a dyn Fn(&Context) -> Result<Value, HandlerError>;

/// Wraps command handlers registered on a `Service`.
///
/// A middleware may call `next` once, not at all (short-circuit), and may
/// replace the result.
pub trait Middleware: Send + Sync {
    fn handle(&self, ctx: &Context, next: Next<'_>) -> Result<Value, HandlerError>;
}

impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    fn handle(&self, ctx: &Context, next: Next<'_>) -> Result<Value, HandlerError> {
        (**self).handle(ctx, next)
    }
}

/// Deduplicates commands by the idempotency key in the session.
///
/// Guard faults surface as `HandlerError::Idempotency`; the handler's own
/// errors pass through unchanged.
impl Middleware for IdempotencyGuard {
    fn handle(&self, ctx: &Context, next: Next<'_>) -> Result<Value, HandlerError> {
        let call = ctx.call_info();
        self.intercept(&call, ctx.session(), ctx.raw_input(), |_input| next(ctx))
            .map_err(|err| match err {
                GuardError::Idempotency(fault) => HandlerError::Idempotency(fault),
                GuardError::Handler(err) => err,
            })
    }
}
