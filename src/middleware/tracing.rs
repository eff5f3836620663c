use std::time::Instant;

use tracing::{field, info_span};

use super::chain::Next;
use super::core::{ChainResult, NativeMiddleware};
use crate::dispatcher::Context;

/// Opens a `request` span around the rest of the chain and records the
/// outcome on it.
///
/// Register it first so every later middleware and the handler log inside
/// the span.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMiddleware;

impl NativeMiddleware for TracingMiddleware {
    fn handle(&self, ctx: &mut Context, next: Next<'_>) -> ChainResult {
        let span = info_span!(
            "request",
            request_id = %ctx.request_id(),
            method = %ctx.method(),
            path = %ctx.path(),
            status = field::Empty,
            latency_ms = field::Empty,
        );
        let _entered = span.enter();
        let start = Instant::now();

        let result = next.run(ctx);

        let status = match &result {
            Ok(_) => ctx.response.status().unwrap_or(200),
            Err(_) => 500,
        };
        span.record("status", status);
        span.record(
            "latency_ms",
            u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        );
        result
    }
}
