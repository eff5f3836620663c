use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use super::chain::Next;
use super::core::{ChainResult, Flow, NativeMiddleware};
use crate::dispatcher::Context;

/// Middleware for collecting request metrics
///
/// All counters use atomic operations for thread-safe updates without locks.
/// Share it through an `Arc` to read the counters while it is registered:
///
/// ```rust,ignore
/// let metrics = Arc::new(MetricsMiddleware::new());
/// let app = Application::builder()
///     .use_middleware(Middleware::Native(metrics.clone()))
///     .build()?;
/// ```
///
/// Metrics collected:
/// - Total request count
/// - Requests that ended in a chain error
/// - Requests a middleware answered without reaching the handler
/// - Average latency of the chain
#[derive(Debug, Default)]
pub struct MetricsMiddleware {
    request_count: AtomicUsize,
    error_count: AtomicUsize,
    halted_count: AtomicUsize,
    total_latency_ns: AtomicU64,
}

impl MetricsMiddleware {
    /// Create a new metrics middleware with all counters initialized to zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the total number of requests processed
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Requests whose chain ended in an error (500)
    pub fn error_count(&self) -> usize {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Requests a middleware answered itself
    pub fn halted_count(&self) -> usize {
        self.halted_count.load(Ordering::Relaxed)
    }

    /// Calculate the average request latency
    ///
    /// Returns zero duration if no requests have been processed yet.
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }
}

impl NativeMiddleware for MetricsMiddleware {
    fn handle(&self, ctx: &mut Context, next: Next<'_>) -> ChainResult {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();

        let result = next.run(ctx);

        let elapsed = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.total_latency_ns.fetch_add(elapsed, Ordering::Relaxed);
        match &result {
            Err(_) => {
                self.error_count.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Flow::Halted) => {
                self.halted_count.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Flow::Completed(_)) => {}
        }
        result
    }
}
