//! # Middleware Module
//!
//! Middlewares run between route matching and the handler. Each one is tagged
//! with its calling convention when it is registered:
//!
//! - [`Middleware::Native`] - `(context, next)`; may run code after `next`
//! - [`Middleware::Foreign`] - `(req, res, next)` for externally authored code
//!
//! A route's chain is assembled once at startup in a fixed order: global,
//! module (root module first), route, then method middlewares, then the
//! handler. Calling `next` with an error skips everything that is left and
//! turns into a 500 response.

mod chain;
mod core;
mod metrics;
mod tracing;

pub use chain::{run_chain, Chain, Next, Terminal};
pub use self::core::{
    ChainError, ChainResult, Flow, ForeignMiddleware, ForeignNext, HandlerFn, Middleware,
    NativeMiddleware,
};
pub use metrics::MetricsMiddleware;
pub use self::tracing::TracingMiddleware;
