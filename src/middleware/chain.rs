//! Continuation-passing chain executor.
//!
//! A chain is a slice of [`Middleware`]s plus a terminal handler. Each
//! middleware receives a [`Next`] that owns the rest of the chain; `Next` is
//! consumed when used, so control can be passed on at most once.

use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, warn};

use crate::dispatcher::Context;

use super::core::{ChainError, ChainResult, Flow, ForeignNext, Middleware};

/// The handler at the end of a chain. Borrowed for the duration of one run.
pub type Terminal<'a> = dyn Fn(&mut Context) -> anyhow::Result<Value> + 'a;

#[derive(Debug, Clone, Copy)]
struct Deadline {
    started: Instant,
    limit: Duration,
}

impl Deadline {
    fn check(self) -> Result<(), ChainError> {
        if self.started.elapsed() > self.limit {
            return Err(ChainError::Timeout {
                limit_ms: u64::try_from(self.limit.as_millis()).unwrap_or(u64::MAX),
            });
        }
        Ok(())
    }
}

/// A ready-to-run chain.
pub struct Chain<'a> {
    middlewares: &'a [Middleware],
    handler: &'a Terminal<'a>,
    timeout: Option<Duration>,
}

impl<'a> Chain<'a> {
    #[must_use]
    pub fn new(middlewares: &'a [Middleware], handler: &'a Terminal<'a>) -> Self {
        Self {
            middlewares,
            handler,
            timeout: None,
        }
    }

    /// Abort with [`ChainError::Timeout`] once `timeout` has elapsed. The
    /// deadline is checked before every middleware and before the handler;
    /// a middleware that is already running is not interrupted.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the chain against `ctx`.
    pub fn run(self, ctx: &mut Context) -> ChainResult {
        let next = Next {
            middlewares: self.middlewares,
            handler: self.handler,
            deadline: self.timeout.map(|limit| Deadline {
                started: Instant::now(),
                limit,
            }),
            position: 0,
        };
        next.run(ctx)
    }
}

/// The rest of a chain, as seen from inside a native middleware.
pub struct Next<'a> {
    middlewares: &'a [Middleware],
    handler: &'a Terminal<'a>,
    deadline: Option<Deadline>,
    position: usize,
}

impl Next<'_> {
    /// Pass control to the next middleware, or to the handler when none are
    /// left.
    pub fn run(self, ctx: &mut Context) -> ChainResult {
        if let Some(deadline) = self.deadline {
            deadline.check().inspect_err(|_| {
                warn!(
                    request_id = %ctx.request_id(),
                    position = self.position,
                    "Middleware chain deadline exceeded"
                );
            })?;
        }

        let Some((middleware, rest)) = self.middlewares.split_first() else {
            return (self.handler)(ctx)
                .map(Flow::Completed)
                .map_err(|source| ChainError::Handler { source });
        };

        let next = Next {
            middlewares: rest,
            handler: self.handler,
            deadline: self.deadline,
            position: self.position + 1,
        };

        match middleware {
            Middleware::Native(mw) => mw.handle(ctx, next),
            Middleware::Foreign(mw) => {
                let mut signal = ForeignNext::default();
                mw.handle(&mut ctx.request, &mut ctx.response, &mut signal);
                match signal.take() {
                    Some(Ok(())) => next.run(ctx),
                    Some(Err(err)) => next.fail(err),
                    None => {
                        debug!(
                            request_id = %ctx.request_id(),
                            position = self.position,
                            "Foreign middleware ended the chain"
                        );
                        Ok(Flow::Halted)
                    }
                }
            }
        }
    }

    /// Short-circuit: skip every remaining middleware and the handler.
    pub fn fail(self, err: impl Into<anyhow::Error>) -> ChainResult {
        let source = err.into();
        warn!(
            position = self.position,
            skipped = self.middlewares.len(),
            error = %source,
            "Middleware chain short-circuited"
        );
        Err(ChainError::Middleware { source })
    }

    /// Number of middlewares still ahead, not counting the handler.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.middlewares.len()
    }
}

/// Run `handler` behind `middlewares` with no deadline.
pub fn run_chain<'a>(
    middlewares: &'a [Middleware],
    handler: &'a Terminal<'a>,
    ctx: &mut Context,
) -> ChainResult {
    Chain::new(middlewares, handler).run(ctx)
}

