use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::dispatcher::{Context, RawRequest, ResponseHandle};

use super::chain::Next;

/// How a chain run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Every middleware passed control on and the handler returned this body.
    Completed(Value),
    /// A middleware ended the chain without calling `next`; the response is
    /// whatever it wrote into [`ResponseHandle`].
    Halted,
}

/// A runtime failure inside the chain. Rendered by the dispatcher as a 500
/// response whose message is this error's `Display`.
#[derive(Debug, Error)]
pub enum ChainError {
    /// A middleware signalled an error through `next`.
    #[error("{source}")]
    Middleware {
        #[source]
        source: anyhow::Error,
    },

    /// The handler returned an error.
    #[error("{source}")]
    Handler {
        #[source]
        source: anyhow::Error,
    },

    /// The chain ran past its deadline.
    #[error("request exceeded the {limit_ms}ms middleware chain deadline")]
    Timeout { limit_ms: u64 },
}

impl ChainError {
    /// Message shown to the client.
    #[must_use]
    pub fn client_message(&self) -> String {
        self.to_string()
    }
}

pub type ChainResult = Result<Flow, ChainError>;

/// Terminal handler of a chain.
pub type HandlerFn = dyn Fn(&mut Context) -> anyhow::Result<Value> + Send + Sync;

/// `(context, next)` middleware.
///
/// Call `next.run(ctx)` to continue, `next.fail(err)` to short-circuit with an
/// error, or return `Ok(Flow::Halted)` to end the chain with the response
/// written so far. Code after `next.run` sees the downstream result.
pub trait NativeMiddleware: Send + Sync {
    fn handle(&self, ctx: &mut Context, next: Next<'_>) -> ChainResult;
}

impl<F> NativeMiddleware for F
where
    F: Fn(&mut Context, Next<'_>) -> ChainResult + Send + Sync,
{
    fn handle(&self, ctx: &mut Context, next: Next<'_>) -> ChainResult {
        self(ctx, next)
    }
}

/// `(req, res, next)` middleware for externally authored code.
///
/// The middleware reports what it wants through [`ForeignNext`]; the chain
/// continues only after the middleware has returned. There is no error
/// argument: `next(err)` ends the chain, so no later middleware ever runs
/// with an error pending.
pub trait ForeignMiddleware: Send + Sync {
    fn handle(&self, req: &mut RawRequest, res: &mut ResponseHandle, next: &mut ForeignNext);
}

impl<F> ForeignMiddleware for F
where
    F: Fn(&mut RawRequest, &mut ResponseHandle, &mut ForeignNext) + Send + Sync,
{
    fn handle(&self, req: &mut RawRequest, res: &mut ResponseHandle, next: &mut ForeignNext) {
        self(req, res, next)
    }
}

/// The `next` callback handed to a [`ForeignMiddleware`].
#[derive(Debug, Default)]
pub struct ForeignNext {
    signal: Option<Result<(), anyhow::Error>>,
}

impl ForeignNext {
    /// Continue with the next middleware.
    pub fn proceed(&mut self) {
        if self.signal.is_none() {
            self.signal = Some(Ok(()));
        }
    }

    /// Stop the chain and answer with a 500 carrying `err`'s message.
    pub fn fail(&mut self, err: impl Into<anyhow::Error>) {
        self.signal = Some(Err(err.into()));
    }

    /// `next(error?)`: a `Some` error short-circuits, `None` continues.
    pub fn call(&mut self, err: Option<anyhow::Error>) {
        match err {
            Some(err) => self.fail(err),
            None => self.proceed(),
        }
    }

    pub(crate) fn take(&mut self) -> Option<Result<(), anyhow::Error>> {
        self.signal.take()
    }
}

/// A middleware, tagged with its calling convention at registration time.
#[derive(Clone)]
pub enum Middleware {
    Native(Arc<dyn NativeMiddleware>),
    Foreign(Arc<dyn ForeignMiddleware>),
}

impl Middleware {
    /// Wrap a `(context, next)` closure.
    pub fn native<F>(f: F) -> Self
    where
        F: Fn(&mut Context, Next<'_>) -> ChainResult + Send + Sync + 'static,
    {
        Middleware::Native(Arc::new(f))
    }

    /// Wrap a `(req, res, next)` closure.
    pub fn foreign<F>(f: F) -> Self
    where
        F: Fn(&mut RawRequest, &mut ResponseHandle, &mut ForeignNext) + Send + Sync + 'static,
    {
        Middleware::Foreign(Arc::new(f))
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Middleware::Native(_) => "native",
            Middleware::Foreign(_) => "foreign",
        }
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Middleware::{}", self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_next_first_signal_is_kept_unless_error() {
        let mut next = ForeignNext::default();
        next.proceed();
        next.proceed();
        assert!(matches!(next.take(), Some(Ok(()))));

        let mut next = ForeignNext::default();
        next.proceed();
        next.call(Some(anyhow::anyhow!("denied")));
        match next.take() {
            Some(Err(e)) => assert_eq!(e.to_string(), "denied"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(next.take().is_none());
    }

    #[test]
    fn chain_error_messages() {
        let err = ChainError::Middleware {
            source: anyhow::anyhow!("forbidden"),
        };
        assert_eq!(err.client_message(), "forbidden");
        let err = ChainError::Timeout { limit_ms: 50 };
        assert!(err.to_string().contains("50ms"));
    }
}
