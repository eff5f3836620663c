//! Dispatcher core: the per-request hot path.
//!
//! A request goes through four steps:
//!
//! 1. **Normalize**: convert the method, split the query string off the path
//!    and pick up (or mint) the request id.
//! 2. **Resolve**: consult the [`ResolvedRouteCache`], falling back to the
//!    router's trie walk on a miss.
//! 3. **Run**: build a [`Context`] and run the route's middleware chain with
//!    the route handler at the end.
//! 4. **Render**: turn the chain outcome into a [`HandlerResponse`], stamping
//!    default headers and the request id.
//!
//! Every failure ends up as a response; `dispatch` never returns an error.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::method::HttpMethod;
use crate::middleware::{Chain, ChainError, Flow, Terminal};
use crate::router::{Lookup, RouteEntry, Router};

use super::cache::{CachedRoute, ResolvedRouteCache};
use super::context::{parse_query, split_target, Context, IncomingRequest, RawRequest};
use super::response::{find_header, upsert_header, HandlerResponse, HeaderVec};

/// Routes requests to the handlers registered in a [`Router`].
///
/// Shared across threads behind an `Arc`; all per-request state lives in the
/// [`Context`] built for that request.
pub struct Dispatcher {
    router: Arc<Router>,
    cache: Option<ResolvedRouteCache>,
    default_headers: HeaderVec,
    chain_timeout: Option<Duration>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("router", &self.router)
            .field("cache", &self.cache.as_ref().map(ResolvedRouteCache::len))
            .field("default_headers", &self.default_headers)
            .field("chain_timeout", &self.chain_timeout)
            .finish()
    }
}

impl Dispatcher {
    /// A dispatcher with an unbounded route cache and no chain deadline.
    #[must_use]
    pub fn new(router: Arc<Router>) -> Self {
        Self {
            router,
            cache: Some(ResolvedRouteCache::new(None)),
            default_headers: HeaderVec::new(),
            chain_timeout: None,
        }
    }

    /// Replace the route cache; `None` disables caching.
    #[must_use]
    pub fn with_cache(mut self, cache: Option<ResolvedRouteCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Header added to every response that does not already carry it.
    #[must_use]
    pub fn with_default_header(mut self, name: &str, value: impl Into<String>) -> Self {
        upsert_header(&mut self.default_headers, name, value.into());
        self
    }

    #[must_use]
    pub fn with_chain_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.chain_timeout = timeout;
        self
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    #[must_use]
    pub fn cache(&self) -> Option<&ResolvedRouteCache> {
        self.cache.as_ref()
    }

    /// Number of cached route resolutions, or zero with caching disabled.
    #[must_use]
    pub fn cached_routes(&self) -> usize {
        self.cache.as_ref().map_or(0, ResolvedRouteCache::len)
    }

    /// Dispatch one request.
    pub fn dispatch(&self, request: IncomingRequest) -> HandlerResponse {
        let started = Instant::now();
        let IncomingRequest {
            method,
            path: target,
            headers,
            body,
            file,
        } = request;
        let request_id = RequestId::from_header_or_new(find_header(&headers, REQUEST_ID_HEADER));
        let (path, query) = split_target(&target);

        let mut response = match HttpMethod::try_from(&method) {
            Ok(method) => {
                let request = RawRequest {
                    request_id,
                    method,
                    path: path.to_string(),
                    headers,
                    body,
                    file,
                    locals: Default::default(),
                };
                self.dispatch_parsed(request, query)
            }
            Err(unsupported) => {
                warn!(
                    request_id = %request_id,
                    method = %unsupported.0,
                    path = %path,
                    "Unsupported HTTP method"
                );
                HandlerResponse::error(405, &format!("{method}: '/{path}' is not allowed!"))
            }
        };

        for (name, value) in &self.default_headers {
            if response.get_header(name).is_none() {
                response.set_header(name, value.clone());
            }
        }
        response.set_header(REQUEST_ID_HEADER, request_id.to_string());

        info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = response.status,
            latency_ms = started.elapsed().as_millis() as u64,
            "Request complete"
        );
        response
    }

    fn dispatch_parsed(&self, request: RawRequest, query: Option<&str>) -> HandlerResponse {
        let method = request.method;
        let display_path = format!("/{}", request.path);

        let cached = self
            .cache
            .as_ref()
            .and_then(|cache| cache.get(method, &request.path));
        let (entry, params, from_cache) = match cached {
            Some(CachedRoute { entry, params }) => (entry, params, true),
            None => match self.router.find(method, &request.path) {
                Lookup::Matched(matched) => (matched.entry, matched.path_params, false),
                Lookup::MethodNotAllowed { allowed } => {
                    return if method == HttpMethod::Options {
                        HandlerResponse::options(&allowed)
                    } else {
                        HandlerResponse::method_not_allowed(method, &display_path, &allowed)
                    };
                }
                Lookup::NotFound => return HandlerResponse::not_found(method, &display_path),
            },
        };

        debug!(
            request_id = %request.request_id,
            route_pattern = %entry.pattern,
            handler = %entry.handler.describe(),
            from_cache,
            "Route resolved"
        );

        let normalized_path = request.path.clone();
        let query = query.map(parse_query).unwrap_or_default();
        let mut ctx = Context::new(request, params.clone(), query);
        let outcome = self.run_chain(&entry, &mut ctx);

        if outcome.is_ok() && !from_cache {
            if let Some(cache) = &self.cache {
                cache.insert(method, &normalized_path, CachedRoute { entry, params });
            }
        }
        render(ctx, outcome)
    }

    fn run_chain(&self, entry: &Arc<RouteEntry>, ctx: &mut Context) -> Result<Flow, ChainError> {
        let method = entry.method;
        let handler: &Terminal<'_> = &|ctx: &mut Context| entry.handler.invoke(method, ctx);
        let chain = Chain::new(&entry.middlewares, handler).with_timeout(self.chain_timeout);

        match catch_unwind(AssertUnwindSafe(|| chain.run(ctx))) {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(
                    request_id = %ctx.request_id(),
                    handler = %entry.handler.describe(),
                    panic_message = %message,
                    "Handler panicked"
                );
                Err(ChainError::Handler {
                    source: anyhow::anyhow!("handler panicked: {message}"),
                })
            }
        }
    }
}

/// Turn a chain outcome into the response the client receives.
fn render(ctx: Context, outcome: Result<Flow, ChainError>) -> HandlerResponse {
    let request_id = ctx.request_id();
    let (status, mut headers, sent) = ctx.response.into_parts();

    let (status, body) = match outcome {
        Ok(Flow::Completed(body)) => (status.unwrap_or(200), body),
        Ok(Flow::Halted) => (status.unwrap_or(200), sent.unwrap_or_default()),
        Err(err) => {
            error!(
                request_id = %request_id,
                error = %err,
                "Request failed"
            );
            return HandlerResponse::error(500, &err.client_message());
        }
    };

    if find_header(&headers, "content-type").is_none() {
        upsert_header(&mut headers, "content-type", "application/json".to_string());
    }
    HandlerResponse::new(status, headers, body)
}
