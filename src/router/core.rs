//! Router core module - route entries and the hot-path lookup.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use crate::controller::{Controller, Handler};
use crate::dispatcher::Context;
use crate::error::{ConfigError, ConfigResult};
use crate::inject::Dependency;
use crate::method::HttpMethod;
use crate::middleware::Middleware;

use super::pattern::{split_path, PathPattern};
use super::trie::{RouteNode, TrieMatch};

/// Maximum number of path parameters before heap allocation.
/// Most routes have ≤4 parametric segments (e.g. /users/:id/posts/:post_id).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Param names are `Arc<str>` shared with the trie node that bound them;
/// values are per-request data from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// What runs at the end of a route's middleware chain.
#[derive(Clone)]
pub enum RouteHandler {
    /// A plain handler function registered on the route record.
    Function(Handler),
    /// A controller instance. `action` is set for routes the controller
    /// declared itself through [`Controller::routes`].
    Controller {
        name: Arc<str>,
        instance: Arc<dyn Controller>,
        action: Option<Arc<str>>,
    },
}

impl RouteHandler {
    /// Invoke the handler for `method`.
    pub fn invoke(&self, method: HttpMethod, ctx: &mut Context) -> anyhow::Result<Value> {
        match self {
            RouteHandler::Function(handler) => handler(ctx),
            RouteHandler::Controller {
                instance,
                action: Some(action),
                ..
            } => instance.action(action, ctx),
            RouteHandler::Controller {
                instance,
                action: None,
                ..
            } => instance.handle(method, ctx),
        }
    }

    /// Human-readable handler name for logs.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            RouteHandler::Function(_) => "fn".to_string(),
            RouteHandler::Controller {
                name,
                action: Some(action),
                ..
            } => format!("{name}::{action}"),
            RouteHandler::Controller { name, .. } => name.to_string(),
        }
    }
}

/// A registered `(path, method)` pair. Built once during startup and never
/// mutated afterwards.
pub struct RouteEntry {
    pub method: HttpMethod,
    pub pattern: PathPattern,
    pub handler: RouteHandler,
    /// Global, module, route and method middlewares, in that order.
    pub middlewares: Vec<Middleware>,
    /// Dependencies of the owning controller (empty for function handlers).
    pub dependencies: Vec<Dependency>,
    /// Name of the module that registered the route.
    pub module: Arc<str>,
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("method", &self.method)
            .field("pattern", &self.pattern.to_string())
            .field("handler", &self.handler.describe())
            .field("middlewares", &self.middlewares.len())
            .field("dependencies", &self.dependencies)
            .field("module", &self.module)
            .finish()
    }
}

/// Result of successfully matching a request path to a route.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub entry: Arc<RouteEntry>,
    /// Path parameters extracted from the URL (e.g. `:id` → `("id", "123")`)
    pub path_params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics: if duplicate parameter names exist
    /// at different path depths (e.g. `/org/:id/team/:team_id/user/:id`),
    /// returns the last occurrence.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Convert path_params to HashMap.
    /// Note: This allocates - use get_path_param() in hot paths instead
    #[must_use]
    pub fn path_params_map(&self) -> HashMap<String, String> {
        self.path_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// Outcome of [`Router::find`].
#[derive(Debug)]
pub enum Lookup {
    Matched(RouteMatch),
    /// The path exists but has no handler for the method.
    MethodNotAllowed { allowed: Vec<HttpMethod> },
    NotFound,
}

/// Router that matches requests to route entries using a segment trie.
///
/// Populated during startup through [`Router::insert`]; read-only once the
/// application is built.
pub struct Router {
    root: RouteNode<RouteEntry>,
    route_count: usize,
    /// Number of trie walks performed, for observing cache effectiveness
    lookups: AtomicU64,
    slow_match_threshold: Duration,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("route_count", &self.route_count)
            .field("lookups", &self.lookup_count())
            .finish()
    }
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: RouteNode::new(),
            route_count: 0,
            lookups: AtomicU64::new(0),
            slow_match_threshold: Duration::from_millis(1),
        }
    }

    /// Lookups slower than `threshold` are logged at WARN.
    #[must_use]
    pub fn with_slow_match_threshold(mut self, threshold: Duration) -> Self {
        self.slow_match_threshold = threshold;
        self
    }

    /// Register an entry.
    ///
    /// Fails with [`ConfigError::DuplicateRoute`] when the same pattern and
    /// method are already registered.
    pub fn insert(&mut self, entry: RouteEntry) -> ConfigResult<Arc<RouteEntry>> {
        let method = entry.method;
        let entry = Arc::new(entry);
        if let Err(rejected) = self.root.insert(&entry.pattern, method, Arc::clone(&entry)) {
            return Err(ConfigError::DuplicateRoute {
                path: rejected.pattern.to_string().trim_start_matches('/').to_string(),
                method,
            });
        }
        self.route_count += 1;

        debug!(
            method = %method,
            path = %entry.pattern,
            handler = %entry.handler.describe(),
            module = %entry.module,
            middleware_count = entry.middlewares.len(),
            "Route registered"
        );
        Ok(entry)
    }

    /// Match a request path.
    ///
    /// # Returns
    ///
    /// * `Lookup::Matched` - a route with extracted parameters
    /// * `Lookup::MethodNotAllowed` - the path exists for other methods
    /// * `Lookup::NotFound` - nothing matches (results in 404)
    pub fn find(&self, method: HttpMethod, path: &str) -> Lookup {
        debug!(method = %method, path = %path, "Route match attempt");

        self.lookups.fetch_add(1, Ordering::Relaxed);
        let match_start = Instant::now();
        let segments = split_path(path);
        let result = self.root.find(&segments, method);
        let match_duration = match_start.elapsed();

        match result {
            TrieMatch::Found { entry, params } => {
                if match_duration > self.slow_match_threshold {
                    warn!(
                        method = %method,
                        path = %path,
                        route_pattern = %entry.pattern,
                        duration_us = match_duration.as_micros(),
                        "Slow route matching detected"
                    );
                } else {
                    info!(
                        method = %method,
                        path = %path,
                        handler = %entry.handler.describe(),
                        route_pattern = %entry.pattern,
                        path_params = ?params,
                        duration_us = match_duration.as_micros(),
                        "Route matched"
                    );
                }
                Lookup::Matched(RouteMatch {
                    entry,
                    path_params: params,
                })
            }
            TrieMatch::MethodNotAllowed { allowed } => {
                info!(
                    method = %method,
                    path = %path,
                    allowed = ?allowed,
                    "Route matched without a handler for the method"
                );
                Lookup::MethodNotAllowed { allowed }
            }
            TrieMatch::NotFound => {
                warn!(
                    method = %method,
                    path = %path,
                    duration_us = match_duration.as_micros(),
                    "No route matched"
                );
                Lookup::NotFound
            }
        }
    }

    /// Every registered `(method, pattern)` pair.
    #[must_use]
    pub fn routes(&self) -> Vec<(HttpMethod, String)> {
        let mut routes = Vec::with_capacity(self.route_count);
        self.root
            .for_each(|path, method, _| routes.push((method, path.to_string())));
        routes
    }

    /// Log the routing table summary.
    pub fn log_summary(&self) {
        let routes_summary: Vec<String> = self
            .routes()
            .iter()
            .take(10)
            .map(|(method, path)| format!("{method} {path}"))
            .collect();
        info!(
            routes_count = self.route_count,
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.route_count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.route_count == 0
    }

    /// Total trie walks since the router was created.
    #[must_use]
    pub fn lookup_count(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }
}
