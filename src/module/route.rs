//! Route registration records.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::controller::Handler;
use crate::dispatcher::Context;
use crate::error::{ConfigError, ConfigResult};
use crate::method::HttpMethod;
use crate::middleware::Middleware;

use super::def::ModuleImport;

/// Produces the module whose routes are mounted under a route's path. Runs
/// once, after the eager part of the module walk.
pub type LazyLoader = Arc<dyn Fn() -> anyhow::Result<ModuleImport> + Send + Sync>;

/// A handler for one method of a route, with method-scoped middlewares.
#[derive(Clone)]
pub struct MethodRoute {
    pub(crate) handler: Handler,
    pub(crate) middlewares: Vec<Middleware>,
    pub(crate) guards: Vec<Middleware>,
}

impl MethodRoute {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&mut Context) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            middlewares: Vec::new(),
            guards: Vec::new(),
        }
    }

    #[must_use]
    pub fn middleware(mut self, middleware: Middleware) -> Self {
        self.middlewares.push(middleware);
        self
    }

    #[must_use]
    pub fn guard(mut self, guard: Middleware) -> Self {
        self.guards.push(guard);
        self
    }
}

/// A route as declared on a module or application.
///
/// Exactly one way of answering applies: explicit method handlers, a
/// controller, nested `children`, or a lazy children loader. `children` can
/// be combined with handlers for the route's own path; the other
/// combinations are rejected by [`RouteDef::validate`].
#[derive(Clone, Default)]
pub struct RouteDef {
    pub(crate) path: String,
    pub(crate) handlers: BTreeMap<HttpMethod, MethodRoute>,
    pub(crate) controller: Option<Arc<str>>,
    pub(crate) middlewares: Vec<Middleware>,
    pub(crate) guards: Vec<Middleware>,
    pub(crate) children: Vec<RouteDef>,
    pub(crate) load_children: Option<LazyLoader>,
}

impl RouteDef {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Register a handler for `method`, replacing any earlier one.
    #[must_use]
    pub fn method(mut self, method: HttpMethod, route: MethodRoute) -> Self {
        self.handlers.insert(method, route);
        self
    }

    #[must_use]
    pub fn get<F>(self, handler: F) -> Self
    where
        F: Fn(&mut Context) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.method(HttpMethod::Get, MethodRoute::new(handler))
    }

    #[must_use]
    pub fn post<F>(self, handler: F) -> Self
    where
        F: Fn(&mut Context) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.method(HttpMethod::Post, MethodRoute::new(handler))
    }

    #[must_use]
    pub fn put<F>(self, handler: F) -> Self
    where
        F: Fn(&mut Context) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.method(HttpMethod::Put, MethodRoute::new(handler))
    }

    #[must_use]
    pub fn patch<F>(self, handler: F) -> Self
    where
        F: Fn(&mut Context) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.method(HttpMethod::Patch, MethodRoute::new(handler))
    }

    #[must_use]
    pub fn delete<F>(self, handler: F) -> Self
    where
        F: Fn(&mut Context) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.method(HttpMethod::Delete, MethodRoute::new(handler))
    }

    /// Answer this path with the declared controller `name`.
    #[must_use]
    pub fn controller(mut self, name: impl Into<Arc<str>>) -> Self {
        self.controller = Some(name.into());
        self
    }

    #[must_use]
    pub fn middleware(mut self, middleware: Middleware) -> Self {
        self.middlewares.push(middleware);
        self
    }

    #[must_use]
    pub fn guard(mut self, guard: Middleware) -> Self {
        self.guards.push(guard);
        self
    }

    /// Nest a route below this one. The child's path is joined to this path
    /// and it inherits this route's middlewares and guards.
    #[must_use]
    pub fn child(mut self, child: RouteDef) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = RouteDef>,
    {
        self.children.extend(children);
        self
    }

    /// Mount the module produced by `loader` under this path.
    #[must_use]
    pub fn load_children<F>(mut self, loader: F) -> Self
    where
        F: Fn() -> anyhow::Result<ModuleImport> + Send + Sync + 'static,
    {
        self.load_children = Some(Arc::new(loader));
        self
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Reject combinations that cannot be registered.
    pub fn validate(&self) -> ConfigResult<()> {
        let path = self.path.trim_matches('/').to_string();
        if self.load_children.is_some() {
            if !self.children.is_empty() {
                return Err(ConfigError::ChildrenWithLazyLoader { path });
            }
            if self.controller.is_some() {
                return Err(ConfigError::ControllerWithLazyLoader { path });
            }
        }
        if let Some(controller) = &self.controller {
            if !self.handlers.is_empty() {
                return Err(ConfigError::ControllerWithMethodHandlers {
                    path,
                    controller: controller.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for RouteDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDef")
            .field("path", &self.path)
            .field("methods", &self.handlers.keys().collect::<Vec<_>>())
            .field("controller", &self.controller)
            .field("middlewares", &self.middlewares.len())
            .field("guards", &self.guards.len())
            .field("children", &self.children)
            .field("lazy", &self.load_children.is_some())
            .finish()
    }
}
