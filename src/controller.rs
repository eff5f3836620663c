//! Controllers: handler objects built by the container.
//!
//! A controller answers one route path for the methods it lists in
//! [`Controller::methods`], and may declare extra sub-routes of its own
//! through [`Controller::routes`]. Controllers are declared on a module with
//! a [`ControllerDef`] and instantiated once at startup.

use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use serde_json::Value;

use crate::dispatcher::Context;
use crate::inject::{Dependency, Resolved};
use crate::method::HttpMethod;
use crate::middleware::{HandlerFn, Middleware};

/// A shared handler function.
pub type Handler = Arc<HandlerFn>;

/// A sub-route a controller declares for itself, registered below the
/// controller's route path.
#[derive(Debug, Clone)]
pub struct ControllerRoute {
    pub method: HttpMethod,
    pub path: String,
    /// Passed back to [`Controller::action`]
    pub action: String,
    pub middlewares: Vec<Middleware>,
}

impl ControllerRoute {
    pub fn new(method: HttpMethod, path: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            action: action.into(),
            middlewares: Vec::new(),
        }
    }

    #[must_use]
    pub fn middleware(mut self, middleware: Middleware) -> Self {
        self.middlewares.push(middleware);
        self
    }
}

pub trait Controller: Send + Sync {
    /// Methods answered on the controller's own route path.
    fn methods(&self) -> Vec<HttpMethod>;

    /// Handle a request for one of [`Controller::methods`].
    fn handle(&self, method: HttpMethod, ctx: &mut Context) -> anyhow::Result<Value>;

    /// Middlewares that run for `method` after the route's own.
    fn middlewares(&self, _method: HttpMethod) -> Vec<Middleware> {
        Vec::new()
    }

    /// Guards that run for `method` before its middlewares.
    fn guards(&self, _method: HttpMethod) -> Vec<Middleware> {
        Vec::new()
    }

    /// Extra routes below the controller's path.
    fn routes(&self) -> Vec<ControllerRoute> {
        Vec::new()
    }

    /// Handle a request for a route declared in [`Controller::routes`].
    fn action(&self, name: &str, _ctx: &mut Context) -> anyhow::Result<Value> {
        Err(anyhow!("controller has no action '{name}'"))
    }
}

type ControllerFactory = Arc<dyn Fn(&Resolved) -> anyhow::Result<Arc<dyn Controller>> + Send + Sync>;

/// Declaration of a controller on a module: its name, its dependency list and
/// how to build it.
#[derive(Clone)]
pub struct ControllerDef {
    name: Arc<str>,
    dependencies: Vec<Dependency>,
    factory: ControllerFactory,
}

impl ControllerDef {
    pub fn new<C, F>(name: impl Into<Arc<str>>, factory: F) -> Self
    where
        C: Controller + 'static,
        F: Fn(&Resolved) -> anyhow::Result<C> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            factory: Arc::new(move |deps: &Resolved| {
                Ok(Arc::new(factory(deps)?) as Arc<dyn Controller>)
            }),
        }
    }

    /// Declare the dependencies passed to the factory, in order.
    #[must_use]
    pub fn depends_on<I, D>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<Dependency>,
    {
        self.dependencies
            .extend(dependencies.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub(crate) fn instantiate(&self, deps: &Resolved) -> anyhow::Result<Arc<dyn Controller>> {
        (self.factory)(deps)
    }
}

impl fmt::Debug for ControllerDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerDef")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}
