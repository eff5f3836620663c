//! Application assembly.
//!
//! [`ApplicationBuilder`] collects the root module, global middlewares and
//! configuration; [`ApplicationBuilder::build`] runs the whole startup walk
//! and returns an [`Application`] ready to dispatch, or the first
//! configuration error.
//!
//! ```rust,ignore
//! let app = Application::builder()
//!     .use_middleware(Middleware::native(TracingMiddleware))
//!     .declare(ControllerDef::new("Greeter", |_| Ok(Greeter)))
//!     .route(RouteDef::new("greet").controller("Greeter"))
//!     .build()?;
//!
//! let resp = app.dispatch(IncomingRequest::get("/greet"));
//! assert_eq!(resp.status, 200);
//! ```

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use tracing::info;

use crate::controller::ControllerDef;
use crate::dispatcher::{Dispatcher, HandlerResponse, IncomingRequest, ResolvedRouteCache};
use crate::error::ConfigResult;
use crate::inject::{Dependency, InstanceRegistry, Provider, Resolver};
use crate::method::HttpMethod;
use crate::middleware::Middleware;
use crate::module::{ModuleDef, ModuleGraph, ModuleImport, ModuleWalker, RouteDef, WalkOutput};
use crate::router::Router;
use crate::runtime_config::RouterConfig;

const DEFAULT_ROOT_MODULE: &str = "AppModule";

/// Collects everything [`Application`] needs before startup.
#[derive(Debug)]
pub struct ApplicationBuilder {
    root: ModuleDef,
    middlewares: Vec<Middleware>,
    config: RouterConfig,
    registry: Option<Arc<InstanceRegistry>>,
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self {
            root: ModuleDef::new(DEFAULT_ROOT_MODULE),
            middlewares: Vec::new(),
            config: RouterConfig::default(),
            registry: None,
        }
    }
}

impl ApplicationBuilder {
    /// Use `module` as the root module, replacing anything added through
    /// `route`, `declare`, `provider` or `import` so far.
    #[must_use]
    pub fn module(mut self, module: ModuleDef) -> Self {
        self.root = module;
        self
    }

    /// Global middleware, run first for every route.
    #[must_use]
    pub fn use_middleware(mut self, middleware: Middleware) -> Self {
        self.middlewares.push(middleware);
        self
    }

    #[must_use]
    pub fn route(mut self, route: RouteDef) -> Self {
        self.root = self.root.route(route);
        self
    }

    #[must_use]
    pub fn declare(mut self, controller: ControllerDef) -> Self {
        self.root = self.root.declare(controller);
        self
    }

    #[must_use]
    pub fn provider(mut self, provider: Provider) -> Self {
        self.root = self.root.provider(provider);
        self
    }

    #[must_use]
    pub fn import(mut self, module: impl Into<ModuleImport>) -> Self {
        self.root = self.root.import(module);
        self
    }

    /// Default response header, added when a response does not set it.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Share singletons with other applications built on the same registry.
    #[must_use]
    pub fn registry(mut self, registry: Arc<InstanceRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Run the startup walk.
    ///
    /// Every configuration error aborts the build; no partially registered
    /// application is ever returned.
    pub fn build(self) -> ConfigResult<Application> {
        let started = Instant::now();
        self.config.validate()?;

        let registry = self.registry.unwrap_or_default();
        let router = Router::new().with_slow_match_threshold(self.config.slow_match_threshold());
        let WalkOutput { graph, router } =
            ModuleWalker::new(&registry, &self.middlewares, router).walk(self.root)?;
        let router = Arc::new(router);

        let cache = self
            .config
            .route_cache_enabled
            .then(|| ResolvedRouteCache::new(self.config.route_cache_capacity));
        let dispatcher = self.config.default_headers.iter().fold(
            Dispatcher::new(Arc::clone(&router))
                .with_cache(cache)
                .with_chain_timeout(self.config.chain_timeout()),
            |dispatcher, (name, value)| dispatcher.with_default_header(name, value.clone()),
        );

        info!(
            modules = graph.len(),
            routes_count = router.len(),
            singletons = registry.len(),
            global_middlewares = self.middlewares.len(),
            startup_ms = started.elapsed().as_millis() as u64,
            "Application built"
        );

        Ok(Application {
            dispatcher,
            graph,
            registry,
            router,
            config: self.config,
        })
    }
}

/// A fully wired application.
///
/// Immutable after [`ApplicationBuilder::build`]; share it across threads
/// behind an `Arc` and call [`Application::dispatch`] concurrently.
#[derive(Debug)]
pub struct Application {
    dispatcher: Dispatcher,
    graph: ModuleGraph,
    registry: Arc<InstanceRegistry>,
    router: Arc<Router>,
    config: RouterConfig,
}

impl Application {
    #[must_use]
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::default()
    }

    /// Dispatch one request. Never fails: every error becomes a response.
    pub fn dispatch(&self, request: IncomingRequest) -> HandlerResponse {
        self.dispatcher.dispatch(request)
    }

    /// Fetch the singleton `name` as seen from the root module.
    pub fn resolve<T: Any + Send + Sync>(&self, name: &str) -> anyhow::Result<Arc<T>> {
        let root = self
            .graph
            .root()
            .ok_or_else(|| anyhow!("application has no root module"))?;
        let instance = Resolver::new(&self.graph, &self.registry).resolve(name, root, "Application")?;
        instance
            .downcast::<T>()
            .map_err(|_| anyhow!("'{name}' is not a {}", std::any::type_name::<T>()))
    }

    /// Whether `dependency` can be resolved from the root module.
    #[must_use]
    pub fn can_resolve(&self, dependency: &Dependency) -> bool {
        match dependency {
            Dependency::Primitive(_) => true,
            Dependency::Service(name) => {
                self.registry.contains(name)
                    || self
                        .graph
                        .root()
                        .is_some_and(|root| self.graph.find_provider(root, name).is_some())
            }
        }
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Every registered `(method, pattern)` pair.
    #[must_use]
    pub fn routes(&self) -> Vec<(HttpMethod, String)> {
        self.router.routes()
    }

    /// Trie walks performed so far; cache hits do not count.
    #[must_use]
    pub fn lookup_count(&self) -> u64 {
        self.router.lookup_count()
    }

    #[must_use]
    pub fn modules(&self) -> &ModuleGraph {
        &self.graph
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<InstanceRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }
}
