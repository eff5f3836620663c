//! # modrouter
//!
//! **modrouter** is a request-routing core: a segment-trie path matcher, a
//! continuation-passing middleware chain, and a module-scoped
//! dependency-injection container, assembled by a startup walk over a tree of
//! modules. It has no network stack of its own; a transport hands it an
//! [`IncomingRequest`] and writes back the [`HandlerResponse`].
//!
//! ## Architecture
//!
//! - **[`router`]** - Segment trie with literal-before-parameter matching and backtracking
//! - **[`middleware`]** - Native `(ctx, next)` and foreign `(req, res, next)` middlewares run as one chain
//! - **[`inject`]** - Named providers resolved lexically through the module tree, built once
//! - **[`module`]** - Module declarations and the startup walk that registers every route
//! - **[`controller`]** - Handler objects built by the container
//! - **[`dispatcher`]** - Per-request hot path: cache, lookup, chain, rendering
//! - **[`app`]** - Builder that runs startup and owns the dispatcher
//!
//! ### Startup
//!
//! ```mermaid
//! sequenceDiagram
//!     participant User
//!     participant Builder as ApplicationBuilder
//!     participant Walker as ModuleWalker
//!     participant Resolver as Resolver
//!     participant Registry as InstanceRegistry
//!     participant Router as Router
//!
//!     User->>Builder: build()
//!     Builder->>Walker: walk(root module)
//!     Walker->>Walker: place imports<br/>(cycles, exports, prefixes)
//!     loop every module, parent first
//!         Walker->>Resolver: resolve module dependencies
//!         Resolver->>Registry: get_or_create(name)
//!         Walker->>Walker: invoke hook
//!         Walker->>Router: insert(route entries)
//!     end
//!     Walker->>Walker: run lazy children loaders
//!     Walker-->>Builder: graph + router
//!     Builder-->>User: Application or ConfigError
//! ```
//!
//! ### Request Handling
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Transport
//!     participant Dispatcher
//!     participant Cache as ResolvedRouteCache
//!     participant Router
//!     participant Chain as Middleware Chain
//!     participant Handler
//!
//!     Transport->>Dispatcher: dispatch(IncomingRequest)
//!     Dispatcher->>Cache: get(method, path)
//!     alt cache miss
//!         Dispatcher->>Router: find(method, path)
//!         alt no route
//!             Dispatcher-->>Transport: 404
//!         end
//!     end
//!     Dispatcher->>Chain: run(ctx)
//!     Chain->>Chain: global, module, route, method middlewares
//!     Chain->>Handler: handler(ctx)
//!     Handler-->>Dispatcher: body or error
//!     Dispatcher-->>Transport: HandlerResponse
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use modrouter::{Application, IncomingRequest, RouteDef};
//! use serde_json::json;
//!
//! let app = Application::builder()
//!     .route(RouteDef::new("users/:id").get(|ctx| {
//!         Ok(json!({ "id": ctx.param("id") }))
//!     }))
//!     .build()
//!     .expect("valid configuration");
//!
//! let resp = app.dispatch(IncomingRequest::get("/users/42"));
//! assert_eq!(resp.status, 200);
//! assert_eq!(resp.body, json!({ "id": "42" }));
//! ```
//!
//! ## Errors
//!
//! Configuration mistakes (duplicate routes, undeclared controllers, missing
//! providers, cycles) are [`ConfigError`]s returned by
//! [`ApplicationBuilder::build`]. Failures while serving a request never
//! escape [`Application::dispatch`]; they become 500 responses.

pub mod app;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod inject;
pub mod method;
pub mod middleware;
pub mod module;
pub mod router;
pub mod runtime_config;
pub mod telemetry;

pub use app::{Application, ApplicationBuilder};
pub use controller::{Controller, ControllerDef, ControllerRoute, Handler};
pub use dispatcher::{Context, HandlerResponse, IncomingRequest, UploadedFile};
pub use error::{ConfigError, ConfigResult};
pub use ids::RequestId;
pub use inject::{Dependency, InstanceRegistry, Primitive, Provider, Resolved};
pub use method::HttpMethod;
pub use middleware::{ChainError, Flow, ForeignNext, Middleware, Next};
pub use module::{InvokeContext, MethodRoute, ModuleDef, ModuleImport, ModuleWithProviders, RouteDef};
pub use router::Router;
pub use runtime_config::RouterConfig;
