//! # Module Module
//!
//! Modules group controllers, providers and routes, and import other modules
//! to form a tree. At startup [`ModuleWalker`] places the tree in a
//! [`ModuleGraph`], resolves every module's dependencies, runs the `invoke`
//! hooks and registers all routes with the [`crate::router::Router`].
//!
//! ```rust,ignore
//! let users = ModuleDef::new("UsersModule")
//!     .prefix("users")
//!     .declare(ControllerDef::new("UserController", |deps| {
//!         Ok(UserController::new(deps.get::<UserService>(0)?))
//!     }).depends_on(["UserService"]))
//!     .route(RouteDef::new(":id").controller("UserController"));
//!
//! let app = ModuleDef::new("AppModule")
//!     .provider(Provider::new("UserService", |_| Ok(UserService::default())))
//!     .import(users);
//! ```
//!
//! Route prefixes accumulate from the root: a route `:id` in `UsersModule`
//! above is served at `/users/:id`. Middlewares accumulate the same way, in
//! this order: global, module (root first), route, route guards, method
//! guards, method middlewares.

mod def;
mod graph;
mod route;
mod walker;


pub use def::{InvokeContext, InvokeHook, ModuleDef, ModuleImport, ModuleWithProviders};
pub use graph::{ModuleGraph, ModuleId, ModuleNode};
pub use route::{LazyLoader, MethodRoute, RouteDef};
pub use walker::{ModuleWalker, WalkOutput};
