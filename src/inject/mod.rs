//! # Inject Module
//!
//! A small inversion-of-control container. Services are registered as
//! [`Provider`]s on modules: a name, a list of [`Dependency`] names, and a
//! factory. Resolution walks the module tree from the requesting module up to
//! the root, builds each provider once, and caches it in the process-wide
//! [`InstanceRegistry`].
//!
//! ```rust,ignore
//! let db = Provider::new("Database", |_| Ok(Database::connect_lazy()));
//! let users = Provider::new("UserService", |deps| {
//!     Ok(UserService::new(deps.get::<Database>(0)?))
//! })
//! .depends_on(["Database"]);
//! ```

mod provider;
mod registry;
mod resolver;

pub use provider::{Dependency, Factory, Instance, Primitive, Provider, Resolved};
pub use registry::InstanceRegistry;
pub use resolver::Resolver;
