//! Error types.
//!
//! [`ConfigError`] covers everything detected while the module graph is walked
//! and the route trie is populated. These abort startup and are never retried.
//! Request-time failures are `anyhow::Error`s wrapped in
//! [`ChainError`](crate::middleware::ChainError) and rendered as 500 responses
//! by the dispatcher.

use thiserror::Error;

use crate::method::HttpMethod;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Startup-time configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("route '{method} /{path}' is registered more than once")]
    DuplicateRoute { path: String, method: HttpMethod },

    #[error("route '/{path}' declares controller '{controller}' together with explicit method handlers")]
    ControllerWithMethodHandlers { path: String, controller: String },

    #[error("controller '{controller}' is not declared in module '{module}' or any of its ancestors")]
    ControllerNotDeclared { controller: String, module: String },

    #[error("dependency '{dependency}' requested by '{requested_by}' is not provided by any module in scope")]
    ProviderNotFound {
        dependency: String,
        requested_by: String,
    },

    #[error("cyclic provider dependency detected: {}", chain.join(" -> "))]
    CyclicProvider { chain: Vec<String> },

    #[error("cyclic module import detected: {}", chain.join(" -> "))]
    CyclicModule { chain: Vec<String> },

    #[error("route '/{path}' declares both 'children' and a lazy children loader")]
    ChildrenWithLazyLoader { path: String },

    #[error("route '/{path}' declares both a controller and a lazy children loader")]
    ControllerWithLazyLoader { path: String },

    #[error("module '{module}' exports '{symbol}', which is neither one of its providers nor one of its declarations")]
    InvalidExport { module: String, symbol: String },

    #[error("invalid route path '{path}': {reason}")]
    InvalidRoutePath { path: String, reason: String },

    #[error("provider '{provider}' failed to construct")]
    ProviderFactory {
        provider: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("module '{module}' rejected its position in the module graph")]
    ModuleHook {
        module: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("lazy children loader for route '/{path}' failed")]
    LazyLoad {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid router configuration: {reason}")]
    InvalidConfig { reason: String },
}
