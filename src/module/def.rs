//! Module declarations.

use std::fmt;
use std::sync::Arc;

use crate::controller::ControllerDef;
use crate::inject::{Dependency, Provider, Resolved};
use crate::middleware::Middleware;

use super::route::RouteDef;

/// What a module's `invoke` hook is told about its place in the tree.
#[derive(Debug)]
pub struct InvokeContext<'a> {
    pub module: &'a str,
    pub parent: Option<&'a str>,
    /// The module's own resolved dependencies
    pub dependencies: &'a Resolved,
}

impl InvokeContext<'_> {
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Lifecycle hook run once the module is placed and its dependencies are
/// resolved. An error aborts startup.
pub type InvokeHook = Arc<dyn Fn(&InvokeContext<'_>) -> anyhow::Result<()> + Send + Sync>;

/// A composition unit: controllers, providers, routes and imported modules.
#[derive(Clone)]
pub struct ModuleDef {
    pub(crate) name: Arc<str>,
    pub(crate) prefix: String,
    pub(crate) declarations: Vec<ControllerDef>,
    pub(crate) imports: Vec<ModuleImport>,
    pub(crate) exports: Vec<Arc<str>>,
    pub(crate) providers: Vec<Provider>,
    pub(crate) dependencies: Vec<Dependency>,
    pub(crate) routes: Vec<RouteDef>,
    pub(crate) middlewares: Vec<Middleware>,
    pub(crate) bootstrap: Option<Arc<str>>,
    pub(crate) on_invoke: Option<InvokeHook>,
}

impl ModuleDef {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            prefix: String::new(),
            declarations: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            providers: Vec::new(),
            dependencies: Vec::new(),
            routes: Vec::new(),
            middlewares: Vec::new(),
            bootstrap: None,
            on_invoke: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path prefix for every route of this module and its imports.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn declare(mut self, controller: ControllerDef) -> Self {
        self.declarations.push(controller);
        self
    }

    #[must_use]
    pub fn import(mut self, module: impl Into<ModuleImport>) -> Self {
        self.imports.push(module.into());
        self
    }

    #[must_use]
    pub fn export(mut self, symbol: impl Into<Arc<str>>) -> Self {
        self.exports.push(symbol.into());
        self
    }

    #[must_use]
    pub fn provider(mut self, provider: Provider) -> Self {
        self.providers.push(provider);
        self
    }

    /// Dependencies of the module itself, handed to its `invoke` hook.
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
    pub fn route(mut self, route: RouteDef) -> Self {
        self.routes.push(route);
        self
    }

    /// Module-scoped middleware, inherited by imported modules.
    #[must_use]
    pub fn middleware(mut self, middleware: Middleware) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Serve the declared controller `name` at the module's own path.
    #[must_use]
    pub fn bootstrap(mut self, controller: impl Into<Arc<str>>) -> Self {
        self.bootstrap = Some(controller.into());
        self
    }

    #[must_use]
    pub fn on_invoke<F>(mut self, hook: F) -> Self
    where
        F: Fn(&InvokeContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_invoke = Some(Arc::new(hook));
        self
    }

    /// Start a module-with-providers descriptor for this module.
    #[must_use]
    pub fn with_providers<I>(self, providers: I) -> ModuleWithProviders
    where
        I: IntoIterator<Item = Provider>,
    {
        ModuleWithProviders::new(self).providers(providers)
    }
}

impl fmt::Debug for ModuleDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDef")
            .field("name", &self.name)
            .field("prefix", &self.prefix)
            .field("declarations", &self.declarations)
            .field("imports", &self.imports)
            .field("exports", &self.exports)
            .field("providers", &self.providers)
            .field("dependencies", &self.dependencies)
            .field("routes", &self.routes)
            .field("bootstrap", &self.bootstrap)
            .finish()
    }
}

/// A module imported together with the providers, imports and dependencies
/// it should use (the `forRoot` pattern).
///
/// These replace the module's own lists. The providers are also added to the
/// importing module so its other imports can use them.
#[derive(Debug, Clone)]
pub struct ModuleWithProviders {
    pub(crate) module: ModuleDef,
    pub(crate) providers: Vec<Provider>,
    pub(crate) imports: Vec<ModuleImport>,
    pub(crate) dependencies: Vec<Dependency>,
}

impl ModuleWithProviders {
    #[must_use]
    pub fn new(module: ModuleDef) -> Self {
        Self {
            module,
            providers: Vec::new(),
            imports: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    #[must_use]
    pub fn providers<I>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = Provider>,
    {
        self.providers.extend(providers);
        self
    }

    #[must_use]
    pub fn import(mut self, module: impl Into<ModuleImport>) -> Self {
        self.imports.push(module.into());
        self
    }

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
}

/// An entry of a module's `imports`.
#[derive(Debug, Clone)]
pub enum ModuleImport {
    Module(ModuleDef),
    WithProviders(ModuleWithProviders),
}

impl ModuleImport {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            ModuleImport::Module(m) => m.name(),
            ModuleImport::WithProviders(m) => m.module.name(),
        }
    }
}

impl From<ModuleDef> for ModuleImport {
    fn from(module: ModuleDef) -> Self {
        ModuleImport::Module(module)
    }
}

impl From<ModuleWithProviders> for ModuleImport {
    fn from(module: ModuleWithProviders) -> Self {
        ModuleImport::WithProviders(module)
    }
}
