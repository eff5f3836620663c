//! Startup walk over the module tree.
//!
//! The walk runs in three passes:
//!
//! 1. **Place**: every module reachable through `imports` is attached to the
//!    arena under its importer. Module-with-providers descriptors are applied
//!    here and their providers merged into the importer. Import cycles and
//!    invalid exports are rejected.
//! 2. **Wire**: pre-order over the tree. Each module resolves its own
//!    dependencies, runs its `invoke` hook, checks that its providers'
//!    dependencies are reachable, and registers its bootstrap controller and
//!    routes. Controllers are instantiated here, once per name.
//! 3. **Load**: lazy children loaders collected during pass 2 run in
//!    registration order; each loaded module goes through passes 1 and 2
//!    under the route that carried the loader.
//!
//! Any error aborts the walk.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info};

use crate::controller::{Controller, ControllerDef};
use crate::error::{ConfigError, ConfigResult};
use crate::inject::{Dependency, Instance, InstanceRegistry, Resolver};
use crate::middleware::Middleware;
use crate::router::{join_paths, PathPattern, RouteEntry, RouteHandler, Router};

use super::def::{InvokeContext, ModuleDef, ModuleImport};
use super::graph::{ModuleGraph, ModuleId, ModuleNode};
use super::route::{LazyLoader, RouteDef};

/// A lazy loader waiting for pass 3.
struct PendingLoad {
    module: ModuleId,
    path: String,
    middlewares: Vec<Middleware>,
    loader: LazyLoader,
}

/// Result of a successful walk.
#[derive(Debug)]
pub struct WalkOutput {
    pub graph: ModuleGraph,
    pub router: Router,
}

pub struct ModuleWalker<'a> {
    registry: &'a InstanceRegistry,
    global_middlewares: &'a [Middleware],
    graph: ModuleGraph,
    router: Router,
    pending: VecDeque<PendingLoad>,
}

impl<'a> ModuleWalker<'a> {
    #[must_use]
    pub fn new(registry: &'a InstanceRegistry, global_middlewares: &'a [Middleware], router: Router) -> Self {
        Self {
            registry,
            global_middlewares,
            graph: ModuleGraph::new(),
            router,
            pending: VecDeque::new(),
        }
    }

    /// Walk `root` and everything it imports.
    pub fn walk(mut self, root: ModuleDef) -> ConfigResult<WalkOutput> {
        let root_id = self.place(ModuleImport::Module(root), None, "")?;
        self.wire(root_id, &[])?;

        while let Some(pending) = self.pending.pop_front() {
            info!(
                path = %pending.path,
                module = %self.graph.node(pending.module).name,
                "Loading lazy children"
            );
            let import = (pending.loader)().map_err(|source| ConfigError::LazyLoad {
                path: pending.path.clone(),
                source,
            })?;
            let id = self.place(import, Some(pending.module), &pending.path)?;
            self.wire(id, &pending.middlewares)?;
        }

        self.router.log_summary();
        Ok(WalkOutput {
            graph: self.graph,
            router: self.router,
        })
    }

    /// Pass 1: attach `import` and, recursively, its imports.
    fn place(&mut self, import: ModuleImport, parent: Option<ModuleId>, parent_prefix: &str) -> ConfigResult<ModuleId> {
        let def = match import {
            ModuleImport::Module(def) => def,
            ModuleImport::WithProviders(with) => {
                if let Some(parent) = parent {
                    self.graph
                        .node_mut(parent)
                        .providers
                        .extend(with.providers.iter().cloned());
                }
                ModuleDef {
                    providers: with.providers,
                    imports: with.imports,
                    dependencies: with.dependencies,
                    ..with.module
                }
            }
        };

        if let Some(parent) = parent {
            if self.graph.ancestors(parent).any(|n| n.name == def.name) {
                let mut chain = self.graph.path_from_root(parent);
                chain.push(def.name.to_string());
                return Err(ConfigError::CyclicModule { chain });
            }
        }

        for symbol in &def.exports {
            let known = def.providers.iter().any(|p| p.name() == &**symbol)
                || def.declarations.iter().any(|c| c.name() == &**symbol);
            if !known {
                return Err(ConfigError::InvalidExport {
                    module: def.name.to_string(),
                    symbol: symbol.to_string(),
                });
            }
        }

        let prefix = join_paths(parent_prefix, &def.prefix);
        let node = ModuleNode {
            id: ModuleId::default(),
            name: def.name,
            parent,
            children: Vec::new(),
            prefix: prefix.clone(),
            declarations: def.declarations,
            providers: def.providers,
            exports: def.exports,
            dependencies: def.dependencies,
            middlewares: def.middlewares,
            routes: def.routes,
            bootstrap: def.bootstrap,
            on_invoke: def.on_invoke,
            resolved: None,
        };
        let id = self.graph.attach(node, parent);

        for import in def.imports {
            self.place(import, Some(id), &prefix)?;
        }
        Ok(id)
    }

    /// Pass 2: resolve, invoke and register routes for `id`, then its
    /// children.
    fn wire(&mut self, id: ModuleId, mount: &[Middleware]) -> ConfigResult<()> {
        let (name, parent_name, dependencies, hook) = {
            let node = self.graph.node(id);
            (
                Arc::clone(&node.name),
                node.parent.map(|p| Arc::clone(&self.graph.node(p).name)),
                node.dependencies.clone(),
                node.on_invoke.clone(),
            )
        };

        let resolved = Resolver::new(&self.graph, self.registry).resolve_all(&dependencies, id, &name)?;
        if let Some(hook) = hook {
            let ctx = InvokeContext {
                module: &name,
                parent: parent_name.as_deref(),
                dependencies: &resolved,
            };
            hook(&ctx).map_err(|source| ConfigError::ModuleHook {
                module: name.to_string(),
                source,
            })?;
        }
        self.graph.node_mut(id).resolved = Some(resolved);

        self.check_provider_dependencies(id)?;

        let (prefix, bootstrap, routes, children) = {
            let node = self.graph.node(id);
            (
                node.prefix.clone(),
                node.bootstrap.clone(),
                node.routes.clone(),
                node.children.clone(),
            )
        };

        info!(
            module = %name,
            parent = parent_name.as_deref().unwrap_or("-"),
            path = %prefix,
            routes = routes.len(),
            imports = children.len(),
            "Module walked"
        );

        if let Some(controller) = bootstrap {
            self.register_route(id, &RouteDef::new("").controller(controller), &prefix, mount)?;
        }
        for route in &routes {
            self.register_route(id, route, &prefix, mount)?;
        }
        for child in children {
            self.wire(child, mount)?;
        }
        Ok(())
    }

    /// Every service a provider of `id` depends on must be reachable from
    /// `id`, even if nothing asks for that provider yet.
    fn check_provider_dependencies(&self, id: ModuleId) -> ConfigResult<()> {
        let node = self.graph.node(id);
        for provider in &node.providers {
            for dependency in provider.dependencies() {
                let Dependency::Service(dep) = dependency else {
                    continue;
                };
                if !self.registry.contains(dep) && self.graph.find_provider(id, dep).is_none() {
                    return Err(ConfigError::ProviderNotFound {
                        dependency: dep.to_string(),
                        requested_by: provider.name().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Register `route` (and its children) for module `id` under `prefix`.
    /// `inherited` holds the route-scope middlewares of enclosing routes.
    fn register_route(&mut self, id: ModuleId, route: &RouteDef, prefix: &str, inherited: &[Middleware]) -> ConfigResult<()> {
        route.validate()?;
        let path = join_paths(prefix, &route.path);

        let scope: Vec<Middleware> = inherited
            .iter()
            .chain(&route.middlewares)
            .chain(&route.guards)
            .cloned()
            .collect();

        if let Some(loader) = &route.load_children {
            debug!(path = %path, "Deferring lazy children");
            self.pending.push_back(PendingLoad {
                module: id,
                path,
                middlewares: scope,
                loader: Arc::clone(loader),
            });
            return Ok(());
        }

        let module_name = Arc::clone(&self.graph.node(id).name);
        let mut base: Vec<Middleware> = self.global_middlewares.to_vec();
        base.extend(self.graph.inherited_middlewares(id));
        base.extend(scope.iter().cloned());

        if !route.handlers.is_empty() {
            // Explicit handlers run the route's guards ahead of its middlewares.
            let mut handler_base: Vec<Middleware> = self.global_middlewares.to_vec();
            handler_base.extend(self.graph.inherited_middlewares(id));
            handler_base.extend(inherited.iter().cloned());
            handler_base.extend(route.guards.iter().cloned());
            handler_base.extend(route.middlewares.iter().cloned());

            let pattern = PathPattern::parse(&path)?;
            for (method, handler) in &route.handlers {
                let mut middlewares = handler_base.clone();
                middlewares.extend(handler.guards.iter().cloned());
                middlewares.extend(handler.middlewares.iter().cloned());
                self.router.insert(RouteEntry {
                    method: *method,
                    pattern: pattern.clone(),
                    handler: RouteHandler::Function(Arc::clone(&handler.handler)),
                    middlewares,
                    dependencies: Vec::new(),
                    module: Arc::clone(&module_name),
                })?;
            }
        }

        if let Some(controller) = &route.controller {
            let (owner, def) = self
                .graph
                .find_declaration(id, controller)
                .map(|(owner, def)| (owner, def.clone()))
                .ok_or_else(|| ConfigError::ControllerNotDeclared {
                    controller: controller.to_string(),
                    module: module_name.to_string(),
                })?;
            let instance = self.controller_instance(owner, &def)?;
            self.register_controller(&path, &def, instance, &base, &module_name)?;
        }

        for child in &route.children {
            self.register_route(id, child, &path, &scope)?;
        }
        Ok(())
    }

    fn register_controller(
        &mut self,
        path: &str,
        def: &ControllerDef,
        instance: Arc<dyn Controller>,
        base: &[Middleware],
        module: &Arc<str>,
    ) -> ConfigResult<()> {
        let name: Arc<str> = Arc::from(def.name());
        let pattern = PathPattern::parse(path)?;
        for method in instance.methods() {
            let mut middlewares = base.to_vec();
            middlewares.extend(instance.guards(method));
            middlewares.extend(instance.middlewares(method));
            self.router.insert(RouteEntry {
                method,
                pattern: pattern.clone(),
                handler: RouteHandler::Controller {
                    name: Arc::clone(&name),
                    instance: Arc::clone(&instance),
                    action: None,
                },
                middlewares,
                dependencies: def.dependencies().to_vec(),
                module: Arc::clone(module),
            })?;
        }

        for sub in instance.routes() {
            let sub_path = join_paths(path, &sub.path);
            let mut middlewares = base.to_vec();
            middlewares.extend(sub.middlewares.iter().cloned());
            self.router.insert(RouteEntry {
                method: sub.method,
                pattern: PathPattern::parse(&sub_path)?,
                handler: RouteHandler::Controller {
                    name: Arc::clone(&name),
                    instance: Arc::clone(&instance),
                    action: Some(Arc::from(sub.action.as_str())),
                },
                middlewares,
                dependencies: def.dependencies().to_vec(),
                module: Arc::clone(module),
            })?;
        }
        Ok(())
    }

    /// Build (or reuse) the controller declared by `def` in module `owner`.
    /// The instance is kept in the registry under the controller's name.
    fn controller_instance(&self, owner: ModuleId, def: &ControllerDef) -> ConfigResult<Arc<dyn Controller>> {
        let resolver = Resolver::new(&self.graph, self.registry);
        let slot = self.registry.get_or_create(def.name(), || {
            let deps = resolver.resolve_all(def.dependencies(), owner, def.name())?;
            let controller = def
                .instantiate(&deps)
                .map_err(|source| ConfigError::ProviderFactory {
                    provider: def.name().to_string(),
                    source,
                })?;
            Ok(Arc::new(controller) as Instance)
        })?;
        slot.downcast::<Arc<dyn Controller>>()
            .map(|controller| Arc::clone(&*controller))
            .map_err(|_| ConfigError::InvalidConfig {
                reason: format!("'{}' is registered as a service, not a controller", def.name()),
            })
    }
}
