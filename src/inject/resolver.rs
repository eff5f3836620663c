//! Dependency resolution over the module tree.

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::module::{ModuleGraph, ModuleId};

use super::provider::{Dependency, Instance, Resolved};
use super::registry::InstanceRegistry;

/// Resolves dependency lists on behalf of a module.
///
/// Lookup is lexical: the registry of already-built singletons first, then
/// the requesting module's providers, then its parent's, up to the root.
/// A provider's own dependencies are resolved from the module that declares
/// it, not from the module that asked for it.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    graph: &'a ModuleGraph,
    registry: &'a InstanceRegistry,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(graph: &'a ModuleGraph, registry: &'a InstanceRegistry) -> Self {
        Self { graph, registry }
    }

    /// Resolve every entry of `dependencies` for `requested_by`, positionally.
    /// Primitive entries resolve to an absent slot.
    pub fn resolve_all(
        &self,
        dependencies: &[Dependency],
        module: ModuleId,
        requested_by: &str,
    ) -> ConfigResult<Resolved> {
        let mut resolved = Resolved::new();
        for dependency in dependencies {
            match dependency {
                Dependency::Primitive(p) => resolved.push(p.as_str(), None),
                Dependency::Service(name) => {
                    let instance = self.resolve(name, module, requested_by)?;
                    resolved.push(name, Some(instance));
                }
            }
        }
        Ok(resolved)
    }

    /// Resolve a single service by name.
    pub fn resolve(&self, name: &str, module: ModuleId, requested_by: &str) -> ConfigResult<Instance> {
        if let Some(found) = self.registry.get(name) {
            return Ok(found);
        }

        let (owner, provider) =
            self.graph
                .find_provider(module, name)
                .ok_or_else(|| ConfigError::ProviderNotFound {
                    dependency: name.to_string(),
                    requested_by: requested_by.to_string(),
                })?;

        debug!(
            provider = %name,
            requested_by = %requested_by,
            module = %self.graph.node(owner).name,
            dependency_count = provider.dependencies().len(),
            "Resolving provider"
        );

        self.registry.get_or_create(name, || {
            let deps = self.resolve_all(provider.dependencies(), owner, provider.name())?;
            provider
                .construct(&deps)
                .map_err(|source| ConfigError::ProviderFactory {
                    provider: name.to_string(),
                    source,
                })
        })
    }
}
