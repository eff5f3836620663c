//! Arena holding the module tree.
//!
//! Nodes own their children through id lists; a child refers back to its
//! parent by id only, for lexical lookups.

use std::fmt;
use std::sync::Arc;

use crate::controller::ControllerDef;
use crate::inject::{Dependency, Provider, Resolved};
use crate::middleware::Middleware;

use super::def::InvokeHook;
use super::route::RouteDef;

/// Index of a node in a [`ModuleGraph`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(usize);

impl ModuleId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One module placed in the tree.
pub struct ModuleNode {
    pub id: ModuleId,
    pub name: Arc<str>,
    pub parent: Option<ModuleId>,
    pub children: Vec<ModuleId>,
    /// Route prefix accumulated from the ancestors and the module itself
    pub prefix: String,
    pub declarations: Vec<ControllerDef>,
    pub providers: Vec<Provider>,
    pub exports: Vec<Arc<str>>,
    pub dependencies: Vec<Dependency>,
    pub middlewares: Vec<Middleware>,
    pub routes: Vec<RouteDef>,
    pub bootstrap: Option<Arc<str>>,
    pub(crate) on_invoke: Option<InvokeHook>,
    /// Set once the module's own dependencies have been resolved
    pub resolved: Option<Resolved>,
}

impl fmt::Debug for ModuleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleNode")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("prefix", &self.prefix)
            .field(
                "declarations",
                &self.declarations.iter().map(ControllerDef::name).collect::<Vec<_>>(),
            )
            .field("providers", &self.providers)
            .field("exports", &self.exports)
            .field("routes", &self.routes.len())
            .finish()
    }
}

/// The module tree, rooted at index 0.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    nodes: Vec<ModuleNode>,
}

impl ModuleGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `node` under `parent`, fixing up its id and the parent's child
    /// list.
    pub(crate) fn attach(&mut self, mut node: ModuleNode, parent: Option<ModuleId>) -> ModuleId {
        let id = ModuleId(self.nodes.len());
        node.id = id;
        node.parent = parent;
        self.nodes.push(node);
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(p.0)) {
            parent.children.push(id);
        }
        id
    }

    /// The root module, if any module has been attached.
    #[must_use]
    pub fn root(&self) -> Option<ModuleId> {
        (!self.nodes.is_empty()).then_some(ModuleId(0))
    }

    /// # Panics
    ///
    /// Panics if `id` did not come from this graph.
    #[must_use]
    pub fn node(&self, id: ModuleId) -> &ModuleNode {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: ModuleId) -> &mut ModuleNode {
        &mut self.nodes[id.0]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every module, in attachment order.
    pub fn iter(&self) -> impl Iterator<Item = &ModuleNode> {
        self.nodes.iter()
    }

    /// `id` followed by its parent, grandparent and so on up to the root.
    pub fn ancestors(&self, id: ModuleId) -> impl Iterator<Item = &ModuleNode> + '_ {
        std::iter::successors(self.nodes.get(id.0), move |node| {
            node.parent.and_then(|p| self.nodes.get(p.0))
        })
    }

    /// Module names from the root down to `id`.
    #[must_use]
    pub fn path_from_root(&self, id: ModuleId) -> Vec<String> {
        let mut names: Vec<String> = self.ancestors(id).map(|n| n.name.to_string()).collect();
        names.reverse();
        names
    }

    /// Find the provider for `name`, starting at `id` and walking up.
    #[must_use]
    pub fn find_provider(&self, id: ModuleId, name: &str) -> Option<(ModuleId, &Provider)> {
        self.ancestors(id).find_map(|node| {
            node.providers
                .iter()
                .find(|p| p.name() == name)
                .map(|p| (node.id, p))
        })
    }

    /// Find the declaration of controller `name`, starting at `id` and
    /// walking up.
    #[must_use]
    pub fn find_declaration(&self, id: ModuleId, name: &str) -> Option<(ModuleId, &ControllerDef)> {
        self.ancestors(id).find_map(|node| {
            node.declarations
                .iter()
                .find(|c| c.name() == name)
                .map(|c| (node.id, c))
        })
    }

    /// Middlewares of every module from the root down to `id`.
    #[must_use]
    pub fn inherited_middlewares(&self, id: ModuleId) -> Vec<Middleware> {
        let mut chain: Vec<&ModuleNode> = self.ancestors(id).collect();
        chain.reverse();
        chain
            .into_iter()
            .flat_map(|node| node.middlewares.iter().cloned())
            .collect()
    }
}
