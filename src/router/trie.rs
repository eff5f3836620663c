//! Segment trie used for route matching.
//!
//! Paths are split on `/` and each segment becomes one level of the tree:
//! - Static segments (e.g. `users`) are stored in a map keyed by the literal text
//! - Parametric segments (e.g. `:id`) are stored in a separate, ordered list so a
//!   literal sibling and a parametric sibling can coexist at the same depth
//! - Entries live on terminal nodes, keyed by [`HttpMethod`]
//!
//! Lookup is a depth-first search. At every depth the literal child is tried
//! first and parametric children afterwards, in registration order; a branch
//! that dead-ends deeper in the path is abandoned and its bindings are undone
//! before the next sibling is tried.
//!
//! The trie is generic over the stored entry so it can be exercised without
//! building handlers.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::method::HttpMethod;

use super::core::ParamVec;
use super::pattern::{PathPattern, Segment};

/// Outcome of a trie search.
#[derive(Debug)]
pub enum TrieMatch<T> {
    /// A terminal node carried an entry for the requested method.
    Found { entry: Arc<T>, params: ParamVec },
    /// The path resolved to at least one terminal node, but none of them had
    /// an entry for the requested method. `allowed` lists the methods of the
    /// first such node in search order.
    MethodNotAllowed { allowed: Vec<HttpMethod> },
    NotFound,
}

/// One node of the trie.
#[derive(Debug)]
pub struct RouteNode<T> {
    /// Entries for paths that end at this node
    entries: BTreeMap<HttpMethod, Arc<T>>,
    /// Literal children keyed by segment text
    children: HashMap<Arc<str>, RouteNode<T>>,
    /// Parametric children, first registered first
    param_children: Vec<(Arc<str>, RouteNode<T>)>,
}

impl<T> Default for RouteNode<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            children: HashMap::new(),
            param_children: Vec::new(),
        }
    }
}

impl<T> RouteNode<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `entry` under `method` at the node addressed by `pattern`,
    /// creating missing nodes on the way.
    ///
    /// Returns the rejected entry if that method is already registered on the
    /// terminal node.
    pub fn insert(&mut self, pattern: &PathPattern, method: HttpMethod, entry: Arc<T>) -> Result<(), Arc<T>> {
        let node = pattern
            .segments()
            .iter()
            .fold(self, |node, segment| node.child_mut(segment));
        if node.entries.contains_key(&method) {
            return Err(entry);
        }
        node.entries.insert(method, entry);
        Ok(())
    }

    fn child_mut(&mut self, segment: &Segment) -> &mut RouteNode<T> {
        match segment {
            Segment::Static(text) => self.children.entry(Arc::clone(text)).or_default(),
            Segment::Param(name) => {
                // Reuse a parametric child only when the parameter name matches,
                // so `/users/:id/a` and `/users/:user_id/b` bind their own names.
                let idx = match self.param_children.iter().position(|(n, _)| n == name) {
                    Some(idx) => idx,
                    None => {
                        self.param_children.push((Arc::clone(name), RouteNode::new()));
                        self.param_children.len() - 1
                    }
                };
                &mut self.param_children[idx].1
            }
        }
    }

    /// Resolve `segments` for `method`.
    pub fn find(&self, segments: &[&str], method: HttpMethod) -> TrieMatch<T> {
        let mut params = ParamVec::new();
        let mut allowed = BTreeSet::new();
        match self.search(segments, method, &mut params, &mut allowed) {
            Some(entry) => TrieMatch::Found { entry, params },
            None if allowed.is_empty() => TrieMatch::NotFound,
            None => TrieMatch::MethodNotAllowed {
                allowed: allowed.into_iter().collect(),
            },
        }
    }

    fn search(
        &self,
        segments: &[&str],
        method: HttpMethod,
        params: &mut ParamVec,
        allowed: &mut BTreeSet<HttpMethod>,
    ) -> Option<Arc<T>> {
        let Some((segment, remaining)) = segments.split_first() else {
            if let Some(entry) = self.entries.get(&method) {
                return Some(Arc::clone(entry));
            }
            // Every branch that reaches the end of the path contributes.
            allowed.extend(self.entries.keys().copied());
            return None;
        };

        if let Some(child) = self.children.get(*segment) {
            if let Some(entry) = child.search(remaining, method, params, allowed) {
                return Some(entry);
            }
        }

        for (name, child) in &self.param_children {
            params.push((Arc::clone(name), decode_segment(segment)));
            if let Some(entry) = child.search(remaining, method, params, allowed) {
                return Some(entry);
            }
            // Backtrack
            params.pop();
        }

        None
    }

    /// Visit every `(pattern, method, entry)` stored below this node.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&str, HttpMethod, &Arc<T>),
    {
        let mut prefix = String::new();
        self.walk(&mut prefix, &mut f);
    }

    fn walk<F>(&self, prefix: &mut String, f: &mut F)
    where
        F: FnMut(&str, HttpMethod, &Arc<T>),
    {
        for (method, entry) in &self.entries {
            let shown = if prefix.is_empty() { "/" } else { prefix.as_str() };
            f(shown, *method, entry);
        }
        let mut literals: Vec<_> = self.children.iter().collect();
        literals.sort_by(|a, b| a.0.cmp(b.0));
        for (text, child) in literals {
            let len = prefix.len();
            prefix.push('/');
            prefix.push_str(text);
            child.walk(prefix, f);
            prefix.truncate(len);
        }
        for (name, child) in &self.param_children {
            let len = prefix.len();
            prefix.push_str("/:");
            prefix.push_str(name);
            child.walk(prefix, f);
            prefix.truncate(len);
        }
    }
}

/// Percent-decode a bound parameter value, keeping the raw text when it does
/// not decode to UTF-8.
fn decode_segment(segment: &str) -> String {
    match urlencoding::decode(segment) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => segment.to_string(),
    }
}
