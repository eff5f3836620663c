//! Process-wide singleton registry.
//!
//! Instances are created at most once per name. Lookups take a read lock;
//! construction is serialized behind a reentrant lock so a factory can
//! resolve its own dependencies on the same thread while other threads wait.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{ReentrantMutex, RwLock};
use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};

use super::provider::Instance;

/// Names currently under construction, outermost first.
struct CreationStack<'a> {
    stack: &'a RefCell<Vec<Arc<str>>>,
}

impl Drop for CreationStack<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}

#[derive(Default)]
pub struct InstanceRegistry {
    instances: RwLock<HashMap<Arc<str>, Instance>>,
    construction: ReentrantMutex<RefCell<Vec<Arc<str>>>>,
}

impl InstanceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Instance> {
        self.instances.read().get(name).map(Arc::clone)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.instances.read().contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.read().is_empty()
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .instances
            .read()
            .keys()
            .map(ToString::to_string)
            .collect();
        names.sort();
        names
    }

    /// Store `instance` unless `name` is already taken. Returns whichever
    /// instance ends up registered.
    pub fn insert(&self, name: &str, instance: Instance) -> Instance {
        let mut instances = self.instances.write();
        Arc::clone(instances.entry(Arc::from(name)).or_insert(instance))
    }

    /// Return the instance registered under `name`, running `create` first if
    /// there is none.
    ///
    /// `create` runs at most once per name even under contention: the
    /// registry is checked, the construction lock taken, and the registry
    /// checked again before building. A `create` that (directly or through
    /// other providers) asks for `name` again fails with
    /// [`ConfigError::CyclicProvider`].
    pub fn get_or_create<F>(&self, name: &str, create: F) -> ConfigResult<Instance>
    where
        F: FnOnce() -> ConfigResult<Instance>,
    {
        if let Some(found) = self.get(name) {
            debug!(provider = %name, "Returning cached instance");
            return Ok(found);
        }

        let guard = self.construction.lock();
        if let Some(found) = self.get(name) {
            debug!(provider = %name, "Instance created by another thread");
            return Ok(found);
        }

        {
            let mut stack = guard.borrow_mut();
            if let Some(start) = stack.iter().position(|n| &**n == name) {
                let mut chain: Vec<String> = stack[start..].iter().map(ToString::to_string).collect();
                chain.push(name.to_string());
                return Err(ConfigError::CyclicProvider { chain });
            }
            stack.push(Arc::from(name));
        }
        let _creating = CreationStack { stack: &guard };

        let instance = create()?;
        info!(provider = %name, "Provider instantiated");
        Ok(self.insert(name, instance))
    }
}

impl fmt::Debug for InstanceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceRegistry")
            .field("instances", &self.names())
            .finish()
    }
}
