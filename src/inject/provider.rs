//! Provider descriptors and resolved dependency lists.

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;

/// A constructed service, shared by everything that depends on it.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Builds an instance from its already-resolved dependencies.
pub type Factory = Arc<dyn Fn(&Resolved) -> anyhow::Result<Instance> + Send + Sync>;

/// Built-in parameter kinds that are never looked up. They resolve to an
/// absent value so constructors can take non-injected parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    String,
    Boolean,
    Function,
    Array,
}

impl Primitive {
    pub const ALL: [Primitive; 4] = [
        Primitive::String,
        Primitive::Boolean,
        Primitive::Function,
        Primitive::Array,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Primitive::String => "String",
            Primitive::Boolean => "Boolean",
            Primitive::Function => "Function",
            Primitive::Array => "Array",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == name)
    }
}

/// One entry of a dependency list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dependency {
    /// A provider looked up by name through the module tree.
    Service(Arc<str>),
    /// A placeholder that always resolves to nothing.
    Primitive(Primitive),
}

impl Dependency {
    pub fn service(name: impl Into<Arc<str>>) -> Self {
        Dependency::Service(name.into())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Dependency::Service(name) => name,
            Dependency::Primitive(p) => p.as_str(),
        }
    }
}

/// `"String"`, `"Boolean"`, `"Function"` and `"Array"` become primitives;
/// anything else names a service.
impl From<&str> for Dependency {
    fn from(name: &str) -> Self {
        match Primitive::from_name(name) {
            Some(p) => Dependency::Primitive(p),
            None => Dependency::Service(Arc::from(name)),
        }
    }
}

impl From<Primitive> for Dependency {
    fn from(p: Primitive) -> Self {
        Dependency::Primitive(p)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The resolved values of a dependency list, positionally.
///
/// Primitive entries are `None`; every service entry is `Some`.
#[derive(Clone, Default)]
pub struct Resolved {
    values: Vec<(Arc<str>, Option<Instance>)>,
}

impl Resolved {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, name: &str, value: Option<Instance>) {
        self.values.push((Arc::from(name), value));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value at `index`; `None` for primitives and out-of-range indexes.
    #[must_use]
    pub fn raw(&self, index: usize) -> Option<&Instance> {
        self.values.get(index).and_then(|(_, v)| v.as_ref())
    }

    /// Typed value at `index`.
    ///
    /// Fails when the slot is absent (a primitive placeholder or past the end)
    /// or holds a different type.
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> anyhow::Result<Arc<T>> {
        let (name, value) = self
            .values
            .get(index)
            .ok_or_else(|| anyhow!("no dependency at position {index}"))?;
        let value = value
            .as_ref()
            .ok_or_else(|| anyhow!("dependency '{name}' at position {index} is not injectable"))?;
        Arc::clone(value).downcast::<T>().map_err(|_| {
            anyhow!(
                "dependency '{name}' at position {index} is not a {}",
                type_name::<T>()
            )
        })
    }

    /// Like [`Resolved::get`] but absent or mistyped slots give `None`.
    #[must_use]
    pub fn optional<T: Any + Send + Sync>(&self, index: usize) -> Option<Arc<T>> {
        self.raw(index)
            .and_then(|value| Arc::clone(value).downcast::<T>().ok())
    }
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.values
                    .iter()
                    .map(|(name, v)| (name.as_ref(), v.is_some())),
            )
            .finish()
    }
}

/// An injectable service: a name, what it needs, and how to build it.
#[derive(Clone)]
pub struct Provider {
    name: Arc<str>,
    dependencies: Vec<Dependency>,
    factory: Factory,
}

impl Provider {
    /// Register `factory` under `name`. The factory runs at most once per
    /// process; its result is shared.
    pub fn new<T, F>(name: impl Into<Arc<str>>, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Resolved) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            factory: Arc::new(move |deps: &Resolved| Ok(Arc::new(factory(deps)?) as Instance)),
        }
    }

    /// Register an already-built value.
    pub fn value<T: Any + Send + Sync>(name: impl Into<Arc<str>>, value: T) -> Self {
        let instance: Instance = Arc::new(value);
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            factory: Arc::new(move |_: &Resolved| Ok(Arc::clone(&instance))),
        }
    }

    /// Declare the dependencies passed to the factory, in order.
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
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub(crate) fn construct(&self, deps: &Resolved) -> anyhow::Result<Instance> {
        (self.factory)(deps)
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Config {
        url: &'static str,
    }

    #[test]
    fn primitive_names_are_placeholders() {
        assert_eq!(
            Dependency::from("Boolean"),
            Dependency::Primitive(Primitive::Boolean)
        );
        assert_eq!(
            Dependency::from("UserService"),
            Dependency::service("UserService")
        );
        assert_eq!(Dependency::from("UserService").to_string(), "UserService");
    }

    #[test]
    fn typed_access() {
        let mut resolved = Resolved::new();
        resolved.push("Config", Some(Arc::new(Config { url: "db://" })));
        resolved.push("String", None);

        assert_eq!(resolved.get::<Config>(0).unwrap().url, "db://");
        assert!(resolved.get::<String>(0).is_err());
        assert!(resolved.get::<Config>(1).is_err());
        assert!(resolved.optional::<Config>(1).is_none());
        assert!(resolved.get::<Config>(5).is_err());
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn provider_builds_from_resolved() {
        let provider = Provider::new("Config", |_| Ok(Config { url: "x" })).depends_on(["String"]);
        assert_eq!(provider.name(), "Config");
        assert_eq!(
            provider.dependencies(),
            &[Dependency::Primitive(Primitive::String)]
        );
        let instance = provider.construct(&Resolved::new()).unwrap();
        assert_eq!(instance.downcast::<Config>().unwrap().url, "x");
    }

    #[test]
    fn value_provider_shares_one_instance() {
        let provider = Provider::value("Port", 8080_u16);
        let a = provider.construct(&Resolved::new()).unwrap();
        let b = provider.construct(&Resolved::new()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
