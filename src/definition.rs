//! Bean definitions
//!
//! A [`BeanDefinition`] is the declarative description of one bean: its
//! identifier, the type its factory produces, the identifiers it depends on,
//! its scope, its laziness and its lifecycle hooks. Dependencies are declared
//! explicitly; nothing is discovered by introspection.
//!
//! Definitions are immutable once built. They are assembled through the typed
//! [`BeanDefinitionBuilder`], which keeps the bean type around so hooks can be
//! written against `&T`.

use crate::factory::{BeanFactory, LifecycleHook};
use crate::{BeanContext, BoxError, Injectable, Scope};
use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;

/// Declarative description of how to construct a bean.
///
/// # Examples
///
/// ```rust
/// use bean_container::{BeanDefinition, Scope};
///
/// struct Database { url: String }
/// struct UserRepository { db: std::sync::Arc<Database> }
///
/// let db = BeanDefinition::singleton("database", |_| {
///     Ok(Database { url: "postgres://localhost".into() })
/// })
/// .build();
///
/// let repo = BeanDefinition::singleton("userRepository", |ctx| {
///     Ok(UserRepository { db: ctx.get::<Database>("database")? })
/// })
/// .depends_on("database")
/// .lazy(true)
/// .build();
///
/// assert_eq!(db.scope(), Scope::Singleton);
/// assert_eq!(repo.dependencies(), ["database".to_string()]);
/// assert!(repo.is_lazy());
/// ```
pub struct BeanDefinition {
    name: String,
    dependencies: Vec<String>,
    scope: Scope,
    lazy: bool,
    factory: BeanFactory,
    init: Option<LifecycleHook>,
    pre_destroy: Option<LifecycleHook>,
    destroy: Option<LifecycleHook>,
}

impl BeanDefinition {
    /// Start a definition with an explicit scope
    pub fn builder<T, F>(name: impl Into<String>, factory: F) -> BeanDefinitionBuilder<T>
    where
        T: Injectable,
        F: Fn(&BeanContext<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self::from_factory(name.into(), BeanFactory::new(factory))
    }

    fn from_factory<T: Injectable>(name: String, factory: BeanFactory) -> BeanDefinitionBuilder<T> {
        BeanDefinitionBuilder {
            definition: BeanDefinition {
                name,
                dependencies: Vec::new(),
                scope: Scope::default(),
                lazy: false,
                factory,
                init: None,
                pre_destroy: None,
                destroy: None,
            },
            _bean: PhantomData,
        }
    }

    /// Start a singleton definition
    #[inline]
    pub fn singleton<T, F>(name: impl Into<String>, factory: F) -> BeanDefinitionBuilder<T>
    where
        T: Injectable,
        F: Fn(&BeanContext<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self::builder(name, factory).scope(Scope::Singleton)
    }

    /// Start a prototype definition
    #[inline]
    pub fn prototype<T, F>(name: impl Into<String>, factory: F) -> BeanDefinitionBuilder<T>
    where
        T: Injectable,
        F: Fn(&BeanContext<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self::builder(name, factory).scope(Scope::Prototype)
    }

    /// Start a definition backed by a pre-built value.
    ///
    /// As a singleton the value is cloned once; as a prototype every
    /// retrieval receives a fresh clone.
    pub fn instance<T>(name: impl Into<String>, value: T) -> BeanDefinitionBuilder<T>
    where
        T: Injectable + Clone,
    {
        Self::from_factory(name.into(), BeanFactory::from_value(value))
    }

    /// Unique identifier
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifiers this bean depends on, in declaration order
    #[inline]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    #[inline]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    #[inline]
    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    /// True for singletons created during `start()`
    #[inline]
    pub fn is_eager_singleton(&self) -> bool {
        self.scope == Scope::Singleton && !self.lazy
    }

    /// Name of the type the factory produces
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.factory.type_name()
    }

    /// `TypeId` of the type the factory produces
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.factory.type_id()
    }

    #[inline]
    pub fn has_init_hook(&self) -> bool {
        self.init.is_some()
    }

    #[inline]
    pub fn has_destroy_hooks(&self) -> bool {
        self.pre_destroy.is_some() || self.destroy.is_some()
    }

    #[inline]
    pub(crate) fn factory(&self) -> &BeanFactory {
        &self.factory
    }

    #[inline]
    pub(crate) fn init_hook(&self) -> Option<&LifecycleHook> {
        self.init.as_ref()
    }

    #[inline]
    pub(crate) fn pre_destroy_hook(&self) -> Option<&LifecycleHook> {
        self.pre_destroy.as_ref()
    }

    #[inline]
    pub(crate) fn destroy_hook(&self) -> Option<&LifecycleHook> {
        self.destroy.as_ref()
    }
}

impl fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("name", &self.name)
            .field("type_name", &self.type_name())
            .field("scope", &self.scope)
            .field("lazy", &self.lazy)
            .field("dependencies", &self.dependencies)
            .field("init", &self.init.is_some())
            .field("pre_destroy", &self.pre_destroy.is_some())
            .field("destroy", &self.destroy.is_some())
            .finish()
    }
}

/// Typed builder for a [`BeanDefinition`].
///
/// Finish with [`build`](Self::build), or pass the builder straight to
/// `Container::register`, which accepts anything convertible into a
/// definition.
pub struct BeanDefinitionBuilder<T> {
    definition: BeanDefinition,
    _bean: PhantomData<fn() -> T>,
}

impl<T: Injectable> BeanDefinitionBuilder<T> {
    /// Declare a dependency on another bean
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.definition.dependencies.push(name.into());
        self
    }

    /// Declare several dependencies at once, in order
    pub fn depends_on_all<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.definition
            .dependencies
            .extend(names.into_iter().map(Into::into));
        self
    }

    #[inline]
    pub fn scope(mut self, scope: Scope) -> Self {
        self.definition.scope = scope;
        self
    }

    /// Defer creation until first retrieval (singletons only)
    #[inline]
    pub fn lazy(mut self, lazy: bool) -> Self {
        self.definition.lazy = lazy;
        self
    }

    /// Hook run synchronously after construction and dependency injection
    pub fn on_init<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.definition.init = Some(LifecycleHook::new(hook));
        self
    }

    /// Hook run at shutdown, before the destroy hook
    pub fn on_pre_destroy<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.definition.pre_destroy = Some(LifecycleHook::new(hook));
        self
    }

    /// Hook run at shutdown to release the bean's resources
    pub fn on_destroy<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.definition.destroy = Some(LifecycleHook::new(hook));
        self
    }

    /// Finish the definition
    #[inline]
    pub fn build(self) -> BeanDefinition {
        self.definition
    }
}

impl<T: Injectable> From<BeanDefinitionBuilder<T>> for BeanDefinition {
    #[inline]
    fn from(builder: BeanDefinitionBuilder<T>) -> Self {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Config {
        debug: bool,
    }

    #[test]
    fn test_defaults() {
        let def = BeanDefinition::builder("config", |_| Ok(Config { debug: true })).build();

        assert_eq!(def.name(), "config");
        assert_eq!(def.scope(), Scope::Singleton);
        assert!(!def.is_lazy());
        assert!(def.is_eager_singleton());
        assert!(def.dependencies().is_empty());
        assert!(!def.has_init_hook());
        assert!(!def.has_destroy_hooks());
        assert_eq!(def.type_id(), TypeId::of::<Config>());
    }

    #[test]
    fn test_builder_chain() {
        let def = BeanDefinition::prototype("config", |_| Ok(Config { debug: false }))
            .depends_on("a")
            .depends_on_all(["b", "c"])
            .on_init(|_| Ok(()))
            .on_destroy(|_| Ok(()))
            .build();

        assert_eq!(def.scope(), Scope::Prototype);
        assert!(!def.is_eager_singleton());
        assert_eq!(def.dependencies(), ["a", "b", "c"]);
        assert!(def.has_init_hook());
        assert!(def.has_destroy_hooks());
    }

    #[test]
    fn test_lazy_singleton_is_not_eager() {
        let def: BeanDefinition = BeanDefinition::singleton("config", |_| Ok(Config { debug: true }))
            .lazy(true)
            .into();
        assert!(def.is_lazy());
        assert!(!def.is_eager_singleton());
    }

    #[test]
    fn test_instance_definition_clones_value() {
        let def = BeanDefinition::instance("config", Config { debug: true }).build();
        let ctx = BeanContext::new("config", &[], Vec::new());

        let bean = def.factory().create(&ctx).unwrap();
        let config = bean.downcast::<Config>().unwrap();
        assert!(config.debug);
        assert!(def.type_name().ends_with("Config"));
    }

    #[test]
    fn test_debug_output() {
        let def = BeanDefinition::singleton("config", |_| Ok(Config { debug: true }))
            .depends_on("env")
            .build();
        let debug = format!("{:?}", def);
        assert!(debug.contains("config"));
        assert!(debug.contains("env"));
        assert!(debug.contains("Singleton"));
    }
}
