//! Instantiation engine
//!
//! The engine is created by `Container::start` from a snapshot of the
//! registered definitions. It owns the topological order, the singleton
//! cache and the post-processor chain, and it is the only place where user
//! factories and hooks run.

use crate::factory::SharedBean;
use crate::graph::DependencyGraph;
use crate::scope::{BeanState, RealizedBean, ScopeManager};
use crate::{BeanDefinition, BeanError, BeanPostProcessor, Injectable, Result, Scope};
use ahash::RandomState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace, warn};

/// What a factory sees while its bean is being constructed.
///
/// Holds the bean's own identifier and the already-resolved values of its
/// declared dependencies. Only declared dependencies can be read; asking for
/// anything else is an `InjectionError`.
///
/// # Examples
///
/// ```rust
/// use bean_container::{BeanDefinition, Container};
/// use std::sync::Arc;
///
/// struct Config { port: u16 }
/// struct Server { name: String, config: Arc<Config> }
///
/// let container = Container::new();
/// container.register(BeanDefinition::singleton("config", |_| Ok(Config { port: 8080 }))).unwrap();
/// container.register(
///     BeanDefinition::singleton("server", |ctx| {
///         Ok(Server {
///             name: ctx.bean_name().to_string(),
///             config: ctx.get::<Config>("config")?,
///         })
///     })
///     .depends_on("config"),
/// ).unwrap();
/// container.start().unwrap();
///
/// let server = container.get::<Server>("server").unwrap();
/// assert_eq!(server.name, "server");
/// assert_eq!(server.config.port, 8080);
/// ```
pub struct BeanContext<'a> {
    bean: &'a str,
    dependencies: &'a [String],
    resolved: Vec<SharedBean>,
}

impl<'a> BeanContext<'a> {
    pub(crate) fn new(bean: &'a str, dependencies: &'a [String], resolved: Vec<SharedBean>) -> Self {
        Self {
            bean,
            dependencies,
            resolved,
        }
    }

    /// Identifier of the bean under construction
    #[inline]
    pub fn bean_name(&self) -> &str {
        self.bean
    }

    /// Declared dependency identifiers, in declaration order
    #[inline]
    pub fn dependencies(&self) -> &[String] {
        self.dependencies
    }

    /// Resolved dependency, downcast to `T`.
    ///
    /// Fails with `InjectionError` when `dependency` was not declared or the
    /// resolved value is not a `T`.
    pub fn get<T: Injectable>(&self, dependency: &str) -> Result<Arc<T>> {
        self.get_any(dependency)?.downcast::<T>().map_err(|_| {
            BeanError::injection(
                self.bean,
                dependency,
                format!("resolved value is not of type {}", std::any::type_name::<T>()),
            )
        })
    }

    /// Resolved dependency without a type check
    pub fn get_any(&self, dependency: &str) -> Result<SharedBean> {
        self.dependencies
            .iter()
            .position(|declared| declared == dependency)
            .and_then(|index| self.resolved.get(index))
            .map(Arc::clone)
            .ok_or_else(|| BeanError::injection(self.bean, dependency, "not declared as a dependency"))
    }

    /// Like [`get`](Self::get), but `None` on any failure
    #[inline]
    pub fn try_get<T: Injectable>(&self, dependency: &str) -> Option<Arc<T>> {
        self.get(dependency).ok()
    }
}

impl std::fmt::Debug for BeanContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanContext")
            .field("bean", &self.bean)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

/// A bean waiting for its dependencies during [`Engine::assemble`].
struct Frame<'e> {
    definition: &'e BeanDefinition,
    resolved: Vec<SharedBean>,
}

impl<'e> Frame<'e> {
    fn new(definition: &'e BeanDefinition) -> Self {
        Self {
            definition,
            resolved: Vec::with_capacity(definition.dependencies().len()),
        }
    }
}

/// Resolves and constructs beans for a started container.
pub(crate) struct Engine {
    definitions: HashMap<String, Arc<BeanDefinition>, RandomState>,
    graph: DependencyGraph,
    order: Vec<String>,
    scopes: ScopeManager,
    post_processors: Vec<Arc<dyn BeanPostProcessor>>,
    torn_down: AtomicBool,
}

impl Engine {
    /// Build the graph and prepare singleton slots.
    ///
    /// Fails on dangling references or cycles before any bean is constructed.
    pub fn new(
        definitions: Vec<Arc<BeanDefinition>>,
        post_processors: Vec<Arc<dyn BeanPostProcessor>>,
    ) -> Result<Self> {
        let graph = DependencyGraph::build(&definitions)?;
        let order = graph.topological_order()?;

        let scopes = ScopeManager::new(
            definitions
                .iter()
                .filter(|definition| definition.scope() == Scope::Singleton)
                .map(|definition| definition.name()),
        );

        let definitions: HashMap<String, Arc<BeanDefinition>, RandomState> = definitions
            .into_iter()
            .map(|definition| (definition.name().to_string(), definition))
            .collect();

        #[cfg(feature = "logging")]
        debug!(
            target: "bean_container",
            beans = definitions.len(),
            singletons = scopes.len(),
            post_processors = post_processors.len(),
            "Instantiation engine ready"
        );

        Ok(Self {
            definitions,
            graph,
            order,
            scopes,
            post_processors,
            torn_down: AtomicBool::new(false),
        })
    }

    /// Realize every eager singleton, walking the topological order.
    ///
    /// Returns the number of eager singletons. Stops at the first failure;
    /// beans realized before it stay cached.
    pub fn instantiate_eager(&self) -> Result<usize> {
        let mut count = 0;
        for name in &self.order {
            let definition = self.definition(name)?;
            if !definition.is_eager_singleton() {
                continue;
            }
            self.resolve(name)?;
            count += 1;
        }
        Ok(count)
    }

    /// Return the bean for `name`, constructing it if its scope requires.
    ///
    /// Walks the subgraph below `name` in dependency order, stopping at
    /// singletons that are already cached, and realizes every singleton on
    /// the way. No dependency is resolved by recursion, so chain depth is
    /// bounded by memory rather than by the thread's stack.
    pub fn resolve(&self, name: &str) -> Result<RealizedBean> {
        let definition = self.definition(name)?;
        if let Some(bean) = self.scopes.get(name) {
            return Ok(bean);
        }

        let order = self
            .graph
            .order_for_filtered(name, |node| !self.scopes.is_cached(node))?;

        let mut root = None;
        for node in &order {
            let dependency = self.definition(node)?;
            if dependency.scope() != Scope::Singleton {
                continue;
            }
            let bean = self.scopes.realize(node, || self.assemble(dependency))?;
            if node == name {
                root = Some(bean);
            }
        }

        match definition.scope() {
            Scope::Singleton => root.ok_or_else(|| BeanError::unknown(name)),
            Scope::Prototype => {
                #[cfg(feature = "logging")]
                trace!(
                    target: "bean_container",
                    bean = name,
                    "Creating prototype instance"
                );
                self.assemble(definition)
            }
        }
    }

    /// Construct `root` from its dependencies.
    ///
    /// Singleton dependencies must already be cached. Prototype dependencies
    /// are constructed fresh for each injection point, using an explicit
    /// stack of frames.
    fn assemble(&self, root: &BeanDefinition) -> Result<RealizedBean> {
        let mut pending: Vec<Frame<'_>> = Vec::new();
        let mut current = Frame::new(root);

        loop {
            let definition = current.definition;
            if let Some(dependency) = definition.dependencies().get(current.resolved.len()) {
                #[cfg(feature = "logging")]
                trace!(
                    target: "bean_container",
                    bean = definition.name(),
                    dependency = dependency.as_str(),
                    "Resolving dependency"
                );

                let target = self.definition(dependency)?;
                match target.scope() {
                    Scope::Singleton => {
                        let bean = self.scopes.get(dependency).ok_or_else(|| {
                            BeanError::injection(
                                definition.name(),
                                dependency.as_str(),
                                "dependency is not realized",
                            )
                        })?;
                        current.resolved.push(bean.exposed);
                    }
                    Scope::Prototype => {
                        pending.push(std::mem::replace(&mut current, Frame::new(target)));
                    }
                }
                continue;
            }

            let bean = self.construct(definition, std::mem::take(&mut current.resolved))?;
            match pending.pop() {
                Some(parent) => {
                    current = parent;
                    current.resolved.push(bean.exposed);
                }
                None => return Ok(bean),
            }
        }
    }

    /// Run the factory on resolved dependencies, then the post-processor and
    /// init chain.
    fn construct(
        &self,
        definition: &BeanDefinition,
        resolved: Vec<SharedBean>,
    ) -> Result<RealizedBean> {
        let name = definition.name();

        let ctx = BeanContext::new(name, definition.dependencies(), resolved);
        let raw = definition
            .factory()
            .create(&ctx)
            .map_err(|cause| BeanError::from_factory(name, cause))?;

        let mut exposed = Arc::clone(&raw);
        for processor in &self.post_processors {
            exposed = processor
                .before_initialization(exposed, name)
                .map_err(|cause| BeanError::initialization_failed(name, cause))?;
        }

        if let Some(hook) = definition.init_hook() {
            hook.invoke(&raw)
                .map_err(|cause| BeanError::initialization_failed(name, cause))?;
        }

        for processor in &self.post_processors {
            exposed = match processor.after_initialization(exposed, name) {
                Ok(bean) => bean,
                Err(cause) => {
                    // Initialized but never cached: release it now
                    if definition.scope() == Scope::Singleton {
                        self.discard(definition, &raw);
                    }
                    return Err(BeanError::initialization_failed(name, cause));
                }
            };
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "bean_container",
            bean = name,
            scope = %definition.scope(),
            type_name = definition.type_name(),
            "Bean constructed"
        );

        Ok(RealizedBean { raw, exposed })
    }

    /// Run the destruction hooks of a bean that will not be cached.
    ///
    /// Hook failures are logged; the caller reports the original error.
    fn discard(&self, definition: &BeanDefinition, raw: &SharedBean) {
        let hooks = [definition.pre_destroy_hook(), definition.destroy_hook()];
        for hook in hooks.into_iter().flatten() {
            if let Err(_cause) = hook.invoke(raw) {
                #[cfg(feature = "logging")]
                warn!(
                    target: "bean_container",
                    bean = definition.name(),
                    error = %BeanError::destruction_failed(definition.name(), _cause),
                    "Destruction hook failed while discarding bean"
                );
            }
        }
    }

    /// Run pre-destroy then destroy hooks of every realized singleton,
    /// dependents before their dependencies.
    ///
    /// Runs at most once. Every hook is attempted; the first failure is
    /// returned.
    pub fn teardown(&self) -> Result<()> {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let mut first_failure = None;
        for name in self.scopes.realized().iter().rev() {
            let (Some(definition), Some(bean)) = (self.definitions.get(name), self.scopes.get(name))
            else {
                continue;
            };

            let hooks = [definition.pre_destroy_hook(), definition.destroy_hook()];
            for hook in hooks.into_iter().flatten() {
                if let Err(cause) = hook.invoke(&bean.raw) {
                    let err = BeanError::destruction_failed(name.as_str(), cause);

                    #[cfg(feature = "logging")]
                    warn!(
                        target: "bean_container",
                        bean = name.as_str(),
                        error = %err,
                        "Destruction hook failed, continuing teardown"
                    );

                    first_failure.get_or_insert(err);
                }
            }

            #[cfg(feature = "logging")]
            trace!(
                target: "bean_container",
                bean = name.as_str(),
                "Singleton destroyed"
            );
        }

        first_failure.map_or(Ok(()), Err)
    }

    fn definition(&self, name: &str) -> Result<&Arc<BeanDefinition>> {
        self.definitions
            .get(name)
            .ok_or_else(|| BeanError::unknown(name))
    }

    /// Topological order of all definitions
    #[inline]
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Singleton identifiers in realization order
    #[inline]
    pub fn realized(&self) -> Vec<String> {
        self.scopes.realized()
    }

    /// Singleton state, `None` for prototypes and unknown identifiers
    #[inline]
    pub fn state(&self, name: &str) -> Option<BeanState> {
        self.scopes.state(name)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("order", &self.order)
            .field("scopes", &self.scopes)
            .field("post_processors", &self.post_processors.len())
            .finish()
    }
}
