//! Container facade
//!
//! The `Container` is the single entry point for application code. It has two
//! phases: an assembly phase where definitions, post-processors and listeners
//! are registered, and a running phase, entered through
//! [`start`](Container::start), where beans are retrieved by identifier.
//! [`shutdown`](Container::shutdown) tears the realized singletons down in
//! reverse order.

use crate::engine::Engine;
use crate::graph::DependencyGraph;
use crate::storage::DefinitionStore;
use crate::{
    BeanDefinition, BeanError, BeanPostProcessor, BeanState, ContainerEvent, ContainerListener,
    Injectable, Result, Scope, SharedBean,
};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

#[cfg(feature = "logging")]
use tracing::{debug, error, info, trace, warn};

/// Lifecycle phase of a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerState {
    /// Accepting registrations
    Assembling,
    /// `start()` is building the graph and realizing eager singletons
    Starting,
    /// Serving beans
    Running,
    /// `start()` failed; only inspection and `shutdown()` remain available
    Failed,
    /// Torn down
    ShutDown,
}

impl ContainerState {
    const fn as_u8(self) -> u8 {
        match self {
            ContainerState::Assembling => 0,
            ContainerState::Starting => 1,
            ContainerState::Running => 2,
            ContainerState::Failed => 3,
            ContainerState::ShutDown => 4,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => ContainerState::Starting,
            2 => ContainerState::Running,
            3 => ContainerState::Failed,
            4 => ContainerState::ShutDown,
            _ => ContainerState::Assembling,
        }
    }
}

impl std::fmt::Display for ContainerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ContainerState::Assembling => "assembling",
            ContainerState::Starting => "starting",
            ContainerState::Running => "running",
            ContainerState::Failed => "failed",
            ContainerState::ShutDown => "shut down",
        };
        f.write_str(name)
    }
}

struct Inner {
    store: DefinitionStore,
    post_processors: Mutex<Vec<Arc<dyn BeanPostProcessor>>>,
    listeners: Mutex<Vec<Arc<dyn ContainerListener>>>,
    state: AtomicU8,
    /// Present from `start()` until `shutdown()`
    engine: RwLock<Option<Arc<Engine>>>,
    destroy_on_failed_start: bool,
}

/// Bean registry and lifecycle resolver.
///
/// Cloning is cheap and every clone refers to the same container.
///
/// # Examples
///
/// ```rust
/// use bean_container::{BeanDefinition, Container};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let container = Container::new();
/// container.register_all([
///     BeanDefinition::singleton("userService", |ctx| {
///         Ok(UserService { db: ctx.get("database")? })
///     })
///     .depends_on("database")
///     .build(),
///     BeanDefinition::singleton("database", |_| {
///         Ok(Database { url: "postgres://localhost".into() })
///     })
///     .build(),
/// ]).unwrap();
///
/// container.start().unwrap();
///
/// let users = container.get::<UserService>("userService").unwrap();
/// let db = container.get::<Database>("database").unwrap();
/// assert!(Arc::ptr_eq(&users.db, &db));
///
/// container.shutdown().unwrap();
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

impl Container {
    /// Create an empty container in the `Assembling` state.
    #[inline]
    pub fn new() -> Self {
        ContainerBuilder::new().build()
    }

    /// Start configuring a container
    #[inline]
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    /// Create a container with pre-allocated capacity.
    ///
    /// Use this when you know approximately how many beans will be registered.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        ContainerBuilder::new().with_capacity(capacity).build()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a single definition.
    ///
    /// Fails with `DuplicateIdentifier` if the identifier is taken and with
    /// `AlreadyStarted` once `start()` has been called. Dependencies may
    /// refer to beans that are registered later; they are checked by
    /// `start()`.
    pub fn register(&self, definition: impl Into<BeanDefinition>) -> Result<()> {
        self.check_assembling()?;
        self.inner.store.insert(definition.into())?;
        Ok(())
    }

    /// Register a batch of definitions.
    ///
    /// All or nothing: if any identifier is a duplicate (of a registered bean
    /// or within the batch) no definition of the batch is kept.
    pub fn register_all<I, D>(&self, definitions: I) -> Result<usize>
    where
        I: IntoIterator<Item = D>,
        D: Into<BeanDefinition>,
    {
        self.check_assembling()?;
        let definitions: Vec<BeanDefinition> = definitions.into_iter().map(Into::into).collect();
        let count = self.inner.store.insert_all(definitions)?;

        #[cfg(feature = "logging")]
        debug!(
            target: "bean_container",
            count = count,
            total = self.inner.store.len(),
            "Registered bean definitions"
        );

        Ok(count)
    }

    /// Add a post-processor, applied after those added before it.
    pub fn add_post_processor(&self, processor: impl BeanPostProcessor) -> Result<()> {
        self.check_assembling()?;
        self.inner
            .post_processors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(processor));
        Ok(())
    }

    /// Add a lifecycle listener. Listeners may be added in any state.
    pub fn add_listener(&self, listener: impl ContainerListener) {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    #[inline]
    fn check_assembling(&self) -> Result<()> {
        match self.state() {
            ContainerState::Assembling => Ok(()),
            _ => Err(BeanError::AlreadyStarted),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Build the dependency graph and realize every eager singleton.
    ///
    /// Resolution errors (`UnknownBean`, `CircularDependency`) are reported
    /// before any bean is constructed. Construction errors stop the start at
    /// the failing bean; [`realized_beans`](Self::realized_beans) then lists
    /// what was created before it. Either way the container moves to
    /// `Failed`.
    ///
    /// Calling `start()` a second time fails with `AlreadyStarted`; after
    /// `shutdown()` it fails with `NotRunning`.
    pub fn start(&self) -> Result<()> {
        self.inner
            .state
            .compare_exchange(
                ContainerState::Assembling.as_u8(),
                ContainerState::Starting.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|actual| match ContainerState::from_u8(actual) {
                ContainerState::ShutDown => BeanError::NotRunning {
                    state: ContainerState::ShutDown,
                },
                _ => BeanError::AlreadyStarted,
            })?;

        #[cfg(feature = "logging")]
        info!(
            target: "bean_container",
            beans = self.inner.store.len(),
            "Starting container"
        );

        let post_processors = self
            .inner
            .post_processors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let engine = match Engine::new(self.inner.store.definitions(), post_processors) {
            Ok(engine) => Arc::new(engine),
            Err(err) => {
                #[cfg(feature = "logging")]
                error!(
                    target: "bean_container",
                    error = %err,
                    "Dependency resolution failed, no bean was created"
                );
                self.set_state(ContainerState::Failed);
                return Err(err);
            }
        };

        *self
            .inner
            .engine
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&engine));

        match engine.instantiate_eager() {
            Ok(_eager) => {
                self.set_state(ContainerState::Running);
                let realized = engine.realized().len();

                #[cfg(feature = "logging")]
                info!(
                    target: "bean_container",
                    eager = _eager,
                    realized = realized,
                    "Container started"
                );

                self.publish(&ContainerEvent::Started { realized });
                Ok(())
            }
            Err(err) => {
                self.set_state(ContainerState::Failed);

                #[cfg(feature = "logging")]
                error!(
                    target: "bean_container",
                    error = %err,
                    realized = ?engine.realized(),
                    "Container start failed"
                );

                if self.inner.destroy_on_failed_start {
                    if let Err(_teardown) = engine.teardown() {
                        #[cfg(feature = "logging")]
                        warn!(
                            target: "bean_container",
                            error = %_teardown,
                            "Teardown after failed start reported an error"
                        );
                    }
                }

                Err(err)
            }
        }
    }

    /// Tear the container down.
    ///
    /// Listeners receive `Closed` first, then every realized singleton's
    /// pre-destroy and destroy hooks run, dependents before dependencies.
    /// A failing hook does not stop the teardown; the first failure is
    /// returned as `DestructionFailed`. Calling `shutdown()` again is a
    /// no-op.
    ///
    /// Must not run concurrently with `get`.
    pub fn shutdown(&self) -> Result<()> {
        let previous = ContainerState::from_u8(
            self.inner
                .state
                .swap(ContainerState::ShutDown.as_u8(), Ordering::AcqRel),
        );
        if previous == ContainerState::ShutDown {
            return Ok(());
        }

        #[cfg(feature = "logging")]
        info!(
            target: "bean_container",
            previous = %previous,
            "Shutting down container"
        );

        if matches!(previous, ContainerState::Running | ContainerState::Failed) {
            self.publish(&ContainerEvent::Closed);
        }

        let engine = self
            .inner
            .engine
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match engine {
            Some(engine) => engine.teardown(),
            None => Ok(()),
        }
    }

    fn publish(&self, event: &ContainerEvent) {
        let listeners = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        #[cfg(feature = "logging")]
        debug!(
            target: "bean_container",
            event = %event,
            listeners = listeners.len(),
            "Publishing container event"
        );

        for listener in listeners {
            listener.on_event(event);
        }
    }

    #[inline]
    fn set_state(&self, state: ContainerState) {
        self.inner.state.store(state.as_u8(), Ordering::Release);
    }

    // =========================================================================
    // Retrieval
    // =========================================================================

    /// Retrieve a bean by identifier.
    ///
    /// Singletons are returned from the cache, realizing lazy ones on first
    /// use; prototypes are constructed fresh on every call. Fails with
    /// `NotRunning` outside the `Running` state, `UnknownBean` for an
    /// unregistered identifier and `TypeMismatch` if the bean is not a `T`.
    pub fn get<T: Injectable>(&self, name: &str) -> Result<Arc<T>> {
        self.get_any(name)?
            .downcast::<T>()
            .map_err(|_| BeanError::TypeMismatch {
                bean: name.to_string(),
                expected: std::any::type_name::<T>(),
                found: self
                    .inner
                    .store
                    .get(name)
                    .map(|definition| definition.type_name())
                    .unwrap_or("unknown"),
            })
    }

    /// Retrieve a bean without a type check
    pub fn get_any(&self, name: &str) -> Result<SharedBean> {
        let engine = self.running_engine()?;

        #[cfg(feature = "logging")]
        trace!(
            target: "bean_container",
            bean = name,
            "Retrieving bean"
        );

        engine.resolve(name).map(|bean| bean.exposed)
    }

    /// Like [`get`](Self::get), but `None` on any failure
    #[inline]
    pub fn try_get<T: Injectable>(&self, name: &str) -> Option<Arc<T>> {
        self.get(name).ok()
    }

    fn running_engine(&self) -> Result<Arc<Engine>> {
        let state = self.state();
        if state != ContainerState::Running {
            return Err(BeanError::NotRunning { state });
        }
        self.engine()
            .ok_or(BeanError::NotRunning { state: self.state() })
    }

    fn engine(&self) -> Option<Arc<Engine>> {
        self.inner
            .engine
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Current lifecycle phase
    #[inline]
    pub fn state(&self) -> ContainerState {
        ContainerState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state() == ContainerState::Running
    }

    /// Check if a definition is registered under `name`.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.store.contains(name)
    }

    /// Registered identifiers in registration order
    pub fn bean_names(&self) -> Vec<String> {
        self.inner.store.names()
    }

    /// The definition registered under `name`
    pub fn definition(&self, name: &str) -> Result<Arc<BeanDefinition>> {
        self.inner.store.get(name)
    }

    /// Number of registered definitions
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.store.is_empty()
    }

    /// Realization state of a singleton.
    ///
    /// `None` for prototypes and unknown identifiers. Before `start()` and
    /// after `shutdown()` every singleton reads as `Unrealized`.
    pub fn bean_state(&self, name: &str) -> Option<BeanState> {
        let definition = self.inner.store.get(name).ok()?;
        if definition.scope() != Scope::Singleton {
            return None;
        }
        match self.engine() {
            Some(engine) => engine.state(name),
            None => Some(BeanState::Unrealized),
        }
    }

    /// Singleton identifiers in the order they were realized.
    ///
    /// Still available after a failed `start()`; empty after `shutdown()`.
    pub fn realized_beans(&self) -> Vec<String> {
        self.engine()
            .map(|engine| engine.realized())
            .unwrap_or_default()
    }

    /// Check the registered definitions for dangling references and cycles
    /// without constructing anything.
    pub fn validate(&self) -> Result<()> {
        DependencyGraph::build(&self.inner.store.definitions())?.topological_order()?;
        Ok(())
    }

    /// Every identifier, each after all of its dependencies.
    pub fn instantiation_order(&self) -> Result<Vec<String>> {
        match self.engine() {
            Some(engine) => Ok(engine.order().to_vec()),
            None => DependencyGraph::build(&self.inner.store.definitions())?.topological_order(),
        }
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("state", &self.state())
            .field("beans", &self.len())
            .field("realized", &self.realized_beans().len())
            .finish()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Configures a [`Container`] before any bean is registered.
///
/// # Examples
///
/// ```rust
/// use bean_container::{Container, ContainerEvent};
///
/// let container = Container::builder()
///     .with_capacity(64)
///     .with_listener(|event: &ContainerEvent| println!("container {event}"))
///     .destroy_on_failed_start(true)
///     .build();
///
/// assert!(container.is_empty());
/// ```
#[derive(Default)]
pub struct ContainerBuilder {
    capacity: usize,
    post_processors: Vec<Arc<dyn BeanPostProcessor>>,
    listeners: Vec<Arc<dyn ContainerListener>>,
    destroy_on_failed_start: bool,
}

impl ContainerBuilder {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size the definition store
    #[inline]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Add a post-processor, applied in the order added
    pub fn with_post_processor(mut self, processor: impl BeanPostProcessor) -> Self {
        self.post_processors.push(Arc::new(processor));
        self
    }

    pub fn with_listener(mut self, listener: impl ContainerListener) -> Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    /// Tear realized singletons down as soon as `start()` fails.
    ///
    /// Off by default, so a failed container can still be inspected.
    #[inline]
    pub fn destroy_on_failed_start(mut self, enabled: bool) -> Self {
        self.destroy_on_failed_start = enabled;
        self
    }

    pub fn build(self) -> Container {
        #[cfg(feature = "logging")]
        debug!(
            target: "bean_container",
            capacity = self.capacity,
            post_processors = self.post_processors.len(),
            listeners = self.listeners.len(),
            "Creating new bean container"
        );

        Container {
            inner: Arc::new(Inner {
                store: DefinitionStore::with_capacity(self.capacity),
                post_processors: Mutex::new(self.post_processors),
                listeners: Mutex::new(self.listeners),
                state: AtomicU8::new(ContainerState::Assembling.as_u8()),
                engine: RwLock::new(None),
                destroy_on_failed_start: self.destroy_on_failed_start,
            }),
        }
    }
}

impl std::fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("capacity", &self.capacity)
            .field("post_processors", &self.post_processors.len())
            .field("listeners", &self.listeners.len())
            .field("destroy_on_failed_start", &self.destroy_on_failed_start)
            .finish()
    }
}
