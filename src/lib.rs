//! # Bean Container - Bean Registry & Lifecycle Resolver
//!
//! A dependency injection core in the style of a classic bean factory: beans
//! are described by explicit definitions, wired by identifier, realized in
//! dependency order and torn down in reverse.
//!
//! ## Features
//!
//! - 📋 **Explicit definitions** - Every bean declares its dependencies by identifier; no introspection
//! - 🔍 **Early failure** - Unknown references and cycles are reported before any bean is built
//! - 🧭 **Deterministic order** - Topological instantiation, ties broken by registration order
//! - 🔒 **Single-flight singletons** - Concurrent first access constructs exactly once
//! - ♻️ **Prototypes** - Fresh instance on every retrieval, never cached
//! - 🏭 **Lazy singletons** - Created on first access
//! - 🧩 **Post-processors** - Decorate beans around their init hook
//! - 🧹 **Ordered teardown** - Pre-destroy and destroy hooks, dependents first
//! - 📊 **Observable** - Optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use bean_container::{BeanDefinition, Container};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let container = Container::new();
//!
//! container.register_all([
//!     BeanDefinition::singleton("database", |_| {
//!         Ok(Database { url: "postgres://localhost".into() })
//!     })
//!     .build(),
//!     BeanDefinition::singleton("userService", |ctx| {
//!         Ok(UserService { db: ctx.get("database")? })
//!     })
//!     .depends_on("database")
//!     .build(),
//! ]).unwrap();
//!
//! container.start().unwrap();
//!
//! let users = container.get::<UserService>("userService").unwrap();
//! assert_eq!(users.db.url, "postgres://localhost");
//!
//! container.shutdown().unwrap();
//! ```
//!
//! ## Scopes and Laziness
//!
//! ```rust
//! use bean_container::{BeanDefinition, Container};
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use std::sync::Arc;
//!
//! static NEXT_ID: AtomicU64 = AtomicU64::new(0);
//!
//! struct Config { debug: bool }
//! struct RequestId(u64);
//!
//! let container = Container::new();
//!
//! // Singleton - one instance, created during start()
//! container.register(BeanDefinition::singleton("config", |_| Ok(Config { debug: true }))).unwrap();
//!
//! // Lazy singleton - created on first get()
//! container.register(
//!     BeanDefinition::singleton("report", |_| Ok(String::from("expensive"))).lazy(true),
//! ).unwrap();
//!
//! // Prototype - new instance on every get()
//! container.register(BeanDefinition::prototype("requestId", |_| {
//!     Ok(RequestId(NEXT_ID.fetch_add(1, Ordering::SeqCst)))
//! })).unwrap();
//!
//! container.start().unwrap();
//!
//! let a = container.get::<RequestId>("requestId").unwrap();
//! let b = container.get::<RequestId>("requestId").unwrap();
//! assert_ne!(a.0, b.0);
//!
//! let c1 = container.get::<Config>("config").unwrap();
//! let c2 = container.get::<Config>("config").unwrap();
//! assert!(Arc::ptr_eq(&c1, &c2));
//! ```
//!
//! ## Lifecycle Hooks
//!
//! ```rust
//! use bean_container::{BeanDefinition, Container};
//!
//! struct Pool { size: usize }
//!
//! let container = Container::new();
//! container.register(
//!     BeanDefinition::singleton("pool", |_| Ok(Pool { size: 4 }))
//!         .on_init(|pool| {
//!             if pool.size == 0 {
//!                 return Err("pool cannot be empty".into());
//!             }
//!             Ok(())
//!         })
//!         .on_pre_destroy(|_| Ok(()))
//!         .on_destroy(|_| Ok(())),
//! ).unwrap();
//!
//! container.start().unwrap();
//! container.shutdown().unwrap();
//! ```
//!
//! ## Errors
//!
//! Dangling references, duplicates and cycles are reported before any bean
//! is constructed:
//!
//! ```rust
//! use bean_container::{BeanDefinition, BeanError, Container};
//!
//! let container = Container::new();
//! container.register_all([
//!     BeanDefinition::singleton("a", |_| Ok(())).depends_on("b").build(),
//!     BeanDefinition::singleton("b", |_| Ok(())).depends_on("a").build(),
//! ]).unwrap();
//!
//! match container.start() {
//!     Err(BeanError::CircularDependency { path }) => assert_eq!(path, ["a", "b", "a"]),
//!     other => panic!("expected a cycle, got {other:?}"),
//! }
//! ```

mod container;
mod definition;
mod engine;
mod error;
mod factory;
mod graph;
mod lifecycle;
#[cfg(feature = "logging")]
pub mod logging;
mod scope;
mod storage;

pub use container::*;
pub use definition::*;
pub use engine::BeanContext;
pub use error::*;
pub use factory::{Injectable, SharedBean};
pub use graph::*;
pub use lifecycle::*;
pub use scope::{BeanState, Scope};
pub use storage::DefinitionStore;

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

// Re-export for convenience
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BeanContext, BeanDefinition, BeanError, BeanPostProcessor, BoxError, Container,
        ContainerEvent, ContainerListener, ContainerState, Injectable, Result, Scope, SharedBean,
    };
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Database {
        url: String,
    }

    struct Repository {
        db: Arc<Database>,
    }

    struct Handler {
        repo: Arc<Repository>,
        request: u32,
    }

    fn wire(container: &Container, requests: &'static AtomicU32) {
        container
            .register_all([
                BeanDefinition::prototype("handler", move |ctx| {
                    Ok(Handler {
                        repo: ctx.get("repository")?,
                        request: requests.fetch_add(1, Ordering::SeqCst),
                    })
                })
                .depends_on("repository")
                .build(),
                BeanDefinition::singleton("repository", |ctx| {
                    Ok(Repository {
                        db: ctx.get("database")?,
                    })
                })
                .depends_on("database")
                .lazy(true)
                .build(),
                BeanDefinition::singleton("database", |_| {
                    Ok(Database {
                        url: "sqlite::memory:".into(),
                    })
                })
                .build(),
            ])
            .unwrap();
    }

    #[test]
    fn test_prototype_over_lazy_singleton() {
        static REQUESTS: AtomicU32 = AtomicU32::new(0);

        let container = Container::new();
        wire(&container, &REQUESTS);
        container.start().unwrap();

        assert_eq!(container.realized_beans(), ["database"]);
        assert_eq!(REQUESTS.load(Ordering::SeqCst), 0);

        let first = container.get::<Handler>("handler").unwrap();
        let second = container.get::<Handler>("handler").unwrap();

        assert_ne!(first.request, second.request);
        assert!(Arc::ptr_eq(&first.repo, &second.repo));
        assert_eq!(first.repo.db.url, "sqlite::memory:");
        assert_eq!(container.realized_beans(), ["database", "repository"]);
    }

    #[test]
    fn test_instantiation_order_follows_graph() {
        static REQUESTS: AtomicU32 = AtomicU32::new(0);

        let container = Container::new();
        wire(&container, &REQUESTS);

        assert_eq!(
            container.instantiation_order().unwrap(),
            ["database", "repository", "handler"]
        );
        assert_eq!(container.bean_names(), ["handler", "repository", "database"]);
    }

    #[test]
    fn test_injection_error_surfaces_from_get() {
        let container = Container::new();
        container
            .register(BeanDefinition::singleton("needy", |ctx| {
                let db: Arc<Database> = ctx.get("database")?;
                Ok(Repository { db })
            }))
            .unwrap();
        container
            .register(BeanDefinition::singleton("database", |_| {
                Ok(Database { url: "x".into() })
            }))
            .unwrap();

        // "needy" never declared "database"
        let err = container.start().unwrap_err();
        assert!(matches!(
            err,
            BeanError::InjectionError { ref bean, ref dependency, .. }
                if bean == "needy" && dependency == "database"
        ));
    }

    #[test]
    fn test_resolution_errors_are_flagged() {
        let container = Container::new();
        container
            .register(BeanDefinition::singleton("a", |_| Ok(())).depends_on("missing"))
            .unwrap();

        let err = container.start().unwrap_err();
        assert!(err.is_resolution_error());
        assert_eq!(err.bean(), Some("missing"));
        assert_eq!(container.state(), ContainerState::Failed);
    }
}
