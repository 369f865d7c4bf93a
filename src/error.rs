//! Error types for the bean container

use std::error::Error;
use std::sync::Arc;
use thiserror::Error;

use crate::ContainerState;

/// Boxed error returned by user factories, hooks and post-processors.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Shared, cloneable cause carried by construction and teardown errors.
pub type SharedError = Arc<dyn Error + Send + Sync + 'static>;

/// Errors that can occur while registering, resolving or tearing down beans
#[derive(Error, Debug, Clone)]
pub enum BeanError {
    /// A bean with this identifier is already registered
    #[error("Bean already registered: '{name}'")]
    DuplicateIdentifier { name: String },

    /// No bean definition exists for this identifier
    #[error("{}", unknown_message(.name, .required_by))]
    UnknownBean {
        name: String,
        /// The bean whose dependency list referenced the missing identifier
        required_by: Option<String>,
    },

    /// The dependency graph contains a cycle
    #[error("Circular dependency detected: {}", .path.join(" -> "))]
    CircularDependency {
        /// Full cycle path; the first identifier is repeated at the end
        path: Vec<String>,
    },

    /// A resolved dependency was missing or of an incompatible type
    #[error("Injection into '{bean}' failed for dependency '{dependency}': {reason}")]
    InjectionError {
        bean: String,
        dependency: String,
        reason: String,
    },

    /// A post-processor or the initialization hook failed
    #[error("Initialization of bean '{bean}' failed: {source}")]
    InitializationFailed {
        bean: String,
        #[source]
        source: SharedError,
    },

    /// The bean's factory returned an error of its own
    #[error("Failed to create bean '{bean}': {source}")]
    CreationFailed {
        bean: String,
        #[source]
        source: SharedError,
    },

    /// A pre-destroy or destroy hook failed during shutdown
    #[error("Destruction of bean '{bean}' failed: {source}")]
    DestructionFailed {
        bean: String,
        #[source]
        source: SharedError,
    },

    /// `get::<T>` was called on a bean holding another type
    #[error("Bean '{bean}' is not of type {expected} (registered as {found})")]
    TypeMismatch {
        bean: String,
        expected: &'static str,
        found: &'static str,
    },

    /// `start()` was called twice, or registration was attempted after it
    #[error("Container already started")]
    AlreadyStarted,

    /// The container is not serving beans in its current state
    #[error("Container is not running (state: {state})")]
    NotRunning { state: ContainerState },
}

fn unknown_message(name: &str, required_by: &Option<String>) -> String {
    match required_by {
        Some(owner) => format!("Unknown bean '{name}' (required by '{owner}')"),
        None => format!("Unknown bean '{name}'"),
    }
}

impl BeanError {
    /// Create an UnknownBean error for a direct lookup
    #[inline]
    pub fn unknown(name: impl Into<String>) -> Self {
        Self::UnknownBean {
            name: name.into(),
            required_by: None,
        }
    }

    /// Create an UnknownBean error for a dangling dependency reference
    #[inline]
    pub fn missing_dependency(name: impl Into<String>, required_by: impl Into<String>) -> Self {
        Self::UnknownBean {
            name: name.into(),
            required_by: Some(required_by.into()),
        }
    }

    /// Create an InjectionError
    #[inline]
    pub fn injection(
        bean: impl Into<String>,
        dependency: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InjectionError {
            bean: bean.into(),
            dependency: dependency.into(),
            reason: reason.into(),
        }
    }

    /// Create an InitializationFailed error
    #[inline]
    pub fn initialization_failed(bean: impl Into<String>, cause: BoxError) -> Self {
        Self::InitializationFailed {
            bean: bean.into(),
            source: Arc::from(cause),
        }
    }

    /// Create a DestructionFailed error
    #[inline]
    pub fn destruction_failed(bean: impl Into<String>, cause: BoxError) -> Self {
        Self::DestructionFailed {
            bean: bean.into(),
            source: Arc::from(cause),
        }
    }

    /// Map an error returned by a user factory.
    ///
    /// Container errors raised inside the factory (typically an
    /// `InjectionError` from [`BeanContext::get`](crate::BeanContext::get))
    /// pass through untouched; anything else becomes `CreationFailed`.
    pub fn from_factory(bean: &str, cause: BoxError) -> Self {
        match cause.downcast::<BeanError>() {
            Ok(inner) => *inner,
            Err(other) => Self::CreationFailed {
                bean: bean.to_string(),
                source: Arc::from(other),
            },
        }
    }

    /// Identifier of the offending bean, when the error concerns one
    pub fn bean(&self) -> Option<&str> {
        match self {
            Self::DuplicateIdentifier { name } | Self::UnknownBean { name, .. } => Some(name.as_str()),
            Self::CircularDependency { path } => path.first().map(String::as_str),
            Self::InjectionError { bean, .. }
            | Self::InitializationFailed { bean, .. }
            | Self::CreationFailed { bean, .. }
            | Self::DestructionFailed { bean, .. }
            | Self::TypeMismatch { bean, .. } => Some(bean.as_str()),
            Self::AlreadyStarted | Self::NotRunning { .. } => None,
        }
    }

    /// True for errors detected before any object is constructed
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateIdentifier { .. }
                | Self::UnknownBean { .. }
                | Self::CircularDependency { .. }
        )
    }
}

/// Result type alias for container operations
pub type Result<T> = std::result::Result<T, BeanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_shows_full_path() {
        let err = BeanError::CircularDependency {
            path: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "Circular dependency detected: a -> b -> a");
        assert_eq!(err.bean(), Some("a"));
    }

    #[test]
    fn test_unknown_message_names_owner() {
        let direct = BeanError::unknown("cache");
        assert_eq!(direct.to_string(), "Unknown bean 'cache'");

        let dangling = BeanError::missing_dependency("cache", "userService");
        assert_eq!(
            dangling.to_string(),
            "Unknown bean 'cache' (required by 'userService')"
        );
    }

    #[test]
    fn test_from_factory_preserves_container_errors() {
        let inner: BoxError = Box::new(BeanError::injection("svc", "db", "not declared"));
        let err = BeanError::from_factory("svc", inner);
        assert!(matches!(err, BeanError::InjectionError { .. }));

        let io: BoxError = Box::new(std::io::Error::other("disk full"));
        let err = BeanError::from_factory("svc", io);
        match err {
            BeanError::CreationFailed { bean, source } => {
                assert_eq!(bean, "svc");
                assert_eq!(source.to_string(), "disk full");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_source_chain_is_exposed() {
        let err = BeanError::initialization_failed("svc", "boom".into());
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("boom"));
    }

    #[test]
    fn test_resolution_errors() {
        assert!(BeanError::unknown("x").is_resolution_error());
        assert!(!BeanError::AlreadyStarted.is_resolution_error());
    }
}
