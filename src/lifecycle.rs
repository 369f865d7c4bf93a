//! Container extension points
//!
//! [`BeanPostProcessor`]s see every bean around its init hook and may replace
//! it with a decorated value. [`ContainerListener`]s are told when the
//! container starts and when it begins shutting down.

use crate::factory::SharedBean;
use crate::BoxError;
use std::fmt;

/// Hook applied to every bean around its initialization callback.
///
/// Both methods receive the current value and the bean's identifier and
/// return the value the next stage should see. Returning the input unchanged
/// is the default. Post-processors run in the order they were added to the
/// container; an error from either method fails the bean with
/// `InitializationFailed`.
///
/// Lifecycle hooks always run on the value the factory produced. A wrapper
/// returned here is only what `get` hands out.
///
/// # Examples
///
/// ```rust
/// use bean_container::{BeanPostProcessor, BoxError, SharedBean};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// #[derive(Default)]
/// struct CountingProcessor {
///     seen: AtomicUsize,
/// }
///
/// impl BeanPostProcessor for CountingProcessor {
///     fn after_initialization(&self, bean: SharedBean, _name: &str) -> Result<SharedBean, BoxError> {
///         self.seen.fetch_add(1, Ordering::Relaxed);
///         Ok(bean)
///     }
/// }
/// ```
pub trait BeanPostProcessor: Send + Sync + 'static {
    /// Called after construction and injection, before the init hook
    fn before_initialization(&self, bean: SharedBean, _name: &str) -> Result<SharedBean, BoxError> {
        Ok(bean)
    }

    /// Called after the init hook
    fn after_initialization(&self, bean: SharedBean, _name: &str) -> Result<SharedBean, BoxError> {
        Ok(bean)
    }
}

/// Container-wide lifecycle notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerEvent {
    /// `start()` succeeded; carries the number of singletons realized so far
    Started { realized: usize },
    /// `shutdown()` began; no bean has been destroyed yet
    Closed,
}

impl fmt::Display for ContainerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerEvent::Started { realized } => write!(f, "started ({realized} realized)"),
            ContainerEvent::Closed => f.write_str("closed"),
        }
    }
}

/// Receiver of [`ContainerEvent`]s.
///
/// Implemented for any `Fn(&ContainerEvent) + Send + Sync` closure.
pub trait ContainerListener: Send + Sync + 'static {
    fn on_event(&self, event: &ContainerEvent);
}

impl<F> ContainerListener for F
where
    F: Fn(&ContainerEvent) + Send + Sync + 'static,
{
    #[inline]
    fn on_event(&self, event: &ContainerEvent) {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Passthrough;
    impl BeanPostProcessor for Passthrough {}

    struct Wrapping;
    impl BeanPostProcessor for Wrapping {
        fn after_initialization(&self, bean: SharedBean, name: &str) -> Result<SharedBean, BoxError> {
            let value = bean.downcast_ref::<u32>().copied().ok_or("not a u32")?;
            Ok(Arc::new(format!("{name}:{value}")))
        }
    }

    #[test]
    fn test_default_methods_pass_bean_through() {
        let bean: SharedBean = Arc::new(5u32);
        let before = Passthrough.before_initialization(Arc::clone(&bean), "n").unwrap();
        let after = Passthrough.after_initialization(before, "n").unwrap();
        assert!(Arc::ptr_eq(&bean, &after));
    }

    #[test]
    fn test_processor_can_replace_bean() {
        let bean: SharedBean = Arc::new(5u32);
        let wrapped = Wrapping.after_initialization(bean, "counter").unwrap();
        assert_eq!(wrapped.downcast_ref::<String>().map(String::as_str), Some("counter:5"));

        let foreign: SharedBean = Arc::new("text");
        assert!(Wrapping.after_initialization(foreign, "x").is_err());
    }

    #[test]
    fn test_closure_listener() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let listener = move |event: &ContainerEvent| sink.lock().unwrap().push(event.clone());

        listener.on_event(&ContainerEvent::Started { realized: 2 });
        listener.on_event(&ContainerEvent::Closed);

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![ContainerEvent::Started { realized: 2 }, ContainerEvent::Closed]
        );
        assert_eq!(events[0].to_string(), "started (2 realized)");
    }
}
