//! Type-erased constructors and lifecycle hooks
//!
//! A [`BeanDefinition`](crate::BeanDefinition) is built from typed closures,
//! but the container stores every bean as `Arc<dyn Any + Send + Sync>`. This
//! module erases the closures once, at registration time, so the
//! instantiation engine never needs to be generic over bean types.

use crate::{BeanContext, BoxError};
use std::any::{Any, TypeId};
use std::sync::Arc;

/// A realized bean as the container stores and hands it out.
pub type SharedBean = Arc<dyn Any + Send + Sync>;

/// Marker trait for types that can be managed by the container.
///
/// This is automatically implemented for all types that are `Send + Sync + 'static`.
/// You never need to implement this manually.
pub trait Injectable: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Injectable for T {}

/// Type-erased constructor
type ConstructFn = Arc<dyn Fn(&BeanContext<'_>) -> Result<SharedBean, BoxError> + Send + Sync>;

/// Type-erased hook taking the raw bean
type HookFn = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> Result<(), BoxError> + Send + Sync>;

/// Constructor for one bean definition.
///
/// Wraps the user's typed factory so its output is boxed into an `Arc`
/// exactly once; resolving a singleton afterwards only clones that `Arc`.
#[derive(Clone)]
pub(crate) struct BeanFactory {
    construct: ConstructFn,
    type_id: TypeId,
    type_name: &'static str,
}

impl BeanFactory {
    /// Erase a typed factory closure
    #[inline]
    pub fn new<T: Injectable, F>(factory: F) -> Self
    where
        F: Fn(&BeanContext<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            construct: Arc::new(move |ctx: &BeanContext<'_>| {
                factory(ctx).map(|bean| Arc::new(bean) as SharedBean)
            }),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Factory that hands out a clone of a pre-built value
    #[inline]
    pub fn from_value<T: Injectable + Clone>(value: T) -> Self {
        Self::new(move |_| Ok(value.clone()))
    }

    /// Run the constructor
    #[inline]
    pub fn create(&self, ctx: &BeanContext<'_>) -> Result<SharedBean, BoxError> {
        (self.construct)(ctx)
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// An init, pre-destroy or destroy hook.
///
/// Hooks are always invoked on the value the factory produced, never on a
/// wrapper returned by a post-processor.
#[derive(Clone)]
pub(crate) struct LifecycleHook {
    hook: HookFn,
}

impl LifecycleHook {
    /// Erase a typed hook closure
    #[inline]
    pub fn new<T: Injectable, F>(hook: F) -> Self
    where
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let type_name = std::any::type_name::<T>();
        Self {
            hook: Arc::new(move |bean: &(dyn Any + Send + Sync)| match bean.downcast_ref::<T>() {
                Some(typed) => hook(typed),
                None => Err(format!("hook expects a bean of type {type_name}").into()),
            }),
        }
    }

    /// Invoke the hook on a raw bean
    #[inline]
    pub fn invoke(&self, bean: &SharedBean) -> Result<(), BoxError> {
        (self.hook)(&**bean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Clone)]
    struct TestService {
        id: u32,
    }

    fn empty_context() -> BeanContext<'static> {
        BeanContext::new("test", &[], Vec::new())
    }

    #[test]
    fn test_factory_creates_fresh_values() {
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        let factory = BeanFactory::new(|_| {
            Ok(TestService {
                id: COUNTER.fetch_add(1, Ordering::SeqCst),
            })
        });

        let ctx = empty_context();
        let a = factory.create(&ctx).unwrap().downcast::<TestService>().unwrap();
        let b = factory.create(&ctx).unwrap().downcast::<TestService>().unwrap();

        assert_ne!(a.id, b.id);
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(factory.type_id(), TypeId::of::<TestService>());
    }

    #[test]
    fn test_factory_from_value_clones() {
        let factory = BeanFactory::from_value(TestService { id: 7 });
        let ctx = empty_context();

        let a = factory.create(&ctx).unwrap().downcast::<TestService>().unwrap();
        let b = factory.create(&ctx).unwrap().downcast::<TestService>().unwrap();

        assert_eq!(a.id, 7);
        assert_eq!(b.id, 7);
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_factory_error_passes_through() {
        let factory = BeanFactory::new::<TestService, _>(|_| Err("no connection".into()));
        let err = factory.create(&empty_context()).err().unwrap();
        assert_eq!(err.to_string(), "no connection");
    }

    #[test]
    fn test_hook_sees_typed_bean() {
        static SEEN: AtomicU32 = AtomicU32::new(0);

        let hook = LifecycleHook::new(|svc: &TestService| {
            SEEN.store(svc.id, Ordering::SeqCst);
            Ok(())
        });

        let bean: SharedBean = Arc::new(TestService { id: 42 });
        hook.invoke(&bean).unwrap();
        assert_eq!(SEEN.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn test_hook_rejects_foreign_type() {
        let hook = LifecycleHook::new(|_: &TestService| Ok(()));
        let bean: SharedBean = Arc::new(String::from("not a service"));
        assert!(hook.invoke(&bean).is_err());
    }
}
