//! Bean scopes and singleton bookkeeping
//!
//! The [`ScopeManager`] owns one slot per singleton definition. A slot moves
//! `Unrealized → Realizing → Realized`; prototypes never get a slot because
//! the container keeps no reference to them after creation.

use crate::factory::SharedBean;
use crate::Result;
use ahash::RandomState;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Instance reuse policy of a bean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// One shared instance per container
    #[default]
    Singleton,

    /// A fresh instance on every retrieval, never cached
    Prototype,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Singleton => f.write_str("singleton"),
            Scope::Prototype => f.write_str("prototype"),
        }
    }
}

/// Realization state of a singleton bean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BeanState {
    /// Not created yet (or its last creation attempt failed)
    Unrealized,
    /// Construction is in flight
    Realizing,
    /// Cached for the rest of the container's lifetime
    Realized,
}

impl BeanState {
    const fn as_u8(self) -> u8 {
        match self {
            BeanState::Unrealized => 0,
            BeanState::Realizing => 1,
            BeanState::Realized => 2,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => BeanState::Realizing,
            2 => BeanState::Realized,
            _ => BeanState::Unrealized,
        }
    }
}

/// A constructed bean in both of its forms.
#[derive(Clone)]
pub(crate) struct RealizedBean {
    /// Value produced by the factory; lifecycle hooks run on this
    pub raw: SharedBean,
    /// Value after post-processing; this is what callers receive
    pub exposed: SharedBean,
}

/// Single-flight cell for one singleton.
struct SingletonSlot {
    state: AtomicU8,
    cell: OnceCell<RealizedBean>,
}

impl SingletonSlot {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(BeanState::Unrealized.as_u8()),
            cell: OnceCell::new(),
        }
    }

    #[inline]
    fn set_state(&self, state: BeanState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }
}

/// Tracks singleton instances and the order in which they were realized.
pub(crate) struct ScopeManager {
    slots: HashMap<String, SingletonSlot, RandomState>,
    /// Singleton names in realization order (dependencies first)
    realized: Mutex<Vec<String>>,
}

impl ScopeManager {
    /// Create a slot for every singleton name
    pub fn new<'a>(singletons: impl IntoIterator<Item = &'a str>) -> Self {
        let slots: HashMap<String, SingletonSlot, RandomState> = singletons
            .into_iter()
            .map(|name| (name.to_string(), SingletonSlot::new()))
            .collect();
        let capacity = slots.len();

        Self {
            slots,
            realized: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    /// Return the cached singleton, realizing it with `construct` on first use.
    ///
    /// Concurrent callers for the same name block on the in-flight
    /// construction and observe its result; a failed construction leaves the
    /// slot `Unrealized` so a later call may retry. Callers for distinct
    /// names never wait on each other.
    pub fn realize<F>(&self, name: &str, construct: F) -> Result<RealizedBean>
    where
        F: FnOnce() -> Result<RealizedBean>,
    {
        let Some(slot) = self.slots.get(name) else {
            // Not a singleton: nothing to cache
            return construct();
        };

        if let Some(bean) = slot.cell.get() {
            #[cfg(feature = "logging")]
            trace!(
                target: "bean_container",
                bean = name,
                "Returning cached singleton instance"
            );
            return Ok(bean.clone());
        }

        let bean = slot.cell.get_or_try_init(|| {
            slot.set_state(BeanState::Realizing);

            #[cfg(feature = "logging")]
            debug!(
                target: "bean_container",
                bean = name,
                "Realizing singleton"
            );

            match construct() {
                Ok(bean) => {
                    self.realized
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(name.to_string());
                    slot.set_state(BeanState::Realized);
                    Ok(bean)
                }
                Err(err) => {
                    slot.set_state(BeanState::Unrealized);
                    Err(err)
                }
            }
        })?;

        Ok(bean.clone())
    }

    /// Cached instance, if the singleton is realized
    pub fn get(&self, name: &str) -> Option<RealizedBean> {
        self.slots.get(name).and_then(|slot| slot.cell.get().cloned())
    }

    /// Whether the singleton's instance is cached
    #[inline]
    pub fn is_cached(&self, name: &str) -> bool {
        self.slots.get(name).is_some_and(|slot| slot.cell.get().is_some())
    }

    /// Current state of a singleton slot (`None` for non-singletons)
    pub fn state(&self, name: &str) -> Option<BeanState> {
        self.slots
            .get(name)
            .map(|slot| BeanState::from_u8(slot.state.load(Ordering::Acquire)))
    }

    /// Singleton names in the order they finished realizing
    pub fn realized(&self) -> Vec<String> {
        self.realized
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of singleton slots
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }
}

impl std::fmt::Debug for ScopeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeManager")
            .field("singletons", &self.len())
            .field("realized", &self.realized().len())
            .finish()
    }
}
