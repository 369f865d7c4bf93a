//! Definition store
//!
//! Uses DashMap for lock-free concurrent lookups. Registration order is kept
//! through a per-entry sequence number so diagnostics and graph tie-breaking
//! stay deterministic.

use crate::{BeanDefinition, BeanError, Result};
use ahash::{AHashSet, RandomState};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

/// A definition plus its registration sequence number
struct StoredDefinition {
    sequence: u64,
    definition: Arc<BeanDefinition>,
}

/// Thread-safe mapping from bean identifier to definition.
///
/// Insertion fails on duplicate identifiers; lookup fails on unknown ones.
/// Iteration always follows registration order.
pub struct DefinitionStore {
    definitions: DashMap<String, StoredDefinition, RandomState>,
    sequence: AtomicU64,
}

impl DefinitionStore {
    /// Create new empty store with a small shard count.
    ///
    /// Default DashMap uses num_cpus * 4 shards which is overkill for
    /// typical containers with fewer than 50 beans.
    #[inline]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let shard_amount = if capacity <= 16 {
            8
        } else if capacity <= 64 {
            16
        } else {
            32
        };
        Self {
            definitions: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                RandomState::new(),
                shard_amount,
            ),
            sequence: AtomicU64::new(0),
        }
    }

    /// Register one definition.
    pub fn insert(&self, definition: BeanDefinition) -> Result<Arc<BeanDefinition>> {
        let name = definition.name().to_string();
        match self.definitions.entry(name) {
            Entry::Occupied(entry) => Err(BeanError::DuplicateIdentifier {
                name: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                let definition = Arc::new(definition);
                entry.insert(StoredDefinition {
                    sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
                    definition: Arc::clone(&definition),
                });

                #[cfg(feature = "logging")]
                debug!(
                    target: "bean_container",
                    bean = definition.name(),
                    scope = %definition.scope(),
                    lazy = definition.is_lazy(),
                    dependencies = ?definition.dependencies(),
                    "Registered bean definition"
                );

                Ok(definition)
            }
        }
    }

    /// Register a batch of definitions atomically.
    ///
    /// Either every definition is inserted or, on a duplicate identifier
    /// (within the batch or against the store), none is.
    pub fn insert_all(&self, definitions: Vec<BeanDefinition>) -> Result<usize> {
        let mut seen = AHashSet::with_capacity(definitions.len());
        for definition in &definitions {
            if !seen.insert(definition.name()) || self.contains(definition.name()) {
                return Err(BeanError::DuplicateIdentifier {
                    name: definition.name().to_string(),
                });
            }
        }
        drop(seen);

        let count = definitions.len();
        let mut inserted: Vec<String> = Vec::with_capacity(count);
        for definition in definitions {
            let name = definition.name().to_string();
            if let Err(err) = self.insert(definition) {
                // Lost a race with a concurrent registration: roll back
                for name in &inserted {
                    self.definitions.remove(name);
                }
                return Err(err);
            }
            inserted.push(name);
        }
        Ok(count)
    }

    /// Look up a definition by identifier
    #[inline]
    pub fn get(&self, name: &str) -> Result<Arc<BeanDefinition>> {
        self.definitions
            .get(name)
            .map(|stored| Arc::clone(&stored.definition))
            .ok_or_else(|| BeanError::unknown(name))
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// All definitions in registration order
    pub fn definitions(&self) -> Vec<Arc<BeanDefinition>> {
        let mut ordered: Vec<(u64, Arc<BeanDefinition>)> = self
            .definitions
            .iter()
            .map(|entry| (entry.sequence, Arc::clone(&entry.definition)))
            .collect();
        ordered.sort_unstable_by_key(|(sequence, _)| *sequence);
        ordered.into_iter().map(|(_, definition)| definition).collect()
    }

    /// All identifiers in registration order
    pub fn names(&self) -> Vec<String> {
        self.definitions()
            .iter()
            .map(|definition| definition.name().to_string())
            .collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for DefinitionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DefinitionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefinitionStore")
            .field("count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str) -> BeanDefinition {
        BeanDefinition::singleton(name, |_| Ok(0u32)).build()
    }

    #[test]
    fn test_store_insert_and_get() {
        let store = DefinitionStore::new();
        store.insert(def("a")).unwrap();

        let found = store.get("a").unwrap();
        assert_eq!(found.name(), "a");
        assert!(store.contains("a"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_rejects_duplicates() {
        let store = DefinitionStore::new();
        store.insert(def("a")).unwrap();

        let err = store.insert(def("a")).unwrap_err();
        assert!(matches!(err, BeanError::DuplicateIdentifier { ref name } if name == "a"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_unknown_bean() {
        let store = DefinitionStore::new();
        let err = store.get("missing").unwrap_err();
        assert!(matches!(err, BeanError::UnknownBean { ref name, required_by: None } if name == "missing"));
    }

    #[test]
    fn test_store_preserves_registration_order() {
        let store = DefinitionStore::with_capacity(32);
        let names = ["zeta", "alpha", "mid", "beta", "omega"];
        for name in names {
            store.insert(def(name)).unwrap();
        }

        assert_eq!(store.names(), names);
    }

    #[test]
    fn test_store_batch_is_atomic() {
        let store = DefinitionStore::new();
        store.insert(def("existing")).unwrap();

        let err = store
            .insert_all(vec![def("fresh"), def("existing")])
            .unwrap_err();
        assert!(matches!(err, BeanError::DuplicateIdentifier { .. }));
        assert!(!store.contains("fresh"));

        let err = store.insert_all(vec![def("x"), def("x")]).unwrap_err();
        assert!(matches!(err, BeanError::DuplicateIdentifier { .. }));
        assert!(!store.contains("x"));

        assert_eq!(store.insert_all(vec![def("x"), def("y")]).unwrap(), 2);
        assert_eq!(store.names(), ["existing", "x", "y"]);
    }
}
