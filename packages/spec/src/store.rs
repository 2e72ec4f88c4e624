//! Backing stores: flat, string-keyed maps of [`Value`]s.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::FxHasher;

use crate::{StoreError, Value};

/// A snapshot of a store's entries, in the store's iteration order.
///
/// Equality ignores order, so two snapshots are equal iff they hold the same
/// key/value pairs.
pub type Entries = IndexMap<String, Value>;

/// A store shared between instances and callers.
pub type SharedStore = Arc<dyn Store>;

/// A mutable mapping from string keys to values.
///
/// Methods take `&self`: implementations provide their own interior
/// mutability and decide their own thread-safety. The dispatch engine never
/// locks around store calls.
///
/// # Object Safety
///
/// This trait is object-safe: instances hold their store as `Arc<dyn Store>`.
pub trait Store: Send + Sync {
    /// Read the value under `key`, if present.
    fn get(&self, key: &str) -> Option<Value>;

    /// Store `value` under `key`, returning the previous value.
    fn insert(&self, key: &str, value: Value) -> Result<Option<Value>, StoreError>;

    /// Remove `key`, returning the value it held.
    fn remove(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Remove every entry.
    fn clear(&self) -> Result<(), StoreError>;

    /// Copy out all entries in iteration order.
    fn entries(&self) -> Entries;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Order-independent hash of a set of entries.
///
/// Each pair is hashed on its own and the results are summed, so two
/// snapshots that compare equal hash equally regardless of ordering.
pub fn hash_entries(entries: &Entries) -> u64 {
    entries.iter().fold(0u64, |acc, (key, value)| {
        let mut hasher = FxHasher::default();
        key.hash(&mut hasher);
        value.hash(&mut hasher);
        acc.wrapping_add(hasher.finish())
    })
}

/// An insertion-ordered in-memory store.
///
/// # Example
///
/// ```rust
/// use mapspec::{MapStore, Store, Value};
///
/// let store = MapStore::new();
/// store.insert("port", Value::from(8080)).unwrap();
/// assert_eq!(store.get("port"), Some(Value::from(8080)));
/// ```
#[derive(Default)]
pub struct MapStore {
    entries: RwLock<Entries>,
}

impl MapStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with initial entries.
    pub fn with_entries(entries: Entries) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Create an empty store already wrapped for sharing.
    pub fn shared() -> SharedStore {
        Arc::new(Self::new())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for MapStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::with_entries(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl Store for MapStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.read().get(key).cloned()
    }

    fn insert(&self, key: &str, value: Value) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.write().insert(key.to_string(), value))
    }

    fn remove(&self, key: &str) -> Result<Option<Value>, StoreError> {
        // shift_remove keeps the iteration order of the remaining keys
        Ok(self.entries.write().shift_remove(key))
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.entries.write().clear();
        Ok(())
    }

    fn entries(&self) -> Entries {
        self.entries.read().clone()
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }

    fn contains_key(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }
}

/// Wraps a live store to reject all writes.
///
/// Reads see the inner store's current state.
pub struct ReadOnlyStore {
    inner: SharedStore,
}

impl ReadOnlyStore {
    /// Create a new read-only view.
    pub fn new(inner: SharedStore) -> Self {
        Self { inner }
    }
}

impl Store for ReadOnlyStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.inner.get(key)
    }

    fn insert(&self, key: &str, _value: Value) -> Result<Option<Value>, StoreError> {
        Err(StoreError::ReadOnly {
            key: key.to_string(),
        })
    }

    fn remove(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Err(StoreError::ReadOnly {
            key: key.to_string(),
        })
    }

    fn clear(&self) -> Result<(), StoreError> {
        Err(StoreError::ReadOnly {
            key: "*".to_string(),
        })
    }

    fn entries(&self) -> Entries {
        self.inner.entries()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }
}
