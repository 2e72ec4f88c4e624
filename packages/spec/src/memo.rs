//! Per-instance cache for memoized method results.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::{MethodId, Result, Value};

/// Thread-safe cache of memoized results, keyed by method identity only.
///
/// The table is allocated on the first memoized call. Computation runs
/// without holding the lock, so a body may call back into the instance
/// (including setters, which clear this cache). Under contention two threads
/// may both compute; the first result stored is the one every caller sees
/// from then on.
#[derive(Default)]
pub struct MemoCache {
    slots: OnceLock<RwLock<FxHashMap<MethodId, Value>>>,
    /// Bumped by every clear. A result computed under an older generation
    /// is handed to its caller but never stored.
    generation: AtomicU64,
}

impl MemoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `id`, computing and storing it if absent.
    ///
    /// Errors from `compute` are returned as-is and nothing is cached.
    pub fn get_or_compute<F>(&self, id: MethodId, compute: F) -> Result<Value>
    where
        F: FnOnce() -> Result<Value>,
    {
        let slots = self.slots.get_or_init(Default::default);
        if let Some(value) = slots.read().get(&id) {
            return Ok(value.clone());
        }

        let generation = self.generation.load(Ordering::Acquire);
        let value = compute()?;

        let mut slots = slots.write();
        if self.generation.load(Ordering::Acquire) != generation {
            return Ok(value);
        }
        Ok(slots.entry(id).or_insert(value).clone())
    }

    /// Drop every cached value.
    pub fn clear(&self) {
        match self.slots.get() {
            Some(slots) => {
                let mut slots = slots.write();
                self.generation.fetch_add(1, Ordering::AcqRel);
                slots.clear();
            }
            None => {
                self.generation.fetch_add(1, Ordering::AcqRel);
            }
        }
    }

    /// Whether the table has been allocated yet.
    pub fn is_allocated(&self) -> bool {
        self.slots.get().is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.get().map_or(0, |slots| slots.read().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SpecError;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn allocates_lazily() {
        let cache = MemoCache::new();
        assert!(!cache.is_allocated());
        cache.clear();
        assert!(!cache.is_allocated());

        cache
            .get_or_compute(MethodId(0), || Ok(Value::from(1)))
            .unwrap();
        assert!(cache.is_allocated());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn computes_once_until_cleared() {
        let cache = MemoCache::new();
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Value::from("computed"))
        };

        assert_eq!(
            cache.get_or_compute(MethodId(3), compute).unwrap(),
            Value::from("computed")
        );
        cache.get_or_compute(MethodId(3), compute).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.clear();
        cache.get_or_compute(MethodId(3), compute).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn errors_are_not_cached() {
        let cache = MemoCache::new();
        let result = cache.get_or_compute(MethodId(0), || {
            Err(SpecError::Convert {
                message: "nope".to_string(),
            })
        });
        assert!(matches!(result, Err(SpecError::Convert { .. })));
        assert!(cache.is_empty());

        let value = cache
            .get_or_compute(MethodId(0), || Ok(Value::from(5)))
            .unwrap();
        assert_eq!(value, Value::from(5));
    }

    #[test]
    fn value_computed_across_a_clear_is_not_kept() {
        let cache = MemoCache::new();
        let value = cache
            .get_or_compute(MethodId(0), || {
                cache.clear();
                Ok(Value::from("stale"))
            })
            .unwrap();

        assert_eq!(value, Value::from("stale"));
        assert!(cache.is_empty());
    }

    #[test]
    fn reentrant_computation_does_not_deadlock() {
        let cache = MemoCache::new();
        let outer = cache
            .get_or_compute(MethodId(0), || {
                let inner = cache.get_or_compute(MethodId(1), || Ok(Value::from(2)))?;
                Ok(Value::from(inner.as_i64().unwrap_or(0) * 10))
            })
            .unwrap();

        assert_eq!(outer, Value::from(20));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn concurrent_callers_see_one_result() {
        let cache = Arc::new(MemoCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                let calls = calls.clone();
                std::thread::spawn(move || {
                    cache
                        .get_or_compute(MethodId(0), || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok(Value::from(i as i64))
                        })
                        .unwrap()
                })
            })
            .collect();

        let results: Vec<Value> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
        assert!(calls.load(Ordering::SeqCst) >= 1);
        assert_eq!(cache.len(), 1);
    }
}
