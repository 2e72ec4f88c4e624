//! The dispatch engine behind every spec instance.
//!
//! Each call on an [`Instance`] becomes an [`Invocation`] and lands in
//! [`Engine::dispatch`], which picks one behavior, first match wins:
//!
//! 1. identity methods (stringify, equality, hashing)
//! 2. pass-through methods, run through their default body
//! 3. memoized methods, run once through their default body and cached
//! 4. raw-map access (copy, read-only view or the live store)
//! 5. reload / save, only on a top-level instance
//! 6. reset to defaults
//! 7. plain property reads and writes against the store

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::store::hash_entries;
use crate::{
    Classification, DefaultsHook, Instance, MapMode, MapStore, MemoCache, Method, ReadOnlyStore,
    Result, Returns, SharedStore, SpecError, SpecType, Value,
};

/// Reload/save backend of a top-level instance.
///
/// Nested instances never have one; reload or save on them fails before any
/// backend is reached.
pub trait Persistence: Send + Sync {
    /// Replace the instance's state with the persisted one.
    fn reload(&self, instance: &Instance) -> Result<()>;

    /// Persist the instance's current state.
    fn save(&self, instance: &Instance) -> Result<()>;
}

/// One call routed to an engine.
#[derive(Clone, Copy)]
pub enum Invocation<'a> {
    Stringify,
    /// Compare against any value. Only instances can be equal.
    Equals(&'a dyn Any),
    Hash,
    Call {
        method: &'a str,
        args: &'a [Value],
    },
}

/// What a dispatched call produced.
#[derive(Clone)]
pub enum Reply {
    /// The method returns nothing.
    Unit,
    /// A property read found no value under its key.
    Absent,
    Value(Value),
    Text(String),
    Bool(bool),
    Hash(u64),
    Store(SharedStore),
}

impl Reply {
    /// The produced value; `None` for `Unit` and `Absent`.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Reply::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_store(self) -> Option<SharedStore> {
        match self {
            Reply::Store(store) => Some(store),
            _ => None,
        }
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Unit => f.write_str("Unit"),
            Reply::Absent => f.write_str("Absent"),
            Reply::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Reply::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Reply::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Reply::Hash(h) => f.debug_tuple("Hash").field(h).finish(),
            Reply::Store(store) => f.debug_tuple("Store").field(&store.entries()).finish(),
        }
    }
}

/// Dispatch state bound to one (spec type, store) pair.
pub struct Engine {
    spec: Arc<SpecType>,
    store: SharedStore,
    memo: MemoCache,
    defaults: Arc<dyn DefaultsHook>,
    persistence: Option<Arc<dyn Persistence>>,
}

impl Engine {
    pub(crate) fn new(
        spec: Arc<SpecType>,
        store: SharedStore,
        defaults: Arc<dyn DefaultsHook>,
        persistence: Option<Arc<dyn Persistence>>,
    ) -> Self {
        Self {
            spec,
            store,
            memo: MemoCache::new(),
            defaults,
            persistence,
        }
    }

    pub fn spec(&self) -> &Arc<SpecType> {
        &self.spec
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn memo(&self) -> &MemoCache {
        &self.memo
    }

    pub fn defaults(&self) -> &Arc<dyn DefaultsHook> {
        &self.defaults
    }

    pub fn is_top_level(&self) -> bool {
        self.persistence.is_some()
    }

    /// Route one invocation. `proxy` is the instance this engine backs; it is
    /// what default bodies and the defaults hook get to call back into.
    pub fn dispatch(&self, proxy: &Instance, invocation: Invocation<'_>) -> Result<Reply> {
        match invocation {
            Invocation::Stringify => Ok(Reply::Text(self.stringify())),
            Invocation::Equals(other) => Ok(Reply::Bool(self.equals(other))),
            Invocation::Hash => Ok(Reply::Hash(hash_entries(&self.store.entries()))),
            Invocation::Call { method, args } => {
                let method = self
                    .spec
                    .method(method)
                    .ok_or_else(|| SpecError::UnknownMethod {
                        spec: self.spec.name().to_string(),
                        method: method.to_string(),
                    })?;
                self.call(proxy, method, args)
            }
        }
    }

    fn call(&self, proxy: &Instance, method: &Method, args: &[Value]) -> Result<Reply> {
        match method.classification() {
            Classification::PassThrough => {
                let body = method.body().ok_or_else(|| SpecError::MissingBody {
                    method: method.name().to_string(),
                    reason: "pass-through methods run their default body",
                })?;
                let value = body(proxy, args)?;
                Ok(match method.descriptor().returns() {
                    Returns::Nothing => Reply::Unit,
                    Returns::Value => Reply::Value(value),
                })
            }
            Classification::Memoized => {
                let body = method.body().ok_or_else(|| SpecError::MissingBody {
                    method: method.name().to_string(),
                    reason: "memoized methods must have a default body",
                })?;
                // keyed by method only: arguments after the first call are ignored
                let value = self.memo.get_or_compute(method.id(), || body(proxy, args))?;
                Ok(match method.descriptor().returns() {
                    Returns::Nothing => Reply::Unit,
                    Returns::Value => Reply::Value(value),
                })
            }
            Classification::AsMap(mode) => Ok(Reply::Store(match mode {
                MapMode::Copy => Arc::new(MapStore::with_entries(self.store.entries())),
                MapMode::ReadOnly => Arc::new(ReadOnlyStore::new(self.store.clone())),
                MapMode::Live => self.store.clone(),
            })),
            Classification::Reload => {
                let persistence = self
                    .persistence
                    .as_ref()
                    .ok_or(SpecError::NotTopLevel {
                        operation: "reload",
                    })?;
                // the backend may have touched the store even when it fails
                let reloaded = persistence.reload(proxy);
                self.memo.clear();
                reloaded.map(|()| Reply::Unit)
            }
            Classification::Save => {
                let persistence = self
                    .persistence
                    .as_ref()
                    .ok_or(SpecError::NotTopLevel { operation: "save" })?;
                persistence.save(proxy)?;
                Ok(Reply::Unit)
            }
            Classification::Reset => {
                self.reset(proxy)?;
                Ok(Reply::Unit)
            }
            Classification::Write { key } => {
                let value = args.first().cloned().ok_or_else(|| SpecError::MissingArgument {
                    method: method.name().to_string(),
                })?;
                self.store.insert(key, value)?;
                self.memo.clear();
                Ok(Reply::Unit)
            }
            Classification::Read { key } => {
                Ok(self.store.get(key).map_or(Reply::Absent, Reply::Value))
            }
        }
    }

    /// Empty the store and the memo cache, then repopulate defaults.
    ///
    /// The cache is cleared again afterwards: anything memoized while the
    /// store was half-populated must not outlive the reset.
    pub(crate) fn reset(&self, proxy: &Instance) -> Result<()> {
        self.store.clear()?;
        self.memo.clear();
        let populated = self.defaults.populate(&self.spec, proxy, self.store.as_ref());
        self.memo.clear();
        populated
    }

    fn stringify(&self) -> String {
        let body = self
            .store
            .entries()
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}({})", self.spec.name(), body)
    }

    /// Instances are equal when their stores hold equal entries. The spec
    /// type takes no part.
    fn equals(&self, other: &dyn Any) -> bool {
        match other.downcast_ref::<Instance>() {
            Some(other) => self.store.entries() == other.store().entries(),
            None => false,
        }
    }
}
