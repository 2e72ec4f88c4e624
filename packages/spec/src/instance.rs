//! Virtual spec instances and store recovery.

use std::any::{type_name, Any};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::convert::{from_value, to_value};
use crate::engine::{Engine, Invocation, Persistence, Reply};
use crate::{DefaultsHook, Result, SharedStore, SpecError, SpecType, Value};

/// A live object satisfying a [`SpecType`], backed by a store.
///
/// Cloning is cheap and yields a handle to the same instance: same engine,
/// same store, same memo cache.
#[derive(Clone)]
pub struct Instance {
    engine: Arc<Engine>,
}

impl Instance {
    pub(crate) fn new(
        spec: Arc<SpecType>,
        store: SharedStore,
        defaults: Arc<dyn DefaultsHook>,
        persistence: Option<Arc<dyn Persistence>>,
    ) -> Self {
        Self {
            engine: Arc::new(Engine::new(spec, store, defaults, persistence)),
        }
    }

    /// A non-top-level instance sharing this instance's defaults hook.
    pub fn nested(&self, spec: Arc<SpecType>, store: SharedStore) -> Instance {
        Instance::new(spec, store, self.engine.defaults().clone(), None)
    }

    /// Route an invocation through this instance's engine.
    pub fn dispatch(&self, invocation: Invocation<'_>) -> Result<Reply> {
        self.engine.dispatch(self, invocation)
    }

    /// Call a declared method by name.
    pub fn invoke(&self, method: &str, args: &[Value]) -> Result<Reply> {
        self.dispatch(Invocation::Call { method, args })
    }

    /// Call a zero-argument method and return its value, if any.
    pub fn get(&self, method: &str) -> Result<Option<Value>> {
        Ok(self.invoke(method, &[])?.into_value())
    }

    /// Call a zero-argument method and deserialize its value.
    pub fn get_as<T: DeserializeOwned>(&self, method: &str) -> Result<Option<T>> {
        self.get(method)?
            .map(|value| from_value(&value))
            .transpose()
    }

    /// Call a one-argument method, discarding any result.
    pub fn set(&self, method: &str, value: impl Into<Value>) -> Result<()> {
        self.invoke(method, &[value.into()]).map(drop)
    }

    /// Serialize `data` and pass it to a one-argument method.
    pub fn set_as<T: Serialize>(&self, method: &str, data: &T) -> Result<()> {
        self.set(method, to_value(data)?)
    }

    /// Call a zero-argument method for its effect only.
    pub fn call(&self, method: &str) -> Result<()> {
        self.invoke(method, &[]).map(drop)
    }

    /// Call a raw-map-access method and return the store it exposes.
    pub fn map_view(&self, method: &str) -> Result<SharedStore> {
        self.invoke(method, &[])?
            .into_store()
            .ok_or_else(|| SpecError::Convert {
                message: format!("method '{}' does not expose a store", method),
            })
    }

    /// The live backing store.
    pub fn store(&self) -> SharedStore {
        self.engine.store().clone()
    }

    pub fn spec_type(&self) -> &Arc<SpecType> {
        self.engine.spec()
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Whether reload and save are available on this instance.
    pub fn is_top_level(&self) -> bool {
        self.engine.is_top_level()
    }

    /// Run the defaults hook against the current store without clearing it.
    pub fn populate_defaults(&self) -> Result<()> {
        let store = self.engine.store();
        self.engine
            .defaults()
            .populate(self.engine.spec(), self, store.as_ref())
    }

    /// Clear the store and the memo cache, then repopulate defaults.
    ///
    /// Same effect as calling a reset-tagged method.
    pub fn reset(&self) -> Result<()> {
        self.engine.reset(self)
    }

    /// Hash of the backing store's entries.
    pub fn hash_code(&self) -> u64 {
        match self.dispatch(Invocation::Hash) {
            Ok(Reply::Hash(hash)) => hash,
            _ => 0,
        }
    }

    /// Whether both handles point at the same instance.
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.engine, &other.engine)
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dispatch(Invocation::Stringify) {
            Ok(Reply::Text(text)) => f.write_str(&text),
            _ => Err(fmt::Error),
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("spec", &self.spec_type().name())
            .field("entries", &self.engine.store().entries())
            .field("top_level", &self.is_top_level())
            .finish()
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        matches!(
            self.dispatch(Invocation::Equals(other as &dyn Any)),
            Ok(Reply::Bool(true))
        )
    }
}

impl Eq for Instance {}

impl Hash for Instance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_code());
    }
}

/// Recover the backing store of a spec instance.
///
/// Fails with [`SpecError::SpecTypeNotInstance`] when handed a spec type
/// itself, and with [`SpecError::NotAnInstance`] for anything else that is
/// not an [`Instance`].
pub fn store_of<T: Any>(value: &T) -> Result<SharedStore> {
    let any = value as &dyn Any;
    if let Some(instance) = any.downcast_ref::<Instance>() {
        return Ok(instance.store());
    }
    if let Some(spec) = any.downcast_ref::<SpecType>() {
        return Err(SpecError::SpecTypeNotInstance {
            spec: spec.name().to_string(),
        });
    }
    if let Some(spec) = any.downcast_ref::<Arc<SpecType>>() {
        return Err(SpecError::SpecTypeNotInstance {
            spec: spec.name().to_string(),
        });
    }
    Err(SpecError::NotAnInstance {
        type_name: type_name::<T>().to_string(),
    })
}
