//! Creating spec instances.

use std::any::TypeId;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::{
    DeclaredDefaults, DefaultsHook, Instance, KeyResolver, KeyStyle, MapStore, NamingConvention,
    Persistence, Result, SharedStore, SpecType, SpecTypeBuilder,
};

/// A Rust type standing for one spec.
///
/// Implementors are thin wrappers over an [`Instance`] whose methods forward
/// to [`Instance::get`], [`Instance::set`] and friends.
///
/// # Example
///
/// ```rust
/// use mapspec::{Instance, MethodDescriptor, Spec, SpecFactory, SpecType, SpecTypeBuilder, Tag};
///
/// struct Server(Instance);
///
/// impl Spec for Server {
///     fn describe() -> SpecTypeBuilder {
///         SpecType::builder("Server")
///             .method(MethodDescriptor::getter("get_port").default_value(80))
///             .method(MethodDescriptor::setter("set_port"))
///             .method(MethodDescriptor::action("reset").tag(Tag::Reset))
///     }
///
///     fn wrap(instance: Instance) -> Self {
///         Server(instance)
///     }
///
///     fn instance(&self) -> &Instance {
///         &self.0
///     }
/// }
///
/// impl Server {
///     fn port(&self) -> mapspec::Result<Option<u16>> {
///         self.0.get_as("get_port")
///     }
///
///     fn set_port(&self, port: u16) -> mapspec::Result<()> {
///         self.0.set("set_port", port)
///     }
/// }
///
/// let factory = SpecFactory::new();
/// let server: Server = factory.create_default_of().unwrap();
/// server.set_port(8080).unwrap();
/// assert_eq!(server.port().unwrap(), Some(8080));
/// server.instance().call("reset").unwrap();
/// assert_eq!(server.port().unwrap(), Some(80));
/// ```
pub trait Spec: Sized + 'static {
    /// Declare this spec's methods.
    fn describe() -> SpecTypeBuilder;

    fn wrap(instance: Instance) -> Self;

    fn instance(&self) -> &Instance;

    /// The live backing store.
    fn store(&self) -> SharedStore {
        self.instance().store()
    }
}

/// Builds spec types and instances with one key resolver and defaults hook.
///
/// Spec types described through [`Spec`] are built once per factory and
/// shared by every instance created from it.
pub struct SpecFactory {
    resolver: Arc<dyn KeyResolver>,
    defaults: Arc<dyn DefaultsHook>,
    types: RwLock<FxHashMap<TypeId, Arc<SpecType>>>,
}

impl SpecFactory {
    /// A factory using [`NamingConvention`] and [`DeclaredDefaults`].
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> SpecFactoryBuilder {
        SpecFactoryBuilder::default()
    }

    pub fn resolver(&self) -> &dyn KeyResolver {
        self.resolver.as_ref()
    }

    /// Classify a described spec with this factory's resolver.
    pub fn build(&self, builder: SpecTypeBuilder) -> Result<Arc<SpecType>> {
        let spec = builder.build(self.resolver.as_ref())?;
        log::debug!(
            "Built spec type {} with {} methods",
            spec.name(),
            spec.methods().count()
        );
        Ok(spec)
    }

    /// The spec type for `S`, built on first use.
    pub fn spec_type<S: Spec>(&self) -> Result<Arc<SpecType>> {
        let id = TypeId::of::<S>();
        if let Some(spec) = self.types.read().get(&id) {
            return Ok(spec.clone());
        }

        let spec = self.build(S::describe())?;
        Ok(self.types.write().entry(id).or_insert(spec).clone())
    }

    /// Wrap `store` as-is. No defaults are written.
    pub fn create_unsafe(&self, spec: &Arc<SpecType>, store: SharedStore) -> Instance {
        log::trace!("Creating {} instance", spec.name());
        Instance::new(spec.clone(), store, self.defaults.clone(), None)
    }

    /// A new instance over a fresh [`MapStore`] holding the spec's defaults.
    pub fn create_default(&self, spec: &Arc<SpecType>) -> Result<Instance> {
        let instance = self.create_unsafe(spec, MapStore::shared());
        instance.populate_defaults()?;
        Ok(instance)
    }

    /// A top-level instance whose reload and save go through `persistence`.
    ///
    /// The store is used as-is; call reload to fill it.
    pub fn create_top_level(
        &self,
        spec: &Arc<SpecType>,
        store: SharedStore,
        persistence: Arc<dyn Persistence>,
    ) -> Instance {
        log::trace!("Creating top-level {} instance", spec.name());
        Instance::new(spec.clone(), store, self.defaults.clone(), Some(persistence))
    }

    pub fn create<S: Spec>(&self, store: SharedStore) -> Result<S> {
        let spec = self.spec_type::<S>()?;
        Ok(S::wrap(self.create_unsafe(&spec, store)))
    }

    pub fn create_default_of<S: Spec>(&self) -> Result<S> {
        let spec = self.spec_type::<S>()?;
        Ok(S::wrap(self.create_default(&spec)?))
    }
}

impl Default for SpecFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for a [`SpecFactory`].
#[derive(Default)]
pub struct SpecFactoryBuilder {
    resolver: Option<Arc<dyn KeyResolver>>,
    defaults: Option<Arc<dyn DefaultsHook>>,
}

impl SpecFactoryBuilder {
    pub fn key_resolver(mut self, resolver: impl KeyResolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Use [`NamingConvention`] with the given key style.
    pub fn key_style(self, style: KeyStyle) -> Self {
        self.key_resolver(NamingConvention::new(style))
    }

    pub fn defaults_hook(mut self, hook: impl DefaultsHook + 'static) -> Self {
        self.defaults = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> SpecFactory {
        SpecFactory {
            resolver: self
                .resolver
                .unwrap_or_else(|| Arc::new(NamingConvention::default())),
            defaults: self.defaults.unwrap_or_else(|| Arc::new(DeclaredDefaults)),
            types: RwLock::new(FxHashMap::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Classification, MethodDescriptor, Resolution, Store, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DESCRIBED: AtomicUsize = AtomicUsize::new(0);

    struct Counted(Instance);

    impl Spec for Counted {
        fn describe() -> SpecTypeBuilder {
            DESCRIBED.fetch_add(1, Ordering::SeqCst);
            SpecType::builder("Counted").method(MethodDescriptor::getter("get_value"))
        }

        fn wrap(instance: Instance) -> Self {
            Counted(instance)
        }

        fn instance(&self) -> &Instance {
            &self.0
        }
    }

    #[test]
    fn spec_type_is_built_once_per_factory() {
        let factory = SpecFactory::new();
        let before = DESCRIBED.load(Ordering::SeqCst);

        let first = factory.spec_type::<Counted>().unwrap();
        let second = factory.spec_type::<Counted>().unwrap();
        let _instance: Counted = factory.create(MapStore::shared()).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(DESCRIBED.load(Ordering::SeqCst) - before, 1);
    }

    #[test]
    fn key_style_is_applied() {
        let factory = SpecFactory::builder().key_style(KeyStyle::Kebab).build();
        let spec = factory
            .build(SpecType::builder("Game").method(MethodDescriptor::getter("get_max_players")))
            .unwrap();

        assert_eq!(
            spec.method("get_max_players").unwrap().classification(),
            &Classification::Read {
                key: "max-players".to_string()
            }
        );
    }

    struct Upper;

    impl KeyResolver for Upper {
        fn resolve(&self, method: &MethodDescriptor) -> Resolution {
            Resolution {
                key: method.name().to_uppercase(),
                is_setter: method.name().starts_with("put"),
            }
        }
    }

    #[test]
    fn custom_resolver_drives_classification() {
        let factory = SpecFactory::builder().key_resolver(Upper).build();
        let spec = factory
            .build(
                SpecType::builder("Custom")
                    .method(MethodDescriptor::new("put", 1, crate::Returns::Value)),
            )
            .unwrap();
        let instance = factory.create_unsafe(&spec, MapStore::shared());

        instance.set("put", 3).unwrap();
        assert_eq!(instance.store().get("PUT"), Some(Value::from(3)));
    }

    struct Fixed;

    impl DefaultsHook for Fixed {
        fn populate(&self, _spec: &SpecType, _instance: &Instance, store: &dyn Store) -> Result<()> {
            store.insert("fixed", Value::from(true))?;
            Ok(())
        }
    }

    #[test]
    fn custom_defaults_hook_is_used() {
        let factory = SpecFactory::builder().defaults_hook(Fixed).build();
        let spec = factory.build(SpecType::builder("Empty")).unwrap();
        let instance = factory.create_default(&spec).unwrap();

        assert_eq!(instance.to_string(), "Empty(fixed=true)");
        assert!(!instance.is_top_level());
    }
}
