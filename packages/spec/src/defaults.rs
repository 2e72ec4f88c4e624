//! Default-value population.

use crate::{DefaultValue, Instance, MapStore, Result, SpecType, Store, Value};

/// Fills a store with a spec's default values.
///
/// Runs when a spec is created with defaults and on every reset, always
/// against a store that was just emptied. Implementations may call accessors
/// on `instance`; those route back through its dispatch engine.
pub trait DefaultsHook: Send + Sync {
    fn populate(&self, spec: &SpecType, instance: &Instance, store: &dyn Store) -> Result<()>;
}

/// Writes each property's declared default, in declaration order.
///
/// Nested spec defaults get a fresh instance over their own [`MapStore`],
/// populated the same way. Properties without a declared default stay absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredDefaults;

impl DefaultsHook for DeclaredDefaults {
    fn populate(&self, spec: &SpecType, instance: &Instance, store: &dyn Store) -> Result<()> {
        for (key, method) in spec.properties() {
            let value = match method.default() {
                Some(DefaultValue::Value(value)) => value.clone(),
                Some(DefaultValue::Nested(nested)) => {
                    let child = instance.nested(nested.clone(), MapStore::shared());
                    child.populate_defaults()?;
                    Value::Spec(child)
                }
                None => continue,
            };
            store.insert(key, value)?;
        }
        Ok(())
    }
}
