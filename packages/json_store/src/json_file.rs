use std::io::Write;
use std::sync::Arc;
use std::{fs, io, path};

use serde_json::value::Value as JsonValue;
use serde_json::Map as JsonMap;

use mapspec::{
    entries_to_json, json_to_value, Instance, MapStore, Persistence, Result, Spec, SpecFactory,
    SpecType, Value,
};

use crate::JsonStoreError;

/// Persists a top-level spec instance as one JSON object on local disk.
///
/// Reload starts from the spec's defaults and overlays whatever the file
/// holds, so keys missing from the file keep their defaults and keys the
/// spec does not declare are kept as-is. A missing file reloads to plain
/// defaults.
///
/// # Example
///
/// ```rust,no_run
/// use mapspec::{MethodDescriptor, SpecFactory, SpecType, Tag};
/// use mapspec_json_store::JsonFile;
///
/// let factory = SpecFactory::new();
/// let spec = factory
///     .build(
///         SpecType::builder("Server")
///             .method(MethodDescriptor::getter("get_port").default_value(80))
///             .method(MethodDescriptor::setter("set_port"))
///             .method(MethodDescriptor::action("save").tag(Tag::Save)),
///     )
///     .unwrap();
///
/// let server = JsonFile::new("server.json").open(&factory, &spec).unwrap();
/// server.set("set_port", 8080).unwrap();
/// server.call("save").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: path::PathBuf,
    pretty: bool,
}

impl JsonFile {
    pub fn new(path: impl Into<path::PathBuf>) -> Self {
        Self {
            path: path.into(),
            pretty: true,
        }
    }

    /// Write indented JSON on save. On by default.
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn path(&self) -> &path::Path {
        &self.path
    }

    /// Create a top-level instance over a fresh store and load it from this
    /// file.
    pub fn open(self, factory: &SpecFactory, spec: &Arc<SpecType>) -> Result<Instance> {
        let file = Arc::new(self);
        let instance = factory.create_top_level(spec, MapStore::shared(), file.clone());
        file.reload(&instance)?;
        Ok(instance)
    }

    /// Typed variant of [`JsonFile::open`].
    pub fn open_spec<S: Spec>(self, factory: &SpecFactory) -> Result<S> {
        let spec = factory.spec_type::<S>()?;
        Ok(S::wrap(self.open(factory, &spec)?))
    }

    fn read_document(&self) -> Result<Option<JsonMap<String, JsonValue>>, JsonStoreError> {
        log::debug!("Reading {}...", self.path.display());

        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(JsonStoreError::Io {
                    path: self.path.clone(),
                    error,
                })
            }
        };
        if contents.trim().is_empty() {
            return Ok(None);
        }

        match serde_json::from_str(&contents) {
            Ok(JsonValue::Object(document)) => Ok(Some(document)),
            Ok(_) => Err(JsonStoreError::NotAnObject {
                path: self.path.clone(),
            }),
            Err(error) => Err(JsonStoreError::Json {
                path: self.path.clone(),
                error,
            }),
        }
    }

    fn write_document(&self, document: &JsonValue) -> Result<(), JsonStoreError> {
        log::debug!("Writing {}...", self.path.display());

        let io_error = |error| JsonStoreError::Io {
            path: self.path.clone(),
            error,
        };
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(document)
        } else {
            serde_json::to_vec(document)
        }
        .map_err(|error| JsonStoreError::Json {
            path: self.path.clone(),
            error,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        // Write beside the target, then swap it in
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = path::PathBuf::from(staging);

        let mut f = fs::File::create(&staging).map_err(io_error)?;
        f.write_all(&encoded).map_err(io_error)?;
        f.sync_all().map_err(io_error)?;
        fs::rename(&staging, &self.path).map_err(io_error)?;
        Ok(())
    }
}

impl Persistence for JsonFile {
    fn reload(&self, instance: &Instance) -> Result<()> {
        let document = self.read_document()?;

        instance.store().clear()?;
        instance.populate_defaults()?;
        if let Some(document) = document {
            overlay(instance, document)?;
        }
        Ok(())
    }

    fn save(&self, instance: &Instance) -> Result<()> {
        let document = entries_to_json(&instance.store().entries());
        self.write_document(&document)?;
        Ok(())
    }
}

/// Merge a JSON object into an instance's store. Objects landing on a nested
/// spec are merged into that spec's store instead of replacing it.
fn overlay(instance: &Instance, document: JsonMap<String, JsonValue>) -> Result<()> {
    let store = instance.store();
    for (key, json) in document {
        match (store.get(&key), json) {
            (Some(Value::Spec(nested)), JsonValue::Object(fields)) => overlay(&nested, fields)?,
            (_, json) => {
                store.insert(&key, json_to_value(json))?;
            }
        }
    }
    Ok(())
}
