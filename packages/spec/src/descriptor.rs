//! Method descriptors and the per-spec dispatch table.
//!
//! A [`SpecType`] is the capability description of one spec: every method it
//! declares, the tags attached to each, and the classification the dispatch
//! engine acts on. Classification and key resolution run once, when the spec
//! type is built, and are reused for every call on every instance.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::resolver::{KeyResolver, Resolution};
use crate::{Instance, Result, SpecError, Value};

/// A default method body.
///
/// Bodies receive the instance they were called on, so sibling accessors
/// route back through the same dispatch engine.
pub type Body = Arc<dyn Fn(&Instance, &[Value]) -> Result<Value> + Send + Sync>;

/// What a method hands back to its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Returns {
    /// The method produces no result (void-like).
    Nothing,
    /// The method produces a value.
    Value,
}

/// How a raw-map-access method exposes the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMode {
    /// An independent copy; mutating it does not affect the instance.
    Copy,
    /// A view of the live store that rejects every mutation.
    ReadOnly,
    /// The live store itself.
    Live,
}

/// Behavior modifiers attached to a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// Run the method's default body, skipping property semantics.
    PassThrough,
    /// Run the default body once and cache the result.
    Memoize,
    /// Return the backing store.
    AsMap(MapMode),
    /// Reload the top-level entity from its persistence.
    Reload,
    /// Save the top-level entity to its persistence.
    Save,
    /// Clear the store and repopulate defaults.
    Reset,
}

/// The behavior the dispatch engine selects for a method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    PassThrough,
    Memoized,
    AsMap(MapMode),
    Reload,
    Save,
    Reset,
    Write { key: String },
    Read { key: String },
}

/// Identity of a method within its spec type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(pub usize);

enum DeclaredDefault {
    Value(Value),
    Nested(Box<SpecTypeBuilder>),
}

/// The default a property takes when its spec is created or reset.
#[derive(Clone)]
pub enum DefaultValue {
    Value(Value),
    /// A fresh nested instance of this spec type.
    Nested(Arc<SpecType>),
}

/// A method declared on a spec, before classification.
pub struct MethodDescriptor {
    name: String,
    arity: usize,
    returns: Returns,
    tags: Vec<Tag>,
    key: Option<String>,
    default: Option<DeclaredDefault>,
    body: Option<Body>,
}

impl MethodDescriptor {
    pub fn new(name: impl Into<String>, arity: usize, returns: Returns) -> Self {
        Self {
            name: name.into(),
            arity,
            returns,
            tags: Vec::new(),
            key: None,
            default: None,
            body: None,
        }
    }

    /// A zero-argument method returning a value.
    pub fn getter(name: impl Into<String>) -> Self {
        Self::new(name, 0, Returns::Value)
    }

    /// A one-argument method returning nothing.
    pub fn setter(name: impl Into<String>) -> Self {
        Self::new(name, 1, Returns::Nothing)
    }

    /// A zero-argument method returning nothing, usually a control operation.
    pub fn action(name: impl Into<String>) -> Self {
        Self::new(name, 0, Returns::Nothing)
    }

    pub fn tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    /// Use `key` in the store instead of the name-derived key.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DeclaredDefault::Value(value.into()));
        self
    }

    /// Default this property to a fresh nested instance of `spec`.
    pub fn nested(mut self, spec: SpecTypeBuilder) -> Self {
        self.default = Some(DeclaredDefault::Nested(Box::new(spec)));
        self
    }

    pub fn body<F>(mut self, body: F) -> Self
    where
        F: Fn(&Instance, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(body));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn returns(&self) -> Returns {
        self.returns
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn explicit_key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    fn has(&self, wanted: Tag) -> bool {
        self.tags.contains(&wanted)
    }

    fn map_mode(&self) -> Option<MapMode> {
        self.tags.iter().find_map(|tag| match tag {
            Tag::AsMap(mode) => Some(*mode),
            _ => None,
        })
    }

    /// Pick the behavior for this method. Tags are checked in a fixed order,
    /// whatever order they were attached in.
    fn classify(&self, resolver: &dyn KeyResolver) -> Classification {
        if self.has(Tag::PassThrough) {
            return Classification::PassThrough;
        }
        if self.has(Tag::Memoize) {
            return Classification::Memoized;
        }
        if let Some(mode) = self.map_mode() {
            return Classification::AsMap(mode);
        }
        if self.has(Tag::Reload) {
            return Classification::Reload;
        }
        if self.has(Tag::Save) {
            return Classification::Save;
        }
        if self.has(Tag::Reset) {
            return Classification::Reset;
        }

        let Resolution { key, is_setter } = resolver.resolve(self);
        if self.returns == Returns::Nothing || is_setter {
            Classification::Write { key }
        } else {
            Classification::Read { key }
        }
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("returns", &self.returns)
            .field("tags", &self.tags)
            .field("key", &self.key)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// A classified method in a built [`SpecType`].
pub struct Method {
    id: MethodId,
    descriptor: MethodDescriptor,
    classification: Classification,
    default: Option<DefaultValue>,
}

impl Method {
    pub fn id(&self) -> MethodId {
        self.id
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    pub fn default(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    pub(crate) fn body(&self) -> Option<&Body> {
        self.descriptor.body.as_ref()
    }
}

/// The capability description of one spec.
pub struct SpecType {
    name: String,
    methods: IndexMap<String, Method>,
}

impl SpecType {
    pub fn builder(name: impl Into<String>) -> SpecTypeBuilder {
        SpecTypeBuilder {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    /// All methods in declaration order.
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.methods.values()
    }

    /// Read-classified properties paired with their store key, in
    /// declaration order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &Method)> {
        self.methods.values().filter_map(|method| match &method.classification {
            Classification::Read { key } => Some((key.as_str(), method)),
            _ => None,
        })
    }
}

impl fmt::Debug for SpecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecType")
            .field("name", &self.name)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Collects method descriptors for a [`SpecType`].
pub struct SpecTypeBuilder {
    name: String,
    methods: Vec<MethodDescriptor>,
}

impl SpecTypeBuilder {
    pub fn method(mut self, descriptor: MethodDescriptor) -> Self {
        self.methods.push(descriptor);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Classify every method and resolve property keys.
    ///
    /// Nested spec defaults are built with the same resolver.
    pub fn build(self, resolver: &dyn KeyResolver) -> Result<Arc<SpecType>> {
        let mut methods = IndexMap::with_capacity(self.methods.len());

        for (index, mut descriptor) in self.methods.into_iter().enumerate() {
            if methods.contains_key(descriptor.name()) {
                return Err(SpecError::DuplicateMethod {
                    spec: self.name,
                    method: descriptor.name,
                });
            }

            let default = match descriptor.default.take() {
                Some(DeclaredDefault::Value(value)) => Some(DefaultValue::Value(value)),
                Some(DeclaredDefault::Nested(spec)) => {
                    Some(DefaultValue::Nested(spec.build(resolver)?))
                }
                None => None,
            };
            let classification = descriptor.classify(resolver);

            methods.insert(
                descriptor.name.clone(),
                Method {
                    id: MethodId(index),
                    descriptor,
                    classification,
                    default,
                },
            );
        }

        Ok(Arc::new(SpecType {
            name: self.name,
            methods,
        }))
    }
}
