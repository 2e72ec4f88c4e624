//! Error types for spec dispatch and backing stores.

/// Errors raised by a backing [`Store`](crate::Store).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store is read-only, cannot modify key '{key}'")]
    ReadOnly { key: String },
    #[error("store error: {message}")]
    Other { message: String },
}

/// Errors surfaced by the dispatch engine and the factory.
///
/// Usage errors (`NotTopLevel`, `MissingBody`, `NotAnInstance`, ...) are raised
/// synchronously by the engine itself. Errors returned by a method's default
/// body are handed back to the caller untouched, whatever variant they are.
#[derive(thiserror::Error, Debug)]
pub enum SpecError {
    #[error("You cannot {operation} this! Try to {operation} the top entity.")]
    NotTopLevel { operation: &'static str },

    #[error("method '{method}' has no default body ({reason})")]
    MissingBody {
        method: String,
        reason: &'static str,
    },

    #[error("spec '{spec}' declares no method '{method}'")]
    UnknownMethod { spec: String, method: String },

    #[error("method '{method}' writes a property but was called without an argument")]
    MissingArgument { method: String },

    #[error("spec '{spec}' declares method '{method}' more than once")]
    DuplicateMethod { spec: String, method: String },

    #[error("Not a spec instance: {type_name}")]
    NotAnInstance { type_name: String },

    #[error(
        "'{spec}' is a spec type, not an instance of it. \
         Use SpecFactory::create_default() or SpecFactory::create_unsafe() instead."
    )]
    SpecTypeNotInstance { spec: String },

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("value conversion failed: {message}")]
    Convert { message: String },

    #[error("persistence failed: {0}")]
    Persistence(Box<dyn std::error::Error + Send + Sync>),

    #[error("{0}")]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

impl SpecError {
    /// Wrap an arbitrary error raised from a default method body.
    pub fn custom<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SpecError::Custom(Box::new(error))
    }

    /// Wrap an error raised by a reload/save backend.
    pub fn persistence<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SpecError::Persistence(Box::new(error))
    }

    /// Borrow the inner error of a `Custom` variant as a concrete type.
    pub fn downcast_custom<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            SpecError::Custom(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }
}

pub type Result<T, E = SpecError> = std::result::Result<T, E>;
