//! MapSpec: configuration specs as store-backed virtual objects
//!
//! A spec is declared as a table of methods ([`SpecType`]). An [`Instance`]
//! of a spec routes every call through a dispatch engine that decides, per
//! method, whether it is:
//! - an identity method (`Display`, `PartialEq`, `Hash` on the instance)
//! - a control operation (pass-through, memoize, raw map access, reload,
//!   save, reset)
//! - a plain property accessor reading or writing a key in the backing
//!   [`Store`]
//!
//! # Example
//!
//! ```rust
//! use mapspec::{MethodDescriptor, SpecFactory, SpecType, Tag, Value};
//!
//! let factory = SpecFactory::new();
//! let spec = factory
//!     .build(
//!         SpecType::builder("Server")
//!             .method(MethodDescriptor::getter("get_port").default_value(80))
//!             .method(MethodDescriptor::setter("set_port"))
//!             .method(MethodDescriptor::action("reset").tag(Tag::Reset)),
//!     )
//!     .unwrap();
//!
//! let server = factory.create_default(&spec).unwrap();
//! server.set("set_port", 8080).unwrap();
//! assert_eq!(server.get("get_port").unwrap(), Some(Value::from(8080)));
//! assert_eq!(server.to_string(), "Server(port=8080)");
//!
//! server.call("reset").unwrap();
//! assert_eq!(server.get("get_port").unwrap(), Some(Value::from(80)));
//! ```

mod convert;
mod defaults;
mod descriptor;
mod engine;
mod error;
mod factory;
mod instance;
mod memo;
mod resolver;
mod store;
mod value;

pub use convert::{entries_to_json, from_value, json_to_value, to_value, value_to_json};
pub use defaults::{DeclaredDefaults, DefaultsHook};
pub use descriptor::{
    Body, Classification, DefaultValue, MapMode, Method, MethodDescriptor, MethodId, Returns,
    SpecType, SpecTypeBuilder, Tag,
};
pub use engine::{Engine, Invocation, Persistence, Reply};
pub use error::{Result, SpecError, StoreError};
pub use factory::{Spec, SpecFactory, SpecFactoryBuilder};
pub use instance::{store_of, Instance};
pub use memo::MemoCache;
pub use resolver::{KeyResolver, KeyStyle, NamingConvention, Resolution};
pub use store::{hash_entries, Entries, MapStore, ReadOnlyStore, SharedStore, Store};
pub use value::Value;
