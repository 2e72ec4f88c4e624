//! JSON file persistence for top-level spec instances.
//!
//! [`JsonFile`] implements [`mapspec::Persistence`]: reload and save methods
//! on a top-level instance read and write one JSON object on local disk.

mod error;
mod json_file;

pub use error::JsonStoreError;
pub use json_file::JsonFile;
