use std::{io, path};

use mapspec::SpecError;

#[derive(thiserror::Error, Debug)]
pub enum JsonStoreError {
    #[error("File ({path}) could not be accessed: {error}")]
    Io {
        path: path::PathBuf,
        #[source]
        error: io::Error,
    },
    #[error("File ({path}) does not hold valid JSON: {error}")]
    Json {
        path: path::PathBuf,
        #[source]
        error: serde_json::Error,
    },
    #[error("File ({path}) must hold a JSON object at its root")]
    NotAnObject { path: path::PathBuf },
}

impl From<JsonStoreError> for SpecError {
    fn from(error: JsonStoreError) -> Self {
        SpecError::persistence(error)
    }
}
