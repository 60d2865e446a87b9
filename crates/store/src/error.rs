use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Failures of the persistence layer. None of them are retried.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read collection from {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("collection at {} is not valid JSON: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize collection: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to write collection to {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
