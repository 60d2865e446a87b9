//! JSON document persistence for shelf collections.
//!
//! A [`JsonStore`] owns one file whose top-level value is an array of records.
//! Every call reads the whole document; writes replace it through a temporary
//! sibling file and a rename, so readers never observe a half-written file.
//! Mutations go through [`JsonStore::modify`], which holds the store's writer
//! lock across the read-modify-write span.

use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;
use tokio::sync::Mutex;

mod error;

pub use error::{Result, StoreError};

/// Outcome of a [`JsonStore::modify`] closure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change<R> {
    /// Persist the mutated collection, then hand back the value.
    Save(R),
    /// Leave the document untouched.
    Keep(R),
}

/// File-backed collection of `T`, read and written as a whole.
pub struct JsonStore<T> {
    path: PathBuf,
    writer: Mutex<()>,
    _record: PhantomData<fn() -> T>,
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the entire collection.
    pub async fn load(&self) -> Result<Vec<T>> {
        let bytes = fs::read(&self.path)
            .await
            .map_err(|source| StoreError::Read {
                path: self.path.clone(),
                source,
            })?;

        serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Overwrite the document with `records`.
    pub async fn save(&self, records: &[T]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(records).map_err(StoreError::Serialize)?;

        let temp_path = self.temp_path();
        if let Err(source) = write_then_rename(&temp_path, &self.path, &bytes).await {
            // Best effort; report the write failure.
            let _ = fs::remove_file(&temp_path).await;
            return Err(StoreError::Write {
                path: self.path.clone(),
                source,
            });
        }

        tracing::debug!(
            path = %self.path.display(),
            records = records.len(),
            bytes = bytes.len(),
            "collection written"
        );
        Ok(())
    }

    /// Load, let `f` mutate the collection, and save it when `f` asks to.
    ///
    /// Concurrent calls on the same store run one after another. Nothing is
    /// written when `f` fails or returns [`Change::Keep`].
    pub async fn modify<F, R, E>(&self, f: F) -> std::result::Result<R, E>
    where
        F: FnOnce(&mut Vec<T>) -> std::result::Result<Change<R>, E>,
        E: From<StoreError>,
    {
        let _guard = self.writer.lock().await;

        let mut records = self.load().await?;
        match f(&mut records)? {
            Change::Save(value) => {
                self.save(&records).await?;
                Ok(value)
            }
            Change::Keep(value) => Ok(value),
        }
    }

    /// Create the document holding an empty collection if it does not exist.
    ///
    /// Returns `true` when a new document was written.
    pub async fn ensure_exists(&self) -> Result<bool> {
        let _guard = self.writer.lock().await;

        match fs::try_exists(&self.path).await {
            Ok(true) => return Ok(false),
            Ok(false) => {}
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Write {
                    path: self.path.clone(),
                    source,
                })?;
        }

        self.save(&[]).await?;
        tracing::info!(path = %self.path.display(), "created empty collection");
        Ok(true)
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "collection".to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()))
    }
}

async fn write_then_rename(temp_path: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    fs::write(temp_path, bytes).await?;
    fs::rename(temp_path, path).await
}
