//! Durable storage for cache tables
//!
//! A `CacheStore` reads and writes one namespace's table as a single indented
//! JSON object mapping cache key to the upstream document. Every load and
//! save across all stores goes through one shared `PersistLock`, so no two
//! cache files are ever touched at the same time.

use serde::{ser, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tokio::sync::{Mutex, MutexGuard};

/// In-memory contents of one namespace: cache key to upstream payload
pub type CacheTable = HashMap<String, Payload>;

/// Errors that can occur while loading or saving a cache table
#[derive(Debug, Error)]
pub enum StoreError {
    /// The cache file exists but could not be read
    #[error("failed to read cache file {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    /// The cache file exists but does not hold a valid cache table
    #[error("cache file {} is not a valid cache table: {source}", .path.display())]
    Deserialize {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The in-memory table could not be serialized
    #[error("failed to serialize cache table: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Writing the cache file (or creating its directory) failed
    #[error("failed to write cache file {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// An upstream response body, kept as the exact JSON text that was received.
///
/// In memory the payload is the body byte for byte, so both the miss that
/// fetched it and every later hit answer with identical text. In the cache
/// file the document is embedded verbatim, but whitespace surrounding it
/// (such as a trailing newline) cannot be embedded and is dropped; a payload
/// loaded from disk therefore lacks it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload(String);

impl Payload {
    /// Wraps a response body. Fails if the body is not a JSON document.
    pub fn from_body(body: &[u8]) -> Result<Self, serde_json::Error> {
        // A borrowed RawValue only parses from valid UTF-8
        serde_json::from_slice::<&RawValue>(body)?;
        Ok(Self(String::from_utf8_lossy(body).into_owned()))
    }

    /// The JSON text of this payload
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let raw: &RawValue = serde_json::from_str(&self.0).map_err(<S::Error as ser::Error>::custom)?;
        raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        Ok(Self(raw.get().to_owned()))
    }
}

/// Process-wide lock serializing all cache file I/O.
///
/// Clones share the same underlying mutex; create one at startup and hand a
/// clone to every store.
#[derive(Debug, Clone, Default)]
pub struct PersistLock(Arc<Mutex<()>>);

impl PersistLock {
    pub fn new() -> Self {
        Self::default()
    }

    async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.0.lock().await
    }
}

/// Loads and saves one cache table at a fixed path
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
    lock: PersistLock,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>, lock: PersistLock) -> Self {
        Self {
            path: path.into(),
            lock,
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the table from disk
    ///
    /// # Returns
    /// * `Ok(table)` with the stored entries, or an empty table if the file
    ///   does not exist
    /// * `Err(StoreError::Read)` if the file exists but cannot be read
    /// * `Err(StoreError::Deserialize)` if the content is not a valid table
    pub async fn load(&self) -> Result<CacheTable, StoreError> {
        let _guard = self.lock.acquire().await;

        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(CacheTable::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_slice(&content).map_err(|source| StoreError::Deserialize {
            path: self.path.clone(),
            source,
        })
    }

    /// Writes the full table to disk, replacing any previous contents
    ///
    /// Creates the parent directory if it is missing.
    pub async fn save(&self, table: &CacheTable) -> Result<(), StoreError> {
        let _guard = self.lock.acquire().await;

        let json = serde_json::to_vec_pretty(table).map_err(StoreError::Serialize)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Write {
                    path: self.path.clone(),
                    source,
                })?;
        }

        fs::write(&self.path, json)
            .await
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })
    }
}
