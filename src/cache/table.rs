//! Per-namespace cache owner
//!
//! `NamespaceCache` owns one namespace's in-memory table together with the
//! store that persists it. The table mutex is held across insert and save, so
//! a mutation and its write-back are atomic for writers of the namespace.

use std::path::Path;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::namespace::Namespace;
use super::store::{CacheStore, CacheTable, Payload, PersistLock, StoreError};

/// What to do when an existing cache file cannot be loaded at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPolicy {
    /// Log a warning and start with an empty table
    #[default]
    FallbackEmpty,
    /// Propagate the error and refuse to start
    Strict,
}

#[derive(Debug)]
pub struct NamespaceCache {
    namespace: Namespace,
    store: CacheStore,
    table: Mutex<CacheTable>,
}

impl NamespaceCache {
    /// Opens the cache for `namespace` inside `cache_dir`, loading any
    /// existing entries from disk.
    pub async fn open(
        namespace: Namespace,
        cache_dir: &Path,
        lock: PersistLock,
        policy: LoadPolicy,
    ) -> Result<Self, StoreError> {
        let store = CacheStore::new(cache_dir.join(namespace.file_name()), lock);

        let table = match store.load().await {
            Ok(table) => table,
            Err(e) if policy == LoadPolicy::FallbackEmpty => {
                warn!(namespace = %namespace, error = %e, "Ignoring unreadable cache file, starting empty");
                CacheTable::new()
            }
            Err(e) => return Err(e),
        };

        info!(
            namespace = %namespace,
            entries = table.len(),
            path = %store.path().display(),
            "Cache loaded"
        );

        Ok(Self {
            namespace,
            store,
            table: Mutex::new(table),
        })
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Returns a copy of the payload stored under `key`, if any
    pub async fn get(&self, key: &str) -> Option<Payload> {
        self.table.lock().await.get(key).cloned()
    }

    /// Inserts an entry and persists the whole table before returning.
    ///
    /// On a save failure the entry stays in memory and the error is returned
    /// for the caller to report; the in-memory table remains authoritative.
    pub async fn insert(&self, key: String, payload: Payload) -> Result<(), StoreError> {
        let mut table = self.table.lock().await;
        table.insert(key, payload);
        self.store.save(&table).await
    }

    pub async fn len(&self) -> usize {
        self.table.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
