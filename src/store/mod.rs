//! # Document store
//!
//! Hierarchical, schemaless JSON document store behind one handle.
//!
//! Core purpose is point reads, collection scans with an optional equality
//! filter, and optimistic multi-document transactions.
//!
//! ## Requirements
//!
//! - Documents keyed by hierarchical path (competitions → users → penalties)
//! - Point reads and direct-child scans
//! - Snapshot reads with conditional writes for the confirm workflow
//! - Small dataset, a handful of documents touched per request
//!
//! ## Implementation
//!
//! Two backends:
//! - [`redis::RedisStore`]: one JSON string per document, `WATCH`/`MULTI`/
//!   `EXEC` for transactions, an `idx:` set per collection for scans. The
//!   store retries conflicted commits a bounded number of times.
//! - [`memory::MemoryStore`]: a mutex-guarded map. The lock is held across
//!   the transaction closure, so transactions serialize and never conflict.
//!
//! Transaction closures are synchronous decision functions over a
//! [`TxSnapshot`] of the watched keys; all reads a transaction needs must be
//! named up front. The closure may run more than once, so it must not move
//! captured state.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

pub mod memory;
pub mod paths;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::paths::{CollectionPath, DocPath};
pub use self::redis::RedisStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("corrupt document at {0}")]
    Corrupt(String),

    #[error("transaction contention on {0}")]
    Contention(String),
}

/// Snapshot of the watched documents taken when a transaction begins.
/// Absent documents are simply not present in the map.
pub struct TxSnapshot {
    docs: HashMap<String, Value>,
}

impl TxSnapshot {
    pub(crate) fn from_docs(docs: HashMap<String, Value>) -> Self {
        Self { docs }
    }

    pub fn get(&self, path: &DocPath) -> Option<&Value> {
        self.docs.get(path.key())
    }

    pub fn deserialize<T: DeserializeOwned>(
        &self,
        path: &DocPath,
    ) -> Result<Option<T>, StoreError> {
        self.get(path)
            .map(|value| {
                serde_json::from_value(value.clone())
                    .map_err(|_| StoreError::Corrupt(path.key().to_string()))
            })
            .transpose()
    }
}

/// Documents staged for a conditional commit.
#[derive(Default)]
pub struct WriteSet {
    puts: Vec<(DocPath, Value)>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put<T: Serialize>(&mut self, path: DocPath, doc: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(doc)
            .map_err(|_| StoreError::Corrupt(path.key().to_string()))?;
        self.puts.push((path, value));
        Ok(())
    }

    pub(crate) fn into_puts(self) -> Vec<(DocPath, Value)> {
        self.puts
    }
}

/// Decision returned by a transaction closure.
pub enum Tx<T> {
    /// Commit the writes if no watched key changed since the snapshot.
    Commit(WriteSet, T),
    /// Finish without writing anything.
    ReadOnly(T),
}

pub enum Store {
    Memory(MemoryStore),
    Redis(RedisStore),
}

impl Store {
    pub fn memory() -> Self {
        Store::Memory(MemoryStore::new())
    }

    pub async fn redis(url: &str) -> Result<Self, StoreError> {
        Ok(Store::Redis(RedisStore::connect(url).await?))
    }

    /// Point read of a single document.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &DocPath,
    ) -> Result<Option<T>, StoreError> {
        let raw = match self {
            Store::Memory(store) => store.get_value(path),
            Store::Redis(store) => store.get_value(path).await?,
        };
        raw.map(|value| {
            serde_json::from_value(value).map_err(|_| StoreError::Corrupt(path.key().to_string()))
        })
        .transpose()
    }

    /// Scans the direct children of a collection, optionally keeping only
    /// documents whose string field equals the given value.
    pub async fn scan<T: DeserializeOwned>(
        &self,
        collection: &CollectionPath,
        filter: Option<(&str, &str)>,
    ) -> Result<Vec<T>, StoreError> {
        let values = match self {
            Store::Memory(store) => store.scan_values(collection, filter),
            Store::Redis(store) => store.scan_values(collection, filter).await?,
        };
        values
            .into_iter()
            .map(|value| {
                serde_json::from_value(value)
                    .map_err(|_| StoreError::Corrupt(collection.key().to_string()))
            })
            .collect()
    }

    /// Runs `decide` against a snapshot of `keys` and commits its write set
    /// conditionally on none of those keys having changed in the meantime.
    pub async fn transact<T, E, F>(&self, keys: &[DocPath], decide: F) -> Result<T, E>
    where
        F: FnMut(&TxSnapshot) -> Result<Tx<T>, E>,
        E: From<StoreError>,
    {
        match self {
            Store::Memory(store) => store.transact(keys, decide),
            Store::Redis(store) => store.transact(keys, decide).await,
        }
    }
}

pub(crate) fn matches_filter(value: &Value, filter: Option<(&str, &str)>) -> bool {
    filter.map_or(true, |(field, want)| {
        value.get(field).and_then(Value::as_str) == Some(want)
    })
}
