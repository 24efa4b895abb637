use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use serde_json::Value;

use super::{
    matches_filter,
    paths::{CollectionPath, DocPath},
    Tx, TxSnapshot,
};

/// In-process backend used by tests and local runs. Documents live in a
/// mutex-guarded map; transaction closures run with the lock held, which
/// makes every transaction serializable.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        self.docs.lock().expect("store lock poisoned")
    }

    pub(crate) fn get_value(&self, path: &DocPath) -> Option<Value> {
        self.lock().get(path.key()).cloned()
    }

    pub(crate) fn scan_values(
        &self,
        collection: &CollectionPath,
        filter: Option<(&str, &str)>,
    ) -> Vec<Value> {
        let prefix = format!("{}/", collection.key());
        let docs = self.lock();

        let mut hits: Vec<(&String, &Value)> = docs
            .iter()
            .filter(|(key, _)| {
                key.strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.contains('/'))
            })
            .filter(|(_, value)| matches_filter(value, filter))
            .collect();

        hits.sort_by_key(|(key, _)| *key);
        hits.into_iter().map(|(_, value)| value.clone()).collect()
    }

    pub(crate) fn transact<T, E, F>(&self, keys: &[DocPath], mut decide: F) -> Result<T, E>
    where
        F: FnMut(&TxSnapshot) -> Result<Tx<T>, E>,
    {
        let mut docs = self.lock();

        let snapshot = TxSnapshot::from_docs(
            keys.iter()
                .filter_map(|path| {
                    docs.get(path.key())
                        .map(|value| (path.key().to_string(), value.clone()))
                })
                .collect(),
        );

        match decide(&snapshot)? {
            Tx::Commit(writes, out) => {
                for (path, value) in writes.into_puts() {
                    docs.insert(path.key().to_string(), value);
                }
                Ok(out)
            }
            Tx::ReadOnly(out) => Ok(out),
        }
    }
}
