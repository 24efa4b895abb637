//! # Redis backend
//!
//! One JSON string per document, keyed by its full path. Each collection
//! carries an `idx:{collection}` set of child ids so scans avoid `KEYS`.
//!
//! Transactions follow the `WATCH` → `MGET` → `MULTI`/`EXEC` pattern on a
//! dedicated connection: a nil `EXEC` reply means a watched key changed and
//! the attempt is retried. Dropping the connection discards any `WATCH`
//! state, so read-only and failed transactions need no `UNWATCH`.

use std::{collections::HashMap, time::Duration};

use redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    AsyncCommands, Client,
};
use serde_json::Value;

use super::{
    matches_filter,
    paths::{CollectionPath, DocPath},
    StoreError, Tx, TxSnapshot,
};

const TX_MAX_ATTEMPTS: usize = 8;

pub struct RedisStore {
    client: Client,
    manager: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Duration::from_millis(100));

        let client = Client::open(url)?;
        let manager = client
            .get_connection_manager_with_config(config)
            .await?;

        Ok(Self { client, manager })
    }

    pub(crate) async fn get_value(&self, path: &DocPath) -> Result<Option<Value>, StoreError> {
        let mut con = self.manager.clone();
        let raw: Option<String> = con.get(path.key()).await?;

        raw.map(|raw| parse_doc(path.key(), &raw)).transpose()
    }

    pub(crate) async fn scan_values(
        &self,
        collection: &CollectionPath,
        filter: Option<(&str, &str)>,
    ) -> Result<Vec<Value>, StoreError> {
        let mut con = self.manager.clone();

        let mut ids: Vec<String> = con.smembers(index_key(collection.key())).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        ids.sort();

        let keys: Vec<String> = ids
            .iter()
            .map(|id| format!("{}/{id}", collection.key()))
            .collect();
        let raws: Vec<Option<String>> =
            redis::cmd("MGET").arg(&keys).query_async(&mut con).await?;

        let mut docs = Vec::new();
        for (key, raw) in keys.iter().zip(raws) {
            // an index entry without a document means a half-written doc from
            // outside the transaction path; skip it
            let Some(raw) = raw else { continue };
            let value = parse_doc(key, &raw)?;
            if matches_filter(&value, filter) {
                docs.push(value);
            }
        }
        Ok(docs)
    }

    pub(crate) async fn transact<T, E, F>(&self, keys: &[DocPath], mut decide: F) -> Result<T, E>
    where
        F: FnMut(&TxSnapshot) -> Result<Tx<T>, E>,
        E: From<StoreError>,
    {
        let watch: Vec<&str> = keys.iter().map(DocPath::key).collect();

        for _ in 0..TX_MAX_ATTEMPTS {
            let mut con = self
                .client
                .get_multiplexed_async_connection()
                .await
                .map_err(StoreError::from)?;

            let _: () = redis::cmd("WATCH")
                .arg(&watch)
                .query_async(&mut con)
                .await
                .map_err(StoreError::from)?;
            let raws: Vec<Option<String>> = redis::cmd("MGET")
                .arg(&watch)
                .query_async(&mut con)
                .await
                .map_err(StoreError::from)?;

            let mut docs = HashMap::new();
            for (path, raw) in keys.iter().zip(raws) {
                if let Some(raw) = raw {
                    docs.insert(
                        path.key().to_string(),
                        parse_doc(path.key(), &raw).map_err(E::from)?,
                    );
                }
            }
            let snapshot = TxSnapshot::from_docs(docs);

            match decide(&snapshot)? {
                Tx::Commit(writes, out) => {
                    let mut pipe = redis::pipe();
                    pipe.atomic();
                    for (path, value) in writes.into_puts() {
                        let raw = serde_json::to_string(&value)
                            .map_err(|_| StoreError::Corrupt(path.key().to_string()))?;
                        let (collection, id) = path.split();
                        pipe.set(path.key(), raw).ignore();
                        pipe.sadd(index_key(collection), id).ignore();
                    }

                    let committed: Option<redis::Value> = pipe
                        .query_async(&mut con)
                        .await
                        .map_err(StoreError::from)?;
                    if committed.is_some() {
                        return Ok(out);
                    }
                    // watched key changed under us; take a fresh snapshot
                }
                Tx::ReadOnly(out) => return Ok(out),
            }
        }

        Err(StoreError::Contention(watch.join(", ")).into())
    }
}

fn index_key(collection: &str) -> String {
    format!("idx:{collection}")
}

fn parse_doc(key: &str, raw: &str) -> Result<Value, StoreError> {
    serde_json::from_str(raw).map_err(|_| StoreError::Corrupt(key.to_string()))
}
