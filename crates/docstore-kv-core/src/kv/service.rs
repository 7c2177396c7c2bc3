//! Key-value operation handlers
//!
//! `KeyValueService` implements get, set, delete and prefix scan on top of
//! any [`DocumentBackend`]. It validates requests, resolves the store's
//! collection, runs the value codec and translates failures into the caller
//! visible error kinds. It holds no mutable state of its own.

use futures::{future, Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, error};

use crate::codec;
use crate::storage::{CollectionMapper, CollectionRef, DocumentBackend};
use crate::system::metrics::{self, Metrics};
use crate::types::{Content, Error, Result, StoredValue, ValueRef};

/// Lazily produced keys from a prefix scan.
///
/// The stream yields at most one error, after which it ends. Dropping it
/// releases the backend cursor.
pub type KeyStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Key-value service over a document backend
#[derive(Clone)]
pub struct KeyValueService {
    backend: Arc<dyn DocumentBackend>,
    mapper: CollectionMapper,
}

impl KeyValueService {
    /// Create a service over `backend`, resolving stores with `mapper`
    pub fn new(backend: Arc<dyn DocumentBackend>, mapper: CollectionMapper) -> Self {
        Self { backend, mapper }
    }

    /// Name of the backend serving requests
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Get the value stored under `value_ref`
    pub async fn get_value(&self, value_ref: &ValueRef) -> Result<StoredValue> {
        let timer = Metrics::start("get");
        let result = self.get_inner(value_ref).await;
        log_outcome("get", value_ref, &result);
        timer.finish(&result);
        result
    }

    /// Create or fully replace the value stored under `value_ref`
    pub async fn set_value(&self, value_ref: &ValueRef, content: &Content) -> Result<()> {
        let timer = Metrics::start("set");
        let result = self.set_inner(value_ref, content).await;
        log_outcome("set", value_ref, &result);
        timer.finish(&result);
        result
    }

    /// Delete the value stored under `value_ref`; absent keys are not an error
    pub async fn delete_key(&self, value_ref: &ValueRef) -> Result<()> {
        let timer = Metrics::start("delete");
        let result = self.delete_inner(value_ref).await;
        log_outcome("delete", value_ref, &result);
        timer.finish(&result);
        result
    }

    /// Stream the keys of `store` that start with `prefix`.
    ///
    /// The prefix is matched literally and anchored at the start of the key.
    /// An empty prefix enumerates every key; an empty store yields an empty
    /// stream. Order is unspecified.
    pub async fn scan_keys(&self, store: &str, prefix: &str) -> Result<KeyStream> {
        let timer = Metrics::start("scan");
        let result = self.open_scan(store, prefix).await;
        if let Err(e) = &result {
            if e.is_server_error() {
                error!(op = "scan", store, prefix, "{}", e);
            } else {
                debug!(op = "scan", store, prefix, "{}", e);
            }
        }
        timer.finish(&result);
        result
    }

    /// Check that the backend is reachable
    pub async fn ping(&self) -> Result<()> {
        self.backend
            .ping()
            .await
            .map_err(|e| Error::storage(format!("{} backend ping failed", self.backend.name()), e))
    }

    async fn get_inner(&self, value_ref: &ValueRef) -> Result<StoredValue> {
        let collection = self.resolve(value_ref)?;

        let doc = self
            .backend
            .find_by_id(&collection, &value_ref.key)
            .await
            .map_err(|e| {
                Error::storage(
                    format!("unable to read {} from {} store", value_ref.key, value_ref.store),
                    e,
                )
            })?
            .ok_or_else(|| Error::not_found(&value_ref.store, &value_ref.key))?;

        let content = codec::to_content(doc)?;
        Ok(StoredValue {
            value_ref: value_ref.clone(),
            content,
        })
    }

    async fn set_inner(&self, value_ref: &ValueRef, content: &Content) -> Result<()> {
        let collection = self.resolve(value_ref)?;
        let doc = codec::to_document(value_ref, content)?;

        self.backend
            .replace_by_id(&collection, &value_ref.key, doc)
            .await
            .map_err(|e| {
                Error::storage(
                    format!("unable to insert {} into {} store", value_ref.key, value_ref.store),
                    e,
                )
            })
    }

    async fn delete_inner(&self, value_ref: &ValueRef) -> Result<()> {
        let collection = self.resolve(value_ref)?;

        self.backend
            .delete_by_id(&collection, &value_ref.key)
            .await
            .map_err(|e| {
                Error::storage(
                    format!("unable to delete {} from {} store", value_ref.key, value_ref.store),
                    e,
                )
            })
    }

    async fn open_scan(&self, store: &str, prefix: &str) -> Result<KeyStream> {
        let collection = self.mapper.resolve(store)?;

        let docs = self.backend.scan_ids(&collection, prefix).await.map_err(|e| {
            Error::storage(
                format!("unable to scan keys with prefix {} from {} store", prefix, store),
                e,
            )
        })?;

        let store = store.to_string();
        let prefix = prefix.to_string();
        let keys = docs.map(move |item| {
            let key = match item {
                Ok(doc) => codec::document_key(&doc).map_err(Error::from),
                Err(e) => Err(Error::storage(
                    format!("scan of {} store with prefix {} interrupted", store, prefix),
                    e,
                )),
            };
            if let Err(e) = &key {
                error!(op = "scan", store = %store, prefix = %prefix, "scan terminated: {}", e);
                metrics::record("scan_stream", e.kind().as_str());
            }
            key
        });

        // End the stream right after the first error
        let keys = keys.scan(false, |failed, item| {
            if *failed {
                return future::ready(None);
            }
            *failed = item.is_err();
            future::ready(Some(item))
        });

        Ok(Box::pin(keys))
    }

    fn resolve(&self, value_ref: &ValueRef) -> Result<CollectionRef> {
        let collection = self.mapper.resolve(&value_ref.store)?;
        if value_ref.key.is_empty() {
            return Err(Error::invalid_argument(format!(
                "key is required for store {}",
                value_ref.store
            )));
        }
        Ok(collection)
    }
}

fn log_outcome<T>(op: &'static str, value_ref: &ValueRef, result: &Result<T>) {
    match result {
        Ok(_) => debug!(op, store = %value_ref.store, key = %value_ref.key, "ok"),
        Err(e) if e.is_server_error() => {
            error!(op, store = %value_ref.store, key = %value_ref.key, "{}", e)
        }
        Err(e) => debug!(op, store = %value_ref.store, key = %value_ref.key, "{}", e),
    }
}
