//! Simple in-memory backend using DashMap
//!
//! Documents are kept per collection in concurrent maps keyed by their
//! identifier. Replace is an upsert, delete of an absent id succeeds, and
//! scans match identifiers by literal prefix, as with the MongoDB backend.
//!
//! Unlike a driver cursor, a scan is not lazy: matching identifiers are
//! collected and sorted when the scan opens, then yielded from that
//! snapshot. Writes made after that point are not observed by the stream.

use async_trait::async_trait;
use bson::{Bson, Document};
use dashmap::DashMap;
use futures::stream;
use tracing::debug;

use crate::constants::ID_FIELD;
use crate::storage::{CollectionRef, DocumentBackend, DocumentStream, StorageResult};

/// Simple backend implementation using DashMap
#[derive(Debug, Default)]
pub struct MemoryBackend {
    /// Map of fully qualified collection name to its documents by identifier
    collections: DashMap<CollectionRef, DashMap<String, Document>>,
}

impl MemoryBackend {
    /// Create a new empty backend
    pub fn new() -> Self {
        Self {
            collections: DashMap::new(),
        }
    }

    /// Number of documents currently held in a collection
    pub fn document_count(&self, collection: &CollectionRef) -> usize {
        self.collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn find_by_id(&self, collection: &CollectionRef, id: &str) -> StorageResult<Option<Document>> {
        let Some(docs) = self.collections.get(collection) else {
            return Ok(None);
        };
        let found = docs.get(id).map(|doc| doc.value().clone());
        Ok(found)
    }

    async fn replace_by_id(&self, collection: &CollectionRef, id: &str, doc: Document) -> StorageResult<()> {
        debug!(collection = %collection, id, "memory replace");
        self.collections
            .entry(collection.clone())
            .or_default()
            .insert(id.to_string(), doc);
        Ok(())
    }

    async fn delete_by_id(&self, collection: &CollectionRef, id: &str) -> StorageResult<()> {
        if let Some(docs) = self.collections.get(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn scan_ids(&self, collection: &CollectionRef, prefix: &str) -> StorageResult<DocumentStream> {
        // Snapshot the matching ids so no map guard is held across await points
        let mut ids: Vec<String> = Vec::new();
        if let Some(docs) = self.collections.get(collection) {
            for entry in docs.iter() {
                if entry.key().starts_with(prefix) {
                    ids.push(entry.key().clone());
                }
            }
        }
        ids.sort();

        let docs = ids.into_iter().map(|id| {
            let mut doc = Document::new();
            doc.insert(ID_FIELD, Bson::String(id));
            Ok(doc)
        });
        Ok(Box::pin(stream::iter(docs)))
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use futures::TryStreamExt;

    fn collection(name: &str) -> CollectionRef {
        CollectionRef {
            database: "test".to_string(),
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_replace_overwrites_whole_document() {
        let backend = MemoryBackend::new();
        let coll = collection("c");

        backend.replace_by_id(&coll, "k", doc! { "_id": "k", "a": 1 }).await.unwrap();
        backend.replace_by_id(&coll, "k", doc! { "_id": "k", "b": 2 }).await.unwrap();

        let stored = backend.find_by_id(&coll, "k").await.unwrap().unwrap();
        assert_eq!(stored, doc! { "_id": "k", "b": 2 });
        assert_eq!(backend.document_count(&coll), 1);
    }

    #[tokio::test]
    async fn test_delete_absent_document_succeeds() {
        let backend = MemoryBackend::new();
        assert!(backend.delete_by_id(&collection("none"), "k").await.is_ok());
    }

    #[tokio::test]
    async fn test_scan_projects_identifiers() {
        let backend = MemoryBackend::new();
        let coll = collection("c");
        backend.replace_by_id(&coll, "a1", doc! { "_id": "a1", "x": 1 }).await.unwrap();
        backend.replace_by_id(&coll, "b1", doc! { "_id": "b1", "x": 2 }).await.unwrap();

        let docs: Vec<Document> = backend.scan_ids(&coll, "a").await.unwrap().try_collect().await.unwrap();
        assert_eq!(docs, vec![doc! { "_id": "a1" }]);
    }

    #[tokio::test]
    async fn test_scan_yields_snapshot_taken_at_open() {
        let backend = MemoryBackend::new();
        let coll = collection("c");
        backend.replace_by_id(&coll, "a2", doc! { "_id": "a2" }).await.unwrap();
        backend.replace_by_id(&coll, "a1", doc! { "_id": "a1" }).await.unwrap();

        let stream = backend.scan_ids(&coll, "a").await.unwrap();
        backend.replace_by_id(&coll, "a3", doc! { "_id": "a3" }).await.unwrap();

        let docs: Vec<Document> = stream.try_collect().await.unwrap();
        assert_eq!(docs, vec![doc! { "_id": "a1" }, doc! { "_id": "a2" }]);
    }
}
