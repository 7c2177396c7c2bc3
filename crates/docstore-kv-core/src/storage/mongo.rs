//! MongoDB backend
//!
//! One database per deployment, one collection per store, one document per
//! key with the key held in `_id`. All operations target a single document
//! by `_id`, so per-document atomicity is the backend's own.

use async_trait::async_trait;
use bson::{doc, Bson, Document, Regex};
use futures::StreamExt;
use mongodb::Collection;
use tracing::debug;

use crate::constants::{ADMIN_DATABASE, ID_FIELD, SCAN_BATCH_SIZE};
use crate::core::connection::Session;
use crate::storage::{CollectionRef, DocumentBackend, DocumentStream, StorageResult};
use crate::types::StorageError;

/// Backend backed by a live MongoDB session
#[derive(Debug, Clone)]
pub struct MongoBackend {
    session: Session,
}

impl MongoBackend {
    /// Create a backend over an established session
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    fn collection(&self, collection: &CollectionRef) -> Collection<Document> {
        self.session
            .client()
            .database(&collection.database)
            .collection::<Document>(&collection.name)
    }
}

#[async_trait]
impl DocumentBackend for MongoBackend {
    fn name(&self) -> &'static str {
        "mongodb"
    }

    async fn find_by_id(&self, collection: &CollectionRef, id: &str) -> StorageResult<Option<Document>> {
        let doc = self.collection(collection).find_one(id_filter(id)).await?;
        Ok(doc)
    }

    async fn replace_by_id(&self, collection: &CollectionRef, id: &str, doc: Document) -> StorageResult<()> {
        let result = self
            .collection(collection)
            .replace_one(id_filter(id), doc)
            .upsert(true)
            .await?;
        debug!(
            collection = %collection,
            id,
            matched = result.matched_count,
            upserted = result.upserted_id.is_some(),
            "replaced document"
        );
        Ok(())
    }

    async fn delete_by_id(&self, collection: &CollectionRef, id: &str) -> StorageResult<()> {
        self.collection(collection).delete_one(id_filter(id)).await?;
        Ok(())
    }

    async fn scan_ids(&self, collection: &CollectionRef, prefix: &str) -> StorageResult<DocumentStream> {
        let cursor = self
            .collection(collection)
            .find(prefix_filter(prefix))
            .projection(doc! { "_id": 1 })
            .batch_size(SCAN_BATCH_SIZE)
            .await?;

        // The driver kills the server-side cursor when it is dropped
        Ok(Box::pin(cursor.map(|item| item.map_err(StorageError::from))))
    }

    async fn ping(&self) -> StorageResult<()> {
        self.session
            .client()
            .database(ADMIN_DATABASE)
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }
}

/// Filter selecting the single document stored under `id`
pub fn id_filter(id: &str) -> Document {
    let mut filter = Document::new();
    filter.insert(ID_FIELD, Bson::String(id.to_string()));
    filter
}

/// Filter selecting documents whose identifier starts with `prefix`.
///
/// The prefix is matched literally: regex metacharacters are escaped before
/// the pattern is anchored, so `a.b` only matches ids beginning with `a.b`.
pub fn prefix_filter(prefix: &str) -> Document {
    let mut filter = Document::new();
    if prefix.is_empty() {
        return filter;
    }

    let mut condition = Document::new();
    condition.insert(
        "$regex",
        Bson::RegularExpression(Regex {
            pattern: prefix_pattern(prefix),
            options: String::new(),
        }),
    );
    filter.insert(ID_FIELD, condition);
    filter
}

/// Anchored, case-sensitive pattern matching `prefix` literally
pub fn prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 8);
    pattern.push('^');
    for c in prefix.chars() {
        // Regex patterns are cstrings and cannot carry a raw NUL
        if c == '\0' {
            pattern.push_str("\\x00");
            continue;
        }
        if matches!(
            c,
            '\\' | '^' | '$' | '.' | '|' | '?' | '*' | '+' | '(' | ')' | '[' | ']' | '{' | '}' | '-' | '#'
        ) {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::CONNECTION_STRING_ENV;
    use crate::core::config::StorageConfig;
    use crate::core::connection::connect;
    use crate::kv::KeyValueService;
    use crate::storage::CollectionMapper;
    use crate::types::{Content, ErrorKind, ValueRef};
    use serde_json::json;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn test_id_filter() {
        assert_eq!(id_filter("user:1"), doc! { "_id": "user:1" });
    }

    #[test]
    fn test_empty_prefix_matches_everything() {
        assert_eq!(prefix_filter(""), Document::new());
    }

    #[test]
    fn test_prefix_is_anchored() {
        let filter = prefix_filter("a");
        let condition = filter.get_document("_id").unwrap();
        match condition.get("$regex") {
            Some(Bson::RegularExpression(regex)) => {
                assert_eq!(regex.pattern, "^a");
                assert_eq!(regex.options, "");
            }
            other => panic!("expected regex condition, got {:?}", other),
        }
    }

    #[test]
    fn test_metacharacters_are_escaped() {
        assert_eq!(prefix_pattern("a.b"), "^a\\.b");
        assert_eq!(prefix_pattern("x*"), "^x\\*");
        assert_eq!(prefix_pattern("(v1)[0]"), "^\\(v1\\)\\[0\\]");
        assert_eq!(prefix_pattern("^$|?+{}"), "^\\^\\$\\|\\?\\+\\{\\}");
        assert_eq!(prefix_pattern("c:\\tmp"), "^c:\\\\tmp");
    }

    #[test]
    fn test_nul_prefix_serializes() {
        assert_eq!(prefix_pattern("a\0"), "^a\\x00");
        assert!(bson::to_vec(&prefix_filter("a\0b")).is_ok());
        assert!(bson::to_vec(&id_filter("a\0b")).is_ok());
    }

    #[test]
    fn test_plain_and_unicode_prefixes_unchanged() {
        assert_eq!(prefix_pattern("user:42/"), "^user:42/");
        assert_eq!(prefix_pattern("héllo_"), "^héllo_");
    }

    // Tests below run against a live cluster and are skipped when
    // MONGO_CLUSTER_CONNECTION_STRING is unset.
    const LIVE_DATABASE: &str = "docstore_kv_test";

    struct LiveStore {
        backend: MongoBackend,
        service: KeyValueService,
        store: String,
    }

    impl LiveStore {
        async fn open(name: &str) -> Option<Self> {
            let uri = std::env::var(CONNECTION_STRING_ENV).ok()?;
            let config = StorageConfig {
                connection_string: Some(uri),
                database: LIVE_DATABASE.to_string(),
                ..Default::default()
            };
            let session = connect(&config).await.unwrap();
            let backend = MongoBackend::new(session);
            let service = KeyValueService::new(
                Arc::new(backend.clone()),
                CollectionMapper::new(LIVE_DATABASE),
            );
            let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
            Some(Self {
                backend,
                service,
                store: format!("{}_{}", name, nanos),
            })
        }

        fn value_ref(&self, key: &str) -> ValueRef {
            ValueRef::new(self.store.clone(), key)
        }

        async fn keys(&self, prefix: &str) -> BTreeSet<String> {
            let keys = self.service.scan_keys(&self.store, prefix).await.unwrap();
            keys.map(|key| key.unwrap()).collect().await
        }

        async fn drop_collection(self) {
            self.backend
                .session
                .client()
                .database(LIVE_DATABASE)
                .collection::<Document>(&self.store)
                .drop()
                .await
                .unwrap();
        }
    }

    fn content(value: serde_json::Value) -> Content {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("test content must be an object"),
        }
    }

    fn set_of(keys: &[&str]) -> BTreeSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[tokio::test]
    async fn test_live_round_trip_and_overwrite() {
        let Some(live) = LiveStore::open("round_trip").await else {
            return;
        };
        let value_ref = live.value_ref("alice");
        let first = content(json!({ "name": "Alice", "age": 30, "tags": ["a", "b"] }));

        live.service.set_value(&value_ref, &first).await.unwrap();
        assert_eq!(live.service.get_value(&value_ref).await.unwrap().content, first);

        // Second write to the same key replaces, with no fields carried over
        let second = content(json!({ "city": "Perth" }));
        live.service.set_value(&value_ref, &second).await.unwrap();
        assert_eq!(live.service.get_value(&value_ref).await.unwrap().content, second);

        live.drop_collection().await;
    }

    #[tokio::test]
    async fn test_live_delete_is_idempotent() {
        let Some(live) = LiveStore::open("delete").await else {
            return;
        };
        let value_ref = live.value_ref("k");
        live.service
            .set_value(&value_ref, &content(json!({ "v": 1 })))
            .await
            .unwrap();

        live.service.delete_key(&value_ref).await.unwrap();
        live.service.delete_key(&value_ref).await.unwrap();
        let err = live.service.get_value(&value_ref).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        live.drop_collection().await;
    }

    #[tokio::test]
    async fn test_live_prefix_scan_is_literal() {
        let Some(live) = LiveStore::open("scan").await else {
            return;
        };
        for key in ["a1", "a2", "b1", "a.b", "axb", "a*c", "a\0b"] {
            live.service
                .set_value(&live.value_ref(key), &Content::new())
                .await
                .unwrap();
        }

        assert_eq!(live.keys("b").await, set_of(&["b1"]));
        assert_eq!(live.keys("a.").await, set_of(&["a.b"]));
        assert_eq!(live.keys("a*").await, set_of(&["a*c"]));
        assert_eq!(live.keys("a\0").await, set_of(&["a\0b"]));
        assert_eq!(live.keys("").await.len(), 7);
        assert!(live.keys("zzz").await.is_empty());

        live.drop_collection().await;
    }

    #[tokio::test]
    async fn test_live_stores_are_isolated() {
        let Some(live) = LiveStore::open("isolated").await else {
            return;
        };
        let other = format!("{}_other", live.store);
        live.service
            .set_value(&live.value_ref("k"), &content(json!({ "v": 1 })))
            .await
            .unwrap();

        let err = live
            .service
            .get_value(&ValueRef::new(other.clone(), "k"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let keys: Vec<_> = live.service.scan_keys(&other, "").await.unwrap().collect().await;
        assert!(keys.is_empty());

        live.drop_collection().await;
    }
}
