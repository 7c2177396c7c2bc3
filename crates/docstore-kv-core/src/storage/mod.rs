//! Storage layer for the key-value adapter
//!
//! This module provides the backend abstraction that keeps the operation
//! handlers independent of the document engine. A backend only understands
//! collections and documents keyed by their identifier; key-value semantics
//! (validation, value conversion, error translation) live in [`crate::kv`].

use async_trait::async_trait;
use bson::Document;
use futures::Stream;
use std::pin::Pin;

use crate::types::StorageError;

/// Store name to collection resolution
pub mod mapper;

/// MongoDB backend
pub mod mongo;

/// In-process backend for development and tests
pub mod memory;

pub use mapper::{CollectionMapper, CollectionRef};
pub use memory::MemoryBackend;
pub use mongo::MongoBackend;

/// Result type for backend operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Lazily produced documents from a scan. Dropping the stream releases the
/// underlying cursor.
pub type DocumentStream = Pin<Box<dyn Stream<Item = StorageResult<Document>> + Send>>;

/// Trait for document backends
///
/// Every operation addresses exactly one document by its identifier, except
/// [`DocumentBackend::scan_ids`] which enumerates identifiers by prefix.
/// Implementations must be safe to share across concurrent requests without
/// additional locking by the caller.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Short backend name for logs and health responses
    fn name(&self) -> &'static str;

    /// Fetch the document whose identifier equals `id`
    async fn find_by_id(&self, collection: &CollectionRef, id: &str) -> StorageResult<Option<Document>>;

    /// Insert `doc` under `id`, fully replacing any existing document
    async fn replace_by_id(&self, collection: &CollectionRef, id: &str, doc: Document) -> StorageResult<()>;

    /// Remove the document under `id`; removing an absent document succeeds
    async fn delete_by_id(&self, collection: &CollectionRef, id: &str) -> StorageResult<()>;

    /// Stream documents, projected to their identifier, whose identifier
    /// starts with `prefix`. An empty prefix matches every document.
    async fn scan_ids(&self, collection: &CollectionRef, prefix: &str) -> StorageResult<DocumentStream>;

    /// Lightweight liveness check
    async fn ping(&self) -> StorageResult<()>;
}
