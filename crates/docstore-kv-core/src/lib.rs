//! # Docstore KV Core
//!
//! Key-value semantics over a document database. Each store maps to one
//! collection, each key to one document whose identifier is the key, and
//! each value to the document's remaining fields.

#![warn(missing_docs)]

/// Conversion between structured values and stored documents
pub mod codec;

/// System constants
pub mod constants;

/// Configuration, connection and factory
pub mod core;

/// Key-value operations
pub mod kv;

/// Document backends
pub mod storage;

/// System utilities and metrics
pub mod system;

/// Type definitions
pub mod types;

pub use crate::core::{create_service, Config};
pub use kv::{KeyStream, KeyValueService};
pub use storage::{CollectionMapper, DocumentBackend, MemoryBackend, MongoBackend};
pub use types::{Content, Error, ErrorKind, Result, StoredValue, ValueRef};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
