//! # Docstore KV Server
//!
//! HTTP binding of the key-value contract. Handlers translate requests into
//! [`KeyValueService`](docstore_kv_core::KeyValueService) calls and map error
//! kinds onto status codes.

#![warn(missing_docs)]

/// HTTP API handlers and routing
pub mod api;

/// Tracing subscriber setup
pub mod logging;

// Re-export core functionality
pub use docstore_kv_core::{Config, Error, ErrorKind, KeyValueService, Result, VERSION};
