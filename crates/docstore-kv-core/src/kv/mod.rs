//! Key-value operations over the document backend

/// Operation handlers
pub mod service;

pub use service::{KeyStream, KeyValueService};
