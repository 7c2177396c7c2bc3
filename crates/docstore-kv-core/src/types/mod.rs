//! Type definitions shared across the adapter

/// Error taxonomy
pub mod error;

/// Key-value data model
pub mod value;

pub use error::{CodecError, Error, ErrorKind, Result, StorageError};
pub use value::{Content, StoredValue, ValueRef};
