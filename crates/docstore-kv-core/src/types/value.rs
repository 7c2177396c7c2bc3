//! Key-value data model: stores, keys, references and content

use serde::{Deserialize, Serialize};
use std::fmt;

/// Schemaless value content: field names mapped to scalars, sequences or
/// nested mappings.
pub type Content = serde_json::Map<String, serde_json::Value>;

/// The (store, key) pair that globally identifies a value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueRef {
    /// Logical store (namespace) name
    pub store: String,
    /// Key, unique within the store
    pub key: String,
}

impl ValueRef {
    /// Create a new value reference
    pub fn new(store: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            store: store.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.store, self.key)
    }
}

/// A value returned by a get, qualified by its reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredValue {
    /// Where the value lives
    #[serde(rename = "ref")]
    pub value_ref: ValueRef,
    /// Decoded content, without the reserved identifier field
    pub content: Content,
}
