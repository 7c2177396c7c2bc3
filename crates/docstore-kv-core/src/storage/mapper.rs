//! Store/collection mapping
//!
//! Each logical store maps to one collection named after the store, inside
//! the single database configured for the deployment.

use std::fmt;

use crate::constants::SYSTEM_COLLECTION_PREFIX;
use crate::types::{Error, Result};

/// Fully qualified physical collection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionRef {
    /// Database holding the collection
    pub database: String,
    /// Collection name
    pub name: String,
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.name)
    }
}

/// Resolves store names to collections
#[derive(Debug, Clone)]
pub struct CollectionMapper {
    database: String,
}

impl CollectionMapper {
    /// Create a mapper for the given database
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
        }
    }

    /// Resolve a store name to its collection
    pub fn resolve(&self, store: &str) -> Result<CollectionRef> {
        if store.is_empty() {
            return Err(Error::invalid_argument("store name is required"));
        }
        if store.contains('$') || store.contains('\0') {
            return Err(Error::invalid_argument(format!(
                "store name {:?} contains a reserved character",
                store
            )));
        }
        if store.starts_with(SYSTEM_COLLECTION_PREFIX) {
            return Err(Error::invalid_argument(format!(
                "store name {:?} uses the reserved prefix {:?}",
                store, SYSTEM_COLLECTION_PREFIX
            )));
        }

        Ok(CollectionRef {
            database: self.database.clone(),
            name: store.to_string(),
        })
    }
}
