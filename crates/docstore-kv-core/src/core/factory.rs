//! Service factory
//!
//! Builds the key-value service for the configured backend. The mongo backend
//! connects and pings the cluster here, so a service returned by
//! [`create_service`] is ready to serve.

use std::sync::Arc;
use tracing::info;

use crate::core::config::{BackendType, Config};
use crate::core::connection;
use crate::kv::KeyValueService;
use crate::storage::{CollectionMapper, DocumentBackend, MemoryBackend, MongoBackend};
use crate::types::Result;

/// Create the document backend selected by `config`
pub async fn create_backend(config: &Config) -> Result<Arc<dyn DocumentBackend>> {
    match config.storage.backend {
        BackendType::Mongo => {
            info!("Creating KeyValueService with MongoDB backend");
            let session = connection::connect(&config.storage).await?;
            Ok(Arc::new(MongoBackend::new(session)))
        }
        BackendType::Memory => {
            info!("Creating KeyValueService with in-memory backend");
            Ok(Arc::new(MemoryBackend::new()))
        }
    }
}

/// Create a ready key-value service from configuration
pub async fn create_service(config: &Config) -> Result<KeyValueService> {
    config.validate()?;
    let backend = create_backend(config).await?;
    let mapper = CollectionMapper::new(config.storage.database.clone());
    info!(
        backend = backend.name(),
        database = %config.storage.database,
        "KeyValueService created"
    );
    Ok(KeyValueService::new(backend, mapper))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ErrorKind, ValueRef};

    fn memory_config() -> Config {
        let mut config = Config::default();
        config.storage.backend = BackendType::Memory;
        config
    }

    #[tokio::test]
    async fn test_memory_service_is_usable() {
        let service = create_service(&memory_config()).await.unwrap();
        assert_eq!(service.backend_name(), "memory");
        assert!(service.ping().await.is_ok());

        let err = service.get_value(&ValueRef::new("s", "k")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_mongo_without_connection_string_is_fatal() {
        let err = create_service(&Config::default()).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Fatal);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_connecting() {
        let mut config = memory_config();
        config.logging.level = "verbose".to_string();
        let err = create_service(&config).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Fatal);
    }
}
