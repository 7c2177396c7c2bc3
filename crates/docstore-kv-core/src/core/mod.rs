//! Core runtime: configuration, connection management and service creation

/// Configuration loading and validation
pub mod config;

/// MongoDB session setup
pub mod connection;

/// Service factory
pub mod factory;

pub use config::{load_config, BackendType, Config, LogFormat};
pub use connection::{connect, Session};
pub use factory::{create_backend, create_service};
