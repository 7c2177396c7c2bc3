//! Connection manager
//!
//! Establishes the single long-lived MongoDB session at startup. Every
//! failure here is fatal: the adapter refuses to start rather than serve in a
//! degraded state, and nothing is retried.

use bson::doc;
use mongodb::options::{ClientOptions, ServerApi, ServerApiVersion};
use mongodb::Client;
use tracing::{error, info};

use crate::constants::{ADMIN_DATABASE, CONNECTION_STRING_ENV};
use crate::core::config::{redact_connection_string, StorageConfig};
use crate::types::{Error, Result};

/// Application name reported to the cluster
const APP_NAME: &str = "docstore-kv";

/// Shared database session
///
/// Cloning is cheap; the driver client is reference counted and pools its
/// connections internally.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
}

impl Session {
    /// Driver client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Return the configured connection string, rejecting empty or unset values
pub fn required_connection_string(config: &StorageConfig) -> Result<&str> {
    config
        .connection_string
        .as_deref()
        .map(str::trim)
        .filter(|uri| !uri.is_empty())
        .ok_or_else(|| Error::fatal(format!("{} is unset", CONNECTION_STRING_ENV)))
}

/// Connect to the cluster and confirm it answers a ping
pub async fn connect(config: &StorageConfig) -> Result<Session> {
    let uri = required_connection_string(config)?;
    let redacted = redact_connection_string(uri);

    let mut options = ClientOptions::parse(uri)
        .await
        .map_err(|e| Error::fatal(format!("Invalid connection string {}: {}", redacted, e)))?;
    options.server_api = Some(ServerApi::builder().version(ServerApiVersion::V1).build());
    if options.app_name.is_none() {
        options.app_name = Some(APP_NAME.to_string());
    }

    let client = Client::with_options(options)
        .map_err(|e| Error::fatal(format!("Failed to create client for {}: {}", redacted, e)))?;

    if let Err(e) = client
        .database(ADMIN_DATABASE)
        .run_command(doc! { "ping": 1 })
        .await
    {
        error!(endpoint = %redacted, "liveness check failed: {}", e);
        return Err(Error::fatal(format!("Liveness check against {} failed: {}", redacted, e)));
    }

    info!(endpoint = %redacted, database = %config.database, "Connected to MongoDB");
    Ok(Session { client })
}
