//! System constants

/// Reserved document field holding the key
pub const ID_FIELD: &str = "_id";

/// Database used when the configuration does not name one
pub const DEFAULT_DATABASE: &str = "nitric";

/// Database that receives the startup liveness ping
pub const ADMIN_DATABASE: &str = "admin";

/// Environment variable carrying the cluster connection string
pub const CONNECTION_STRING_ENV: &str = "MONGO_CLUSTER_CONNECTION_STRING";

/// Prefix reserved by MongoDB for internal collections
pub const SYSTEM_COLLECTION_PREFIX: &str = "system.";

/// Number of documents the driver fetches per cursor round trip during a scan
pub const SCAN_BATCH_SIZE: u32 = 256;
