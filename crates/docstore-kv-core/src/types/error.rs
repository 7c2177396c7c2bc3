//! Error types and handling for the key-value adapter
//!
//! Every failure is classified into one of four caller-visible kinds
//! (see [`ErrorKind`]). Sub-errors from the backend and the value codec are
//! converted with `#[from]` and keep their original cause for diagnostics.

use thiserror::Error;

/// Main result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Caller-visible error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The requested key does not exist in the store
    NotFound,
    /// The request itself is malformed (missing store/key, reserved field)
    InvalidArgument,
    /// Codec or backend failure while serving a request
    Internal,
    /// Unrecoverable startup condition, the adapter never serves traffic
    Fatal,
}

impl ErrorKind {
    /// Stable name used in logs, metrics labels and error responses
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::Internal => "Internal",
            ErrorKind::Fatal => "Fatal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for the key-value adapter
#[derive(Error, Debug)]
pub enum Error {
    /// Key absent on get
    #[error("key {key} not found in store {store}")]
    NotFound {
        /// Key that was looked up
        key: String,
        /// Store the key was looked up in
        store: String,
    },

    /// Malformed request
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Backend failure with the operation context it happened in
    #[error("{context}: {source}")]
    Storage {
        /// What the adapter was doing, e.g. "unable to delete k from s store"
        context: String,
        /// Underlying backend failure
        source: StorageError,
    },

    /// Value conversion failure
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Internal invariant violations
    #[error("Internal error: {0}")]
    Internal(String),

    /// Invalid configuration, surfaced at startup
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unrecoverable startup failure (missing connection string, failed ping)
    #[error("Fatal: {0}")]
    Fatal(String),
}

/// Backend-specific errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Error reported by the MongoDB driver
    #[error("MongoDB error: {0}")]
    Driver(#[from] mongodb::error::Error),
}

/// Conversion errors between caller content and backend documents
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    /// Caller content used the reserved identifier field
    #[error("field `{0}` is reserved for the document identifier")]
    ReservedField(String),

    /// A backend type with no structured-value counterpart
    #[error("unsupported {kind} value at `{path}`")]
    Unsupported {
        /// Dotted path of the offending field
        path: String,
        /// Backend type name
        kind: &'static str,
    },

    /// Number that cannot be represented on the other side
    #[error("number at `{path}` is not representable: {value}")]
    NumberOutOfRange {
        /// Dotted path of the offending field
        path: String,
        /// Textual form of the number
        value: String,
    },

    /// Document carries no identifier
    #[error("document identifier is missing")]
    MissingId,

    /// Document identifier is not a string key
    #[error("document identifier is not a string: {0}")]
    NonStringId(String),
}

impl Error {
    /// Create a not found error for a key in a store
    pub fn not_found(store: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            key: key.into(),
            store: store.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Wrap a backend failure with the operation it interrupted
    pub fn storage(context: impl Into<String>, source: impl Into<StorageError>) -> Self {
        Self::Storage {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a fatal startup error
    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    /// Classify this error into its caller-visible kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::Codec(CodecError::ReservedField(_)) => ErrorKind::InvalidArgument,
            Error::Codec(_) | Error::Storage { .. } | Error::Internal(_) => ErrorKind::Internal,
            Error::Config(_) | Error::Fatal(_) => ErrorKind::Fatal,
        }
    }

    /// Check if this is a client error (4xx equivalent)
    pub fn is_client_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound | ErrorKind::InvalidArgument)
    }

    /// Check if this is a server error (5xx equivalent)
    pub fn is_server_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::Internal | ErrorKind::Fatal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_store_and_key() {
        let err = Error::not_found("profiles", "alice");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "key alice not found in store profiles");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_reserved_field_is_caller_error() {
        let err = Error::from(CodecError::ReservedField("_id".to_string()));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_codec_and_storage_errors_are_internal() {
        let codec = Error::from(CodecError::MissingId);
        assert_eq!(codec.kind(), ErrorKind::Internal);

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let storage = Error::storage(
            "unable to insert k into s store",
            StorageError::from(mongodb::error::Error::from(io)),
        );
        assert_eq!(storage.kind(), ErrorKind::Internal);
        assert!(storage.is_server_error());
        let message = storage.to_string();
        assert!(message.starts_with("unable to insert k into s store: MongoDB error:"));
        assert!(message.contains("disk full"));
    }

    #[test]
    fn test_startup_errors_are_fatal() {
        assert_eq!(Error::fatal("ping failed").kind(), ErrorKind::Fatal);
        assert_eq!(Error::config("bad addr").kind(), ErrorKind::Fatal);
    }
}
