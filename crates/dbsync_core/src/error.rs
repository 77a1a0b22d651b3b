use crate::FormattedError;
use thiserror::Error;

/// Errors produced by dialect adapters and the replication engine.
///
/// All adapter operations return this error type so the differs and the
/// pair worker can react uniformly regardless of which engine raised the
/// failure. Variants carrying `FormattedError` preserve whatever structured
/// detail the originating driver attached (detail, hint, code).
#[derive(Debug, Error)]
pub enum DbError {
    /// Failed to establish a connection to the source or target database.
    #[error("Connection failed: {0}")]
    ConnectionFailed(FormattedError),

    /// A query, mutation, or introspection call failed against a live connection.
    #[error("{0}")]
    QueryFailed(FormattedError),

    /// An ALTER TABLE emitted by the schema differ was rejected by the engine.
    #[error("Schema incompatible: {0}")]
    SchemaIncompatible(FormattedError),

    /// An operation required a primary key that the table does not have.
    #[error("Missing primary key on table: {0}")]
    MissingKey(String),

    /// The configuration collaborator holds invalid or inconsistent state:
    /// an unknown connection reference, a duplicate pair name, removal of
    /// an in-use connection, or a corrupted store.
    #[error("Invalid configuration: {0}")]
    ConfigurationInvalid(String),

    /// Operation not supported by this adapter/dialect.
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Unhandled error that should trigger daemon shutdown.
    #[error("Fatal error: {0}")]
    Fatal(String),

    /// Filesystem or network I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DbError {
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed(FormattedError::new(msg))
    }

    pub fn query_failed(msg: impl Into<String>) -> Self {
        Self::QueryFailed(FormattedError::new(msg))
    }

    pub fn schema_incompatible(msg: impl Into<String>) -> Self {
        Self::SchemaIncompatible(FormattedError::new(msg))
    }

    pub fn missing_key(table: impl Into<String>) -> Self {
        Self::MissingKey(table.into())
    }

    pub fn configuration_invalid(msg: impl Into<String>) -> Self {
        Self::ConfigurationInvalid(msg.into())
    }

    /// Access the structured error information, if the variant carries one.
    pub fn formatted(&self) -> Option<&FormattedError> {
        match self {
            Self::ConnectionFailed(f) | Self::QueryFailed(f) | Self::SchemaIncompatible(f) => {
                Some(f)
            }
            Self::MissingKey(_)
            | Self::ConfigurationInvalid(_)
            | Self::NotSupported(_)
            | Self::Fatal(_)
            | Self::IoError(_) => None,
        }
    }

    /// Whether the error is retriable (e.g., transient network issues).
    ///
    /// The engine never retries automatically within a tick (§7); this is
    /// informational for logging and for the `is_retriable` hint that
    /// `FormattedError` carries from the underlying driver.
    pub fn is_retriable(&self) -> bool {
        match self.formatted() {
            Some(f) => f.retriable,
            None => false,
        }
    }
}
