use connectors::sql::base::error::DbError;
use model::{core::identifiers::LandingTable, error::ConfigError};
use thiserror::Error;

/// No DDL could be produced for a landing table that does not exist yet.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("No schema source configured for {0}")]
    NoSource(LandingTable),

    #[error("No columns found for table '{0}' in the information-schema export")]
    NoColumns(String),

    #[error("Failed to read schema file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid information-schema export: {0}")]
    InvalidExport(String),
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The connection dropped and the single reconnect-and-reissue failed too.
    #[error("Connection lost during {stage} and the retry failed: {source}")]
    ConnectivityRetryFailed {
        stage: &'static str,
        #[source]
        source: DbError,
    },

    #[error("Warehouse error during {stage}: {source}")]
    Database {
        stage: &'static str,
        #[source]
        source: DbError,
    },
}

/// Persisting sync timestamps failed after every retry. Logged by the
/// tracker, never allowed to undo a completed load.
#[derive(Error, Debug)]
#[error("Failed to write sync state for {origin}/{source_name} after {attempts} attempts: {source}")]
pub struct SyncStateWriteError {
    pub origin: String,
    pub source_name: String,
    pub attempts: usize,
    #[source]
    pub source: DbError,
}

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
