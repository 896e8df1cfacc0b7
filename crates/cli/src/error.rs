use connectors::{api::base::error::ApiError, sql::base::error::DbError};
use engine_core::error::{MetadataError, SchemaError};
use engine_runtime::error::ReplicationError;
use model::error::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnv(String),

    #[error(transparent)]
    Table(#[from] ConfigError),

    #[error("Failed to read table configuration: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Failed to set up the source connector: {0}")]
    Source(#[from] ApiError),

    #[error("Warehouse error: {0}")]
    Database(#[from] DbError),

    #[error("Failed to load the schema file: {0}")]
    Schema(#[from] SchemaError),

    #[error("Replication failed: {0}")]
    Replication(#[from] ReplicationError),

    #[error("Transformation failed: {0}")]
    Transform(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Shutdown requested")]
    ShutdownRequested,
}
