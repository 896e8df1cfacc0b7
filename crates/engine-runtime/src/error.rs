use connectors::api::base::error::ApiError;
use engine_core::error::{LoadError, MetadataError};
use model::error::ConfigError;
use thiserror::Error;

/// Top-level errors of a replication run. Only configuration problems abort
/// the run; everything else is contained at the table boundary.
#[derive(Debug, Error)]
pub enum ReplicationError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Extraction failed: {0}")]
    Extract(#[from] ApiError),

    #[error("Load failed: {0}")]
    Load(#[from] LoadError),

    #[error("Staging error: {0}")]
    Staging(String),
}

impl ReplicationError {
    pub fn aborts_run(&self) -> bool {
        matches!(
            self,
            ReplicationError::Config(_) | ReplicationError::Metadata(MetadataError::Config(_))
        )
    }
}
