use async_trait::async_trait;
use connectors::sql::base::error::DbError;
use model::{
    config::table::{Origin, TableConfig},
    sync::state::SyncUpdate,
};

use crate::error::MetadataError;

#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod pg_store;
pub mod tracker;

/// Persistence of table configuration and sync timestamps, keyed by
/// `(origin, source_name)`.
#[async_trait]
pub trait SyncStateStore: Send + Sync {
    async fn load_tables(&self, origin: Origin) -> Result<Vec<TableConfig>, MetadataError>;

    /// Partial update: `None` fields keep their stored value.
    async fn update(
        &self,
        origin: Origin,
        source_name: &str,
        update: &SyncUpdate,
    ) -> Result<(), DbError>;

    async fn reconnect(&self) -> Result<(), DbError>;
}
