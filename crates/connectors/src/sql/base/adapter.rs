use crate::sql::base::error::DbError;
use async_trait::async_trait;
use model::{core::identifiers::LandingTable, records::record::Record};

/// Everything the loader needs from a warehouse. Implementations must map
/// driver failures onto [`DbError`] variants, in particular
/// `AlreadyExists` and `ConnectionLost`.
#[async_trait]
pub trait WarehouseAdapter: Send + Sync {
    async fn ping(&self) -> Result<(), DbError>;

    async fn schema_exists(&self, schema: &str) -> Result<bool, DbError>;

    async fn create_schema(&self, schema: &str) -> Result<(), DbError>;

    async fn table_exists(&self, table: &LandingTable) -> Result<bool, DbError>;

    /// Runs the given DDL, which must create `table`.
    async fn create_table(&self, table: &LandingTable, ddl: &str) -> Result<(), DbError>;

    async fn truncate_table(&self, table: &LandingTable) -> Result<(), DbError>;

    /// Writes one chunk atomically and returns the number of rows written.
    async fn insert_records(&self, table: &LandingTable, records: &[Record]) -> Result<u64, DbError>;

    async fn row_count(&self, table: &LandingTable) -> Result<u64, DbError>;

    /// Drops the current session and opens a fresh one.
    async fn reconnect(&self) -> Result<(), DbError>;
}
