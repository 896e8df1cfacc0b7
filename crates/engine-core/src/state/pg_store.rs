use crate::{error::MetadataError, state::SyncStateStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use connectors::sql::{base::error::DbError, postgres::utils::connect_client};
use model::{
    config::table::{Origin, TableConfig},
    sync::state::{SyncState, SyncUpdate},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_postgres::{Client, Row};
use tracing::info;

const QUERY_SELECT_TABLES_SQL: &str = include_str!("sql/select_tables.sql");
const QUERY_UPDATE_SYNC_SQL: &str = include_str!("sql/update_sync.sql");

/// `public.table_configuration` in the metadata database.
#[derive(Clone)]
pub struct PgSyncStore {
    url: String,
    client: Arc<RwLock<Client>>,
}

impl PgSyncStore {
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let client = connect_client(url).await?;
        Ok(Self {
            url: url.to_string(),
            client: Arc::new(RwLock::new(client)),
        })
    }
}

#[async_trait]
impl SyncStateStore for PgSyncStore {
    async fn load_tables(&self, origin: Origin) -> Result<Vec<TableConfig>, MetadataError> {
        let client = self.client.read().await;
        let rows = client
            .query(QUERY_SELECT_TABLES_SQL, &[&origin.tags()])
            .await
            .map_err(DbError::from)?;
        rows.iter().map(table_from_row).collect()
    }

    async fn update(
        &self,
        origin: Origin,
        source_name: &str,
        update: &SyncUpdate,
    ) -> Result<(), DbError> {
        let client = self.client.read().await;
        client
            .execute(
                QUERY_UPDATE_SYNC_SQL,
                &[
                    &origin.tags(),
                    &source_name,
                    &update.active,
                    &update.last_sync_attempt_at,
                    &update.last_successful_sync_at,
                ],
            )
            .await?;
        Ok(())
    }

    async fn reconnect(&self) -> Result<(), DbError> {
        info!("Reconnecting to metadata store");
        let fresh = connect_client(&self.url).await?;
        *self.client.write().await = fresh;
        Ok(())
    }
}

fn table_from_row(row: &Row) -> Result<TableConfig, MetadataError> {
    let text = |column: &str| -> Result<String, MetadataError> {
        row.try_get::<_, String>(column)
            .map_err(|err| MetadataError::Database(err.into()))
    };
    let optional = |column: &str| -> Result<Option<String>, MetadataError> {
        row.try_get::<_, Option<String>>(column)
            .map_err(|err| MetadataError::Database(err.into()))
    };
    let timestamp = |column: &str| -> Result<Option<DateTime<Utc>>, MetadataError> {
        row.try_get::<_, Option<DateTime<Utc>>>(column)
            .map_err(|err| MetadataError::Database(err.into()))
    };

    let days: i32 = row
        .try_get("days_interval")
        .map_err(|err| MetadataError::Database(err.into()))?;

    let table = TableConfig {
        id: row
            .try_get("id")
            .map_err(|err| MetadataError::Database(err.into()))?,
        origin: text("origin")?.parse()?,
        source_name: text("source_name")?,
        source_identifier: text("source_identifier")?,
        target_name: text("target_name")?,
        active: row
            .try_get("active")
            .map_err(|err| MetadataError::Database(err.into()))?,
        extraction_strategy: text("extraction_strategy")?.parse()?,
        materialization_strategy: text("materialization_strategy")?.parse()?,
        unique_id_property: optional("unique_id_property")?,
        updated_at_property: optional("updated_at_property")?.filter(|p| !p.trim().is_empty()),
        days_interval: u32::try_from(days).unwrap_or(0),
        sync: SyncState {
            last_sync_attempt_at: timestamp("last_sync_attempt_at")?,
            last_successful_sync_at: timestamp("last_successful_sync_at")?,
        },
    };
    Ok(table)
}
