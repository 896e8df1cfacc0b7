use crate::sql::{
    base::{adapter::WarehouseAdapter, error::DbError},
    postgres::{encoder::encode_record, utils::connect_client},
};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, pin_mut};
use model::{
    core::identifiers::{LandingTable, quote_ident},
    records::record::{ENVELOPE_COLUMNS, Record},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_postgres::Client;
use tracing::{debug, info};

const QUERY_SCHEMA_EXISTS_SQL: &str = include_str!("sql/schema_exists.sql");
const QUERY_TABLE_EXISTS_SQL: &str = include_str!("sql/table_exists.sql");

#[derive(Clone)]
pub struct PgAdapter {
    url: String,
    client: Arc<RwLock<Client>>,
}

impl PgAdapter {
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let client = connect_client(url).await?;
        Ok(Self {
            url: url.to_string(),
            client: Arc::new(RwLock::new(client)),
        })
    }

    fn copy_statement(table: &LandingTable) -> String {
        let columns = ENVELOPE_COLUMNS
            .iter()
            .map(|column| quote_ident(column))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "COPY {} ({columns}) FROM STDIN WITH (FORMAT csv)",
            table.quoted()
        )
    }
}

#[async_trait]
impl WarehouseAdapter for PgAdapter {
    async fn ping(&self) -> Result<(), DbError> {
        let client = self.client.read().await;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }

    async fn schema_exists(&self, schema: &str) -> Result<bool, DbError> {
        let client = self.client.read().await;
        let row = client.query_one(QUERY_SCHEMA_EXISTS_SQL, &[&schema]).await?;
        Ok(row.try_get(0)?)
    }

    async fn create_schema(&self, schema: &str) -> Result<(), DbError> {
        let client = self.client.read().await;
        client
            .batch_execute(&format!("CREATE SCHEMA {}", quote_ident(schema)))
            .await?;
        Ok(())
    }

    async fn table_exists(&self, table: &LandingTable) -> Result<bool, DbError> {
        let client = self.client.read().await;
        let row = client
            .query_one(QUERY_TABLE_EXISTS_SQL, &[&table.schema, &table.table])
            .await?;
        Ok(row.try_get(0)?)
    }

    async fn create_table(&self, table: &LandingTable, ddl: &str) -> Result<(), DbError> {
        debug!(%table, "Creating landing table");
        let client = self.client.read().await;
        client.batch_execute(ddl).await?;
        Ok(())
    }

    async fn truncate_table(&self, table: &LandingTable) -> Result<(), DbError> {
        let client = self.client.read().await;
        client
            .batch_execute(&format!("TRUNCATE TABLE {}", table.quoted()))
            .await?;
        Ok(())
    }

    async fn insert_records(&self, table: &LandingTable, records: &[Record]) -> Result<u64, DbError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut client = self.client.write().await;
        let tx = client.transaction().await?;

        let sink = tx.copy_in(&Self::copy_statement(table)).await?;
        pin_mut!(sink);
        let mut payload = String::new();
        for record in records {
            payload.push_str(&encode_record(record));
        }
        sink.send(Bytes::from(payload)).await?;
        let written = sink.finish().await?;

        tx.commit().await?;
        Ok(written)
    }

    async fn row_count(&self, table: &LandingTable) -> Result<u64, DbError> {
        let client = self.client.read().await;
        let row = client
            .query_one(&format!("SELECT COUNT(*) FROM {}", table.quoted()), &[])
            .await?;
        let count: i64 = row.try_get(0)?;
        Ok(count.max(0) as u64)
    }

    async fn reconnect(&self) -> Result<(), DbError> {
        info!("Reconnecting to warehouse");
        let fresh = connect_client(&self.url).await?;
        *self.client.write().await = fresh;
        Ok(())
    }
}
