use crate::{
    error::LoadError,
    retry::{RetryError, RetryPolicy, classify_db_error},
    schema::resolver::SchemaResolver,
};
use connectors::sql::base::{adapter::WarehouseAdapter, error::DbError};
use model::{
    core::identifiers::LandingTable,
    load::{LoadMode, LoadOptions, LoadResult},
    records::record::Record,
};
use std::{fmt, future::Future, sync::Arc};
use tracing::{debug, info, warn};

/// Steps of loading one table. Creation steps are skipped when the catalog
/// already has the object; `Truncate` only runs in replace mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    SchemaCheck,
    CreateSchema,
    TableCheck,
    CreateTable,
    Truncate,
    BulkInsert,
    Done,
}

impl LoadStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadStage::SchemaCheck => "schema check",
            LoadStage::CreateSchema => "schema creation",
            LoadStage::TableCheck => "table check",
            LoadStage::CreateTable => "table creation",
            LoadStage::Truncate => "truncate",
            LoadStage::BulkInsert => "bulk insert",
            LoadStage::Done => "done",
        }
    }
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct WarehouseLoader {
    warehouse: Arc<dyn WarehouseAdapter>,
    resolver: SchemaResolver,
    options: LoadOptions,
    retry: RetryPolicy,
}

impl WarehouseLoader {
    pub fn new(
        warehouse: Arc<dyn WarehouseAdapter>,
        resolver: SchemaResolver,
        options: LoadOptions,
    ) -> Self {
        Self {
            warehouse,
            resolver,
            options,
            retry: RetryPolicy::for_connection_loss(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    pub async fn load(&self, table: &LandingTable, records: &[Record]) -> Result<LoadResult, LoadError> {
        let mode = self.options.mode;
        let mut stage = LoadStage::SchemaCheck;
        let mut written = 0usize;

        while stage != LoadStage::Done {
            debug!(%table, %stage, "Load stage");
            stage = match stage {
                LoadStage::SchemaCheck => {
                    let schema = table.schema.as_str();
                    let warehouse = self.warehouse.as_ref();
                    let exists = self
                        .with_reconnect(stage, move || async move {
                            warehouse.schema_exists(schema).await
                        })
                        .await?;
                    if exists {
                        LoadStage::TableCheck
                    } else {
                        LoadStage::CreateSchema
                    }
                }
                LoadStage::CreateSchema => {
                    self.create_schema(&table.schema).await?;
                    LoadStage::TableCheck
                }
                LoadStage::TableCheck => {
                    let warehouse = self.warehouse.as_ref();
                    let exists = self
                        .with_reconnect(stage, move || async move {
                            warehouse.table_exists(table).await
                        })
                        .await?;
                    match (exists, mode) {
                        (false, _) => LoadStage::CreateTable,
                        (true, LoadMode::Replace) => LoadStage::Truncate,
                        (true, LoadMode::Append) => LoadStage::BulkInsert,
                    }
                }
                LoadStage::CreateTable => {
                    self.create_table(table).await?;
                    match mode {
                        LoadMode::Replace => LoadStage::Truncate,
                        LoadMode::Append => LoadStage::BulkInsert,
                    }
                }
                LoadStage::Truncate => {
                    let warehouse = self.warehouse.as_ref();
                    self.with_reconnect(stage, move || async move {
                        warehouse.truncate_table(table).await
                    })
                    .await?;
                    LoadStage::BulkInsert
                }
                LoadStage::BulkInsert => {
                    written = self.insert_chunks(table, records).await?;
                    LoadStage::Done
                }
                LoadStage::Done => LoadStage::Done,
            };
        }

        info!(%table, rows = written, %mode, "Landing table loaded");
        Ok(LoadResult::written(written, mode))
    }

    /// Creates the schema, tolerating a concurrent creator.
    pub async fn create_schema(&self, schema: &str) -> Result<(), LoadError> {
        let warehouse = self.warehouse.as_ref();
        let created = self
            .with_reconnect(LoadStage::CreateSchema, move || async move {
                tolerate_existing(warehouse.create_schema(schema).await)
            })
            .await?;
        if created {
            info!(schema, "Schema created");
        } else {
            warn!(schema, "Schema already exists, continuing");
        }
        Ok(())
    }

    /// Creates the landing table from the resolved DDL, tolerating a
    /// concurrent creator.
    pub async fn create_table(&self, table: &LandingTable) -> Result<(), LoadError> {
        let ddl = self.resolver.resolve(table)?;
        let ddl = ddl.as_str();
        let warehouse = self.warehouse.as_ref();
        let created = self
            .with_reconnect(LoadStage::CreateTable, move || async move {
                tolerate_existing(warehouse.create_table(table, ddl).await)
            })
            .await?;
        if created {
            info!(%table, "Landing table created");
        } else {
            warn!(%table, "Table already exists, continuing");
        }
        Ok(())
    }

    async fn insert_chunks(&self, table: &LandingTable, records: &[Record]) -> Result<usize, LoadError> {
        let warehouse = self.warehouse.as_ref();
        let mut written = 0usize;
        for (index, chunk) in records.chunks(self.options.chunk_size.max(1)).enumerate() {
            let rows = self
                .with_reconnect(LoadStage::BulkInsert, move || async move {
                    warehouse.insert_records(table, chunk).await
                })
                .await?;
            debug!(%table, chunk = index, rows, "Chunk inserted");
            written += rows as usize;
        }
        Ok(written)
    }

    /// Runs one warehouse call. A lost connection is repaired and the call
    /// reissued once; a failing chunk transaction has already rolled back.
    async fn with_reconnect<T, F, Fut>(&self, stage: LoadStage, op: F) -> Result<T, LoadError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, DbError>>,
    {
        let warehouse = self.warehouse.as_ref();
        let op = &op;
        self.retry
            .run_attempts(
                move |attempt| async move {
                    if attempt > 0 {
                        warn!(%stage, attempt, "Warehouse connection lost, reconnecting");
                        warehouse.reconnect().await?;
                    }
                    op().await
                },
                classify_db_error,
            )
            .await
            .map_err(|err| match err {
                RetryError::AttemptsExceeded(source) => LoadError::ConnectivityRetryFailed {
                    stage: stage.as_str(),
                    source,
                },
                RetryError::Fatal(source) => LoadError::Database {
                    stage: stage.as_str(),
                    source,
                },
            })
    }
}

fn tolerate_existing(result: Result<(), DbError>) -> Result<bool, DbError> {
    match result {
        Ok(()) => Ok(true),
        Err(err) if err.is_already_exists() => Ok(false),
        Err(err) => Err(err),
    }
}
