use crate::{
    error::ReplicationError,
    execution::{factory::ExtractorFactory, settings::RunSettings, staging::RawStaging},
    notify::Notifier,
};
use async_trait::async_trait;
use chrono::Utc;
use engine_core::{loader::WarehouseLoader, state::tracker::SyncTracker};
use model::{config::table::TableConfig, load::LoadResult, records::record::Record};
use serde::Serialize;
use std::{sync::Arc, time::Instant};
use tracing::{error, info, warn};

/// Replicates one table. Errors bubble up to the wrapper that isolates them.
#[async_trait]
pub trait TableProcessor: Send + Sync {
    async fn process(&self, table: &TableConfig) -> Result<LoadResult, ReplicationError>;
}

/// attempt -> extract -> load -> success.
pub struct ReplicationStep {
    factory: Arc<dyn ExtractorFactory>,
    loader: WarehouseLoader,
    tracker: SyncTracker,
    staging: Option<RawStaging>,
    settings: RunSettings,
}

impl ReplicationStep {
    pub fn new(
        factory: Arc<dyn ExtractorFactory>,
        loader: WarehouseLoader,
        tracker: SyncTracker,
    ) -> Self {
        Self {
            factory,
            loader,
            tracker,
            staging: None,
            settings: RunSettings::default(),
        }
    }

    pub fn with_staging(mut self, staging: RawStaging) -> Self {
        self.staging = Some(staging);
        self
    }

    pub fn with_settings(mut self, settings: RunSettings) -> Self {
        self.settings = settings;
        self
    }

    async fn records(&self, table: &TableConfig) -> Result<Vec<Record>, ReplicationError> {
        if !self.settings.extract {
            let Some(staging) = &self.staging else {
                return Err(ReplicationError::Staging(
                    "extraction disabled and no staging directory configured".into(),
                ));
            };
            let records = staging.read(table).await?;
            info!(records = records.len(), "Loaded staged records");
            return Ok(records);
        }

        let window = self.tracker.window(table, Utc::now());
        let extractor = self.factory.extractor(table, &window)?;
        let records = extractor.extract().await?;

        let failed = records.iter().filter(|r| !r.success).count();
        info!(records = records.len(), failed, full = window.is_full(), "Extraction finished");

        if let Some(staging) = &self.staging {
            staging.write(table, &records).await?;
        }
        Ok(records)
    }
}

#[async_trait]
impl TableProcessor for ReplicationStep {
    async fn process(&self, table: &TableConfig) -> Result<LoadResult, ReplicationError> {
        if let Err(err) = self.tracker.record_attempt(table, Utc::now()).await {
            warn!(error = %err, "Could not record sync attempt");
        }

        let records = self.records(table).await?;

        if !self.settings.load {
            info!("Load disabled, skipping");
            return Ok(LoadResult::written(0, self.loader.options().mode));
        }

        let result = self.loader.load(&table.landing_table(), &records).await?;

        if let Err(err) = self.tracker.record_success(table, Utc::now()).await {
            warn!(error = %err, "Could not record sync success");
        }
        Ok(result)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableOutcome {
    pub origin: String,
    pub source_name: String,
    pub target: String,
    pub status: TableStatus,
    pub rows_written: usize,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl TableOutcome {
    pub fn is_success(&self) -> bool {
        self.status == TableStatus::Succeeded
    }
}

/// Wraps a processor so a failing table is logged, reported and turned
/// into an outcome instead of an error.
pub struct Isolated<P> {
    inner: P,
    notifier: Arc<dyn Notifier>,
    pipeline: String,
}

impl<P: TableProcessor> Isolated<P> {
    pub fn new(inner: P, notifier: Arc<dyn Notifier>, pipeline: impl Into<String>) -> Self {
        Self {
            inner,
            notifier,
            pipeline: pipeline.into(),
        }
    }

    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub async fn run(&self, table: &TableConfig) -> TableOutcome {
        let started = Instant::now();
        let result = self.inner.process(table).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let mut outcome = TableOutcome {
            origin: table.origin.to_string(),
            source_name: table.source_name.clone(),
            target: table.landing_table().to_string(),
            status: TableStatus::Succeeded,
            rows_written: 0,
            error: None,
            elapsed_ms,
        };

        match result {
            Ok(load) => {
                info!(rows = load.rows_written, elapsed_ms, "Table replicated");
                outcome.rows_written = load.rows_written;
            }
            Err(err) => {
                error!(error = %err, "Error replicating table");
                let message = err.to_string();
                self.notifier
                    .table_failed(&self.pipeline, table, &message)
                    .await;
                outcome.status = TableStatus::Failed;
                outcome.error = Some(message);
            }
        }
        outcome
    }
}
