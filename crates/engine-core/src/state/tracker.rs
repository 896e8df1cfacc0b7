use crate::{
    error::{MetadataError, SyncStateWriteError},
    retry::{RetryError, RetryPolicy, classify_db_error},
    state::SyncStateStore,
};
use chrono::{DateTime, Utc};
use model::{
    config::{
        catalog::TableCatalog,
        table::{Origin, TableConfig},
    },
    sync::{state::SyncUpdate, window::ExtractionWindow},
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Consecutive failed writes after which the store connection is recreated.
const RECONNECT_AFTER_FAILURES: usize = 2;

/// Reads table configuration and records attempt/success timestamps.
#[derive(Clone)]
pub struct SyncTracker {
    store: Arc<dyn SyncStateStore>,
    retry: RetryPolicy,
}

impl SyncTracker {
    pub fn new(store: Arc<dyn SyncStateStore>) -> Self {
        Self {
            store,
            retry: RetryPolicy::for_sync_state(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn catalog(&self, origin: Origin) -> Result<TableCatalog, MetadataError> {
        let tables = self.store.load_tables(origin).await?;
        Ok(TableCatalog::new(tables)?)
    }

    pub fn window(&self, table: &TableConfig, now: DateTime<Utc>) -> ExtractionWindow {
        table.window(now)
    }

    pub async fn record_attempt(
        &self,
        table: &TableConfig,
        now: DateTime<Utc>,
    ) -> Result<(), SyncStateWriteError> {
        self.write(table, SyncUpdate::attempt(now)).await
    }

    /// Only call once both extraction and load succeeded.
    pub async fn record_success(
        &self,
        table: &TableConfig,
        now: DateTime<Utc>,
    ) -> Result<(), SyncStateWriteError> {
        self.write(table, SyncUpdate::success(now)).await
    }

    async fn write(&self, table: &TableConfig, update: SyncUpdate) -> Result<(), SyncStateWriteError> {
        let store = self.store.as_ref();
        let origin = table.origin;
        let source_name = table.source_name.as_str();
        let update = &update;

        let result = self
            .retry
            .run_attempts(
                move |attempt| async move {
                    if attempt > 0 {
                        warn!(%origin, source_name, attempt, "Retrying sync state write");
                    }
                    if attempt >= RECONNECT_AFTER_FAILURES {
                        store.reconnect().await?;
                    }
                    store.update(origin, source_name, update).await
                },
                classify_db_error,
            )
            .await;

        match result {
            Ok(()) => {
                debug!(%origin, source_name, ?update, "Sync state written");
                Ok(())
            }
            Err(err) => {
                let attempts = match &err {
                    RetryError::Fatal(_) => 1,
                    RetryError::AttemptsExceeded(_) => self.retry.max_attempts,
                };
                Err(SyncStateWriteError {
                    origin: origin.to_string(),
                    source_name: source_name.to_string(),
                    attempts,
                    source: err.into_inner(),
                })
            }
        }
    }
}
