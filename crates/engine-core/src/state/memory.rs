use crate::{error::MetadataError, state::SyncStateStore};
use async_trait::async_trait;
use connectors::sql::base::error::DbError;
use model::{
    config::table::{Origin, TableConfig},
    sync::state::SyncUpdate,
};
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory metadata table with injectable write failures.
#[derive(Clone, Default)]
pub struct MemorySyncStore {
    inner: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    tables: Vec<TableConfig>,
    failing_updates: usize,
    failed_updates: usize,
    reconnects: usize,
    updates: Vec<(Origin, String, SyncUpdate)>,
}

impl MemorySyncStore {
    pub fn new(tables: Vec<TableConfig>) -> Self {
        let store = Self::default();
        store.lock().tables = tables;
        store
    }

    /// The next `count` updates fail with a lost connection.
    pub fn fail_updates(&self, count: usize) {
        self.lock().failing_updates = count;
    }

    pub fn table(&self, origin: Origin, source_name: &str) -> Option<TableConfig> {
        self.lock()
            .tables
            .iter()
            .find(|t| t.origin == origin && t.source_name == source_name)
            .cloned()
    }

    pub fn updates(&self) -> Vec<(Origin, String, SyncUpdate)> {
        self.lock().updates.clone()
    }

    pub fn failed_updates(&self) -> usize {
        self.lock().failed_updates
    }

    pub fn reconnects(&self) -> usize {
        self.lock().reconnects
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl SyncStateStore for MemorySyncStore {
    async fn load_tables(&self, origin: Origin) -> Result<Vec<TableConfig>, MetadataError> {
        Ok(self
            .lock()
            .tables
            .iter()
            .filter(|t| t.origin == origin)
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        origin: Origin,
        source_name: &str,
        update: &SyncUpdate,
    ) -> Result<(), DbError> {
        let mut state = self.lock();
        if state.failing_updates > 0 {
            state.failing_updates -= 1;
            state.failed_updates += 1;
            return Err(DbError::ConnectionLost("terminating connection".into()));
        }

        state
            .updates
            .push((origin, source_name.to_string(), update.clone()));
        if let Some(table) = state
            .tables
            .iter_mut()
            .find(|t| t.origin == origin && t.source_name == source_name)
        {
            if let Some(active) = update.active {
                table.active = active;
            }
            table.sync.apply(update);
        }
        Ok(())
    }

    async fn reconnect(&self) -> Result<(), DbError> {
        self.lock().reconnects += 1;
        Ok(())
    }
}
