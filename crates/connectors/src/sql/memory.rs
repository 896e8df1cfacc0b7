use crate::sql::base::{adapter::WarehouseAdapter, error::DbError};
use async_trait::async_trait;
use model::{core::identifiers::LandingTable, records::record::Record};
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
};

/// In-memory warehouse with injectable connection drops.
#[derive(Clone, Default)]
pub struct MemoryWarehouse {
    inner: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    schemas: HashSet<String>,
    tables: HashMap<LandingTable, Vec<Record>>,
    ddl: Vec<String>,
    disconnected: bool,
    drops_on_insert: usize,
    failed_inserts: usize,
    reconnect_failures: usize,
    reconnects: usize,
    truncates: usize,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `count` inserts lose the connection before writing anything.
    pub fn drop_connection_on_insert(&self, count: usize) {
        self.lock().drops_on_insert = count;
    }

    /// The next `count` inserts fail with a non-connection SQL error.
    pub fn fail_inserts(&self, count: usize) {
        self.lock().failed_inserts = count;
    }

    pub fn fail_reconnects(&self, count: usize) {
        self.lock().reconnect_failures = count;
    }

    /// Registers a table without going through `create_table`, as if another
    /// process created it.
    pub fn seed_table(&self, table: &LandingTable) {
        let mut state = self.lock();
        state.schemas.insert(table.schema.clone());
        state.tables.entry(table.clone()).or_default();
    }

    pub fn rows(&self, table: &LandingTable) -> Vec<Record> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    pub fn has_schema(&self, schema: &str) -> bool {
        self.lock().schemas.contains(schema)
    }

    pub fn ddl(&self) -> Vec<String> {
        self.lock().ddl.clone()
    }

    pub fn reconnects(&self) -> usize {
        self.lock().reconnects
    }

    pub fn truncates(&self) -> usize {
        self.lock().truncates
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn connected(&self) -> Result<MutexGuard<'_, State>, DbError> {
        let state = self.lock();
        if state.disconnected {
            return Err(DbError::ConnectionLost("server closed the connection".into()));
        }
        Ok(state)
    }
}

#[async_trait]
impl WarehouseAdapter for MemoryWarehouse {
    async fn ping(&self) -> Result<(), DbError> {
        self.connected().map(|_| ())
    }

    async fn schema_exists(&self, schema: &str) -> Result<bool, DbError> {
        Ok(self.connected()?.schemas.contains(schema))
    }

    async fn create_schema(&self, schema: &str) -> Result<(), DbError> {
        let mut state = self.connected()?;
        if !state.schemas.insert(schema.to_string()) {
            return Err(DbError::AlreadyExists(format!("schema \"{schema}\" already exists")));
        }
        Ok(())
    }

    async fn table_exists(&self, table: &LandingTable) -> Result<bool, DbError> {
        Ok(self.connected()?.tables.contains_key(table))
    }

    async fn create_table(&self, table: &LandingTable, ddl: &str) -> Result<(), DbError> {
        let mut state = self.connected()?;
        if !state.schemas.contains(&table.schema) {
            return Err(DbError::Sql(format!("schema \"{}\" does not exist", table.schema)));
        }
        if state.tables.contains_key(table) {
            // Postgres only raises a notice for IF NOT EXISTS.
            if ddl.to_ascii_uppercase().contains("IF NOT EXISTS") {
                return Ok(());
            }
            return Err(DbError::AlreadyExists(format!("relation \"{table}\" already exists")));
        }
        state.ddl.push(ddl.to_string());
        state.tables.insert(table.clone(), Vec::new());
        Ok(())
    }

    async fn truncate_table(&self, table: &LandingTable) -> Result<(), DbError> {
        let mut state = self.connected()?;
        let Some(rows) = state.tables.get_mut(table) else {
            return Err(DbError::Sql(format!("relation \"{table}\" does not exist")));
        };
        rows.clear();
        state.truncates += 1;
        Ok(())
    }

    async fn insert_records(&self, table: &LandingTable, records: &[Record]) -> Result<u64, DbError> {
        let mut state = self.connected()?;
        if state.drops_on_insert > 0 {
            state.drops_on_insert -= 1;
            state.disconnected = true;
            return Err(DbError::ConnectionLost("connection reset by peer".into()));
        }
        if state.failed_inserts > 0 {
            state.failed_inserts -= 1;
            return Err(DbError::Sql("value too long for type character varying".into()));
        }
        let Some(rows) = state.tables.get_mut(table) else {
            return Err(DbError::Sql(format!("relation \"{table}\" does not exist")));
        };
        rows.extend_from_slice(records);
        Ok(records.len() as u64)
    }

    async fn row_count(&self, table: &LandingTable) -> Result<u64, DbError> {
        let state = self.connected()?;
        Ok(state.tables.get(table).map_or(0, |rows| rows.len() as u64))
    }

    async fn reconnect(&self) -> Result<(), DbError> {
        let mut state = self.lock();
        if state.reconnect_failures > 0 {
            state.reconnect_failures -= 1;
            return Err(DbError::ConnectionLost("could not connect to server".into()));
        }
        state.disconnected = false;
        state.reconnects += 1;
        Ok(())
    }
}
