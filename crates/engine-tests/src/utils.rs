#![allow(dead_code)]

use async_trait::async_trait;
use connectors::{
    api::{
        base::scripted::ScriptedTransport,
        crm::source::CrmConnector,
        gateway::source::{GatewayConnector, GatewayOptions},
        workspace::source::WorkspaceConnector,
    },
    sql::memory::MemoryWarehouse,
};
use engine_core::{
    loader::WarehouseLoader,
    retry::RetryPolicy,
    schema::resolver::SchemaResolver,
    state::{memory::MemorySyncStore, tracker::SyncTracker},
};
use engine_runtime::{
    execution::{
        factory::SourceConnector,
        orchestrator::{RunSummary, StreamOrchestrator},
        processor::{Isolated, ReplicationStep},
    },
    notify::Notifier,
};
use model::{
    config::table::{ExtractionStrategy, Origin, TableConfig},
    load::{LoadMode, LoadOptions},
};
use serde_json::{Value, json};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

pub const CRM_HOST: &str = "example.crm.test";
pub const GATEWAY_URL: &str = "https://bi.example.test/api/query";
pub const WORKSPACE_URL: &str = "https://workspace.example.test/v1";

/// Collects every notification as a short tag.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn pipeline_started(&self, pipeline: &str) {
        self.messages.lock().unwrap().push(format!("start:{pipeline}"));
    }

    async fn table_failed(&self, _pipeline: &str, table: &TableConfig, _error: &str) {
        self.messages
            .lock()
            .unwrap()
            .push(format!("failed:{}", table.source_name));
    }

    async fn pipeline_finished(&self, summary: &RunSummary) {
        self.messages
            .lock()
            .unwrap()
            .push(format!("finished:{}/{}", summary.success, summary.total));
    }
}

/// Scripted vendor, in-memory warehouse and metadata store wired together.
pub struct Fixture {
    pub transport: ScriptedTransport,
    pub warehouse: MemoryWarehouse,
    pub store: MemorySyncStore,
    pub notifier: Arc<RecordingNotifier>,
}

impl Fixture {
    pub fn new(tables: Vec<TableConfig>) -> Self {
        Self {
            transport: ScriptedTransport::new(),
            warehouse: MemoryWarehouse::new(),
            store: MemorySyncStore::new(tables),
            notifier: Arc::new(RecordingNotifier::default()),
        }
    }

    pub fn crm(&self) -> SourceConnector {
        let connector = CrmConnector::new(Arc::new(self.transport.clone()), CRM_HOST, "1", "secret")
            .expect("crm connector");
        SourceConnector::Crm(connector)
    }

    pub fn gateway(&self, page_size: usize) -> SourceConnector {
        let options = GatewayOptions {
            page_size,
            ..GatewayOptions::default()
        };
        let connector =
            GatewayConnector::new(Arc::new(self.transport.clone()), GATEWAY_URL, "secret", options)
                .expect("gateway connector");
        SourceConnector::Gateway(connector)
    }

    pub fn workspace(&self) -> SourceConnector {
        let connector = WorkspaceConnector::new(Arc::new(self.transport.clone()), "secret")
            .expect("workspace connector")
            .with_base_url(WORKSPACE_URL);
        SourceConnector::Workspace(connector)
    }

    pub fn loader(&self, mode: LoadMode) -> WarehouseLoader {
        let options = LoadOptions::new(mode, 2).expect("load options");
        WarehouseLoader::new(
            Arc::new(self.warehouse.clone()),
            SchemaResolver::default(),
            options,
        )
        .with_retry(fast_retry(2))
    }

    pub fn tracker(&self) -> SyncTracker {
        SyncTracker::new(Arc::new(self.store.clone())).with_retry(fast_retry(5))
    }

    /// Runs every active table of `origin` through the full pipeline.
    pub async fn run(&self, connector: SourceConnector, mode: LoadMode) -> RunSummary {
        let origin = connector.origin();
        let tracker = self.tracker();
        let tables = tracker
            .catalog(origin)
            .await
            .expect("catalog")
            .select(None)
            .expect("tables");

        let step = ReplicationStep::new(Arc::new(connector), self.loader(mode), tracker);
        let processor = Isolated::new(step, self.notifier.clone(), format!("{origin}_pipeline"));
        StreamOrchestrator::new(processor).run(&tables).await
    }

    pub fn synced(&self, origin: Origin, source_name: &str) -> TableConfig {
        self.store.table(origin, source_name).expect("table in store")
    }
}

pub fn fast_retry(attempts: usize) -> RetryPolicy {
    RetryPolicy::new(attempts, Duration::from_millis(1), Duration::from_millis(5))
}

pub fn crm_table(identifier: &str, target: &str, strategy: ExtractionStrategy) -> TableConfig {
    TableConfig::new(Origin::Crm, identifier, identifier, target).with_strategy(strategy)
}

/// Scripts `crm.deal` with ids 1..=3, where the detail of 3 answers HTTP 500.
pub fn script_crm_deals(transport: &ScriptedTransport) {
    transport.route_json(
        "crm.deal.list.json",
        200,
        json!({"result": [{"ID": "1"}, {"ID": "2"}, {"ID": "3"}], "total": 3}),
    );
    transport.route_json("ID=1", 200, json!({"result": {"ID": "1", "TITLE": "first"}}));
    transport.route_json("ID=2", 200, json!({"result": {"ID": "2", "TITLE": "second"}}));
    transport.route_json("ID=3", 500, json!({"error": "internal"}));
}

pub fn csv_page(rows: &[(&str, &str)]) -> Vec<u8> {
    let mut text = String::from("id;updated_at\r\n");
    for (id, updated) in rows {
        text.push_str(&format!("{id};{updated}\r\n"));
    }
    text.into_bytes()
}

pub fn workspace_page(ids: &[&str], next: Option<&str>) -> Value {
    let results: Vec<Value> = ids
        .iter()
        .map(|id| json!({"object": "page", "id": id, "properties": {}}))
        .collect();
    json!({
        "object": "list",
        "results": results,
        "has_more": next.is_some(),
        "next_cursor": next,
    })
}
