#[cfg(test)]
mod tests {
    use crate::{
        error::ReplicationError,
        execution::{
            factory::SourceConnector,
            processor::{ReplicationStep, TableProcessor},
            settings::RunSettings,
            staging::RawStaging,
        },
    };
    use connectors::{
        api::{base::scripted::ScriptedTransport, crm::source::CrmConnector},
        sql::memory::MemoryWarehouse,
    };
    use engine_core::{
        loader::WarehouseLoader,
        schema::resolver::SchemaResolver,
        state::{memory::MemorySyncStore, tracker::SyncTracker},
    };
    use model::{
        config::table::{ExtractionStrategy, Origin, TableConfig},
        load::LoadOptions,
    };
    use serde_json::json;
    use std::sync::Arc;

    struct Harness {
        transport: ScriptedTransport,
        warehouse: MemoryWarehouse,
        store: MemorySyncStore,
        table: TableConfig,
    }

    impl Harness {
        fn new() -> Self {
            let table = TableConfig::new(Origin::Crm, "crm.deal", "crm.deal", "deals")
                .with_strategy(ExtractionStrategy::Table);
            Self {
                transport: ScriptedTransport::new(),
                warehouse: MemoryWarehouse::new(),
                store: MemorySyncStore::new(vec![table.clone()]),
                table,
            }
        }

        fn step(&self) -> ReplicationStep {
            let connector = CrmConnector::new(
                Arc::new(self.transport.clone()),
                "example.crm.test",
                "1",
                "secret",
            )
            .unwrap();
            let loader = WarehouseLoader::new(
                Arc::new(self.warehouse.clone()),
                SchemaResolver::default(),
                LoadOptions::default(),
            );
            let tracker = SyncTracker::new(Arc::new(self.store.clone()));
            ReplicationStep::new(Arc::new(SourceConnector::Crm(connector)), loader, tracker)
        }

        fn script_deals(&self) {
            self.transport.route_json(
                "crm.deal.list.json",
                200,
                json!({"result": [{"ID": "1"}, {"ID": "2"}]}),
            );
            self.transport
                .route_json("ID=1", 200, json!({"result": {"ID": "1", "TITLE": "a"}}));
            self.transport
                .route_json("ID=2", 200, json!({"result": {"ID": "2", "TITLE": "b"}}));
        }

        fn synced(&self) -> TableConfig {
            self.store.table(Origin::Crm, "crm.deal").unwrap()
        }
    }

    #[tokio::test]
    async fn successful_run_records_attempt_and_success() {
        let harness = Harness::new();
        harness.script_deals();

        let result = harness.step().process(&harness.table).await.unwrap();

        assert_eq!(result.rows_written, 2);
        let rows = harness.warehouse.rows(&harness.table.landing_table());
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.success));

        let synced = harness.synced();
        assert!(synced.sync.last_sync_attempt_at.is_some());
        assert!(synced.sync.last_successful_sync_at.is_some());
    }

    #[tokio::test]
    async fn failed_extraction_keeps_previous_success_timestamp() {
        let harness = Harness::new();
        harness
            .transport
            .route_json("crm.deal.list.json", 401, json!({"error": "expired_token"}));

        let err = harness.step().process(&harness.table).await.unwrap_err();

        assert!(matches!(err, ReplicationError::Extract(_)));
        let synced = harness.synced();
        assert!(synced.sync.last_sync_attempt_at.is_some());
        assert!(synced.sync.last_successful_sync_at.is_none());
        assert!(harness.warehouse.rows(&harness.table.landing_table()).is_empty());
    }

    #[tokio::test]
    async fn failed_load_is_not_recorded_as_success() {
        let harness = Harness::new();
        harness.script_deals();
        harness.warehouse.fail_inserts(1);

        let err = harness.step().process(&harness.table).await.unwrap_err();

        assert!(matches!(err, ReplicationError::Load(_)));
        assert!(harness.synced().sync.last_successful_sync_at.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn sync_state_outage_does_not_fail_the_table() {
        let harness = Harness::new();
        harness.script_deals();
        // Exhausts all five attempts of the attempt write.
        harness.store.fail_updates(5);

        let result = harness.step().process(&harness.table).await.unwrap();

        assert_eq!(result.rows_written, 2);
        let synced = harness.synced();
        assert!(synced.sync.last_sync_attempt_at.is_none());
        assert!(synced.sync.last_successful_sync_at.is_some());
        assert!(harness.store.reconnects() > 0);
    }

    #[tokio::test]
    async fn extract_only_stages_and_skips_success() {
        let dir = tempfile::tempdir().unwrap();
        let harness = Harness::new();
        harness.script_deals();

        let step = harness
            .step()
            .with_staging(RawStaging::new(dir.path()))
            .with_settings(RunSettings {
                extract: true,
                load: false,
            });
        let result = step.process(&harness.table).await.unwrap();

        assert_eq!(result.rows_written, 0);
        assert!(harness.warehouse.rows(&harness.table.landing_table()).is_empty());
        assert!(harness.synced().sync.last_successful_sync_at.is_none());
        assert!(dir.path().join("crm").join("crm.deal.jsonl").exists());
    }

    #[tokio::test]
    async fn load_only_reads_staged_records() {
        let dir = tempfile::tempdir().unwrap();
        let harness = Harness::new();
        harness.script_deals();

        harness
            .step()
            .with_staging(RawStaging::new(dir.path()))
            .with_settings(RunSettings {
                extract: true,
                load: false,
            })
            .process(&harness.table)
            .await
            .unwrap();
        let requests = harness.transport.requests().len();

        let result = harness
            .step()
            .with_staging(RawStaging::new(dir.path()))
            .with_settings(RunSettings {
                extract: false,
                load: true,
            })
            .process(&harness.table)
            .await
            .unwrap();

        assert_eq!(result.rows_written, 2);
        assert_eq!(harness.transport.requests().len(), requests);
        assert!(harness.synced().sync.last_successful_sync_at.is_some());
    }

    #[tokio::test]
    async fn load_only_without_staging_fails() {
        let harness = Harness::new();
        let err = harness
            .step()
            .with_settings(RunSettings {
                extract: false,
                load: true,
            })
            .process(&harness.table)
            .await
            .unwrap_err();
        assert!(matches!(err, ReplicationError::Staging(_)));
    }
}
