#[cfg(test)]
mod tests {
    use crate::utils::{
        Fixture, crm_table, csv_page, fast_retry, script_crm_deals, workspace_page,
    };
    use connectors::{api::base::transport::Method, sql::base::adapter::WarehouseAdapter};
    use engine_core::{
        loader::WarehouseLoader, schema::resolver::SchemaResolver, state::tracker::SyncTracker,
    };
    use engine_runtime::execution::processor::TableStatus;
    use model::{
        config::table::{ExtractionStrategy, Origin, TableConfig},
        error::ConfigError,
        load::{LoadMode, LoadOptions},
    };
    use serde_json::json;
    use std::sync::Arc;
    use tracing_test::traced_test;

    fn deals() -> TableConfig {
        crm_table("crm.deal", "deals", ExtractionStrategy::Table)
    }

    #[traced_test]
    #[tokio::test]
    async fn tc01() {
        // Detail failures become failed records, the table itself succeeds.
        let fixture = Fixture::new(vec![deals()]);
        script_crm_deals(&fixture.transport);

        let summary = fixture.run(fixture.crm(), LoadMode::Replace).await;

        assert_eq!((summary.total, summary.success), (1, 1));
        let rows = fixture.warehouse.rows(&deals().landing_table());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.iter().filter(|r| r.success).count(), 2);

        let failed = rows.iter().find(|r| !r.success).unwrap();
        assert_eq!(failed.id, "3");
        let content = failed.content_json().unwrap();
        assert_eq!(content["ERROR"], "HTTP 500");
        assert_eq!(content["STATUS_CODE"], 500);
        assert!(content["URL"].as_str().unwrap().contains("crm.deal.get.json"));

        let synced = fixture.synced(Origin::Crm, "crm.deal");
        assert!(synced.sync.last_successful_sync_at.is_some());
        assert!(fixture.warehouse.has_schema("crm"));
    }

    #[traced_test]
    #[tokio::test]
    async fn tc02() {
        // Replace is idempotent across runs, append accumulates.
        let fixture = Fixture::new(vec![deals()]);
        script_crm_deals(&fixture.transport);
        let landing = deals().landing_table();

        fixture.run(fixture.crm(), LoadMode::Replace).await;
        fixture.run(fixture.crm(), LoadMode::Replace).await;
        assert_eq!(fixture.warehouse.rows(&landing).len(), 3);
        assert_eq!(fixture.warehouse.truncates(), 2);

        fixture.run(fixture.crm(), LoadMode::Append).await;
        fixture.run(fixture.crm(), LoadMode::Append).await;
        assert_eq!(fixture.warehouse.rows(&landing).len(), 9);
    }

    #[traced_test]
    #[tokio::test]
    async fn tc03() {
        // Creating an existing table is a warning, not an error.
        let fixture = Fixture::new(vec![]);
        let landing = deals().landing_table();
        let loader = fixture.loader(LoadMode::Replace);

        loader.create_schema("crm").await.unwrap();
        loader.create_table(&landing).await.unwrap();
        loader.create_table(&landing).await.unwrap();

        assert!(logs_contain("already exists"));
        assert!(fixture.warehouse.table_exists(&landing).await.unwrap());
    }

    #[traced_test]
    #[tokio::test]
    async fn tc04() {
        // One failing table does not stop the others.
        let leads = crm_table("crm.lead", "leads", ExtractionStrategy::FlatList);
        let contacts = crm_table("crm.contact", "contacts", ExtractionStrategy::FlatList);
        let fixture = Fixture::new(vec![deals(), leads.clone(), contacts.clone()]);
        script_crm_deals(&fixture.transport);
        fixture
            .transport
            .route_json("crm.lead.list.json", 401, json!({"error": "expired_token"}));
        fixture.transport.route_json(
            "crm.contact.list.json",
            200,
            json!({"result": [{"ID": "7", "NAME": "Ann"}]}),
        );

        let summary = fixture.run(fixture.crm(), LoadMode::Replace).await;

        assert_eq!((summary.total, summary.success), (3, 2));
        assert_eq!(summary.tables[1].status, TableStatus::Failed);
        assert!(summary.tables[1].error.as_deref().unwrap().contains("401"));
        assert_eq!(fixture.warehouse.rows(&contacts.landing_table()).len(), 1);
        assert!(fixture.warehouse.rows(&leads.landing_table()).is_empty());

        assert!(
            fixture
                .synced(Origin::Crm, "crm.lead")
                .sync
                .last_successful_sync_at
                .is_none()
        );
        assert!(
            fixture
                .synced(Origin::Crm, "crm.contact")
                .sync
                .last_successful_sync_at
                .is_some()
        );
        assert_eq!(
            fixture.notifier.messages(),
            vec!["start:crm_pipeline", "failed:crm.lead", "finished:2/3"]
        );
        assert!(logs_contain("Error replicating table"));
    }

    #[traced_test]
    #[tokio::test]
    async fn tc05() {
        // A dropped connection during insert is reissued once after reconnecting.
        let fixture = Fixture::new(vec![deals()]);
        script_crm_deals(&fixture.transport);
        fixture.warehouse.drop_connection_on_insert(1);

        let summary = fixture.run(fixture.crm(), LoadMode::Replace).await;

        assert_eq!(summary.success, 1);
        assert_eq!(fixture.warehouse.reconnects(), 1);
        assert_eq!(fixture.warehouse.rows(&deals().landing_table()).len(), 3);
    }

    #[traced_test]
    #[tokio::test]
    async fn tc06() {
        // A second drop is fatal for the table.
        let fixture = Fixture::new(vec![deals()]);
        script_crm_deals(&fixture.transport);
        fixture.warehouse.drop_connection_on_insert(2);

        let summary = fixture.run(fixture.crm(), LoadMode::Replace).await;

        assert_eq!((summary.total, summary.success), (1, 0));
        assert!(
            fixture
                .synced(Origin::Crm, "crm.deal")
                .sync
                .last_successful_sync_at
                .is_none()
        );
    }

    #[traced_test]
    #[tokio::test]
    async fn tc07() {
        // Gateway pages by LIMIT/OFFSET until a short page.
        let orders = TableConfig::new(Origin::Gateway, "orders", "orders", "orders")
            .with_window(7, "updated_at");
        let fixture = Fixture::new(vec![orders.clone()]);
        fixture.transport.push_bytes(
            200,
            csv_page(&[("10", "2024-05-01"), ("11", "2024-05-02")]),
        );
        fixture.transport.push_bytes(200, csv_page(&[("12", "")]));

        let summary = fixture.run(fixture.gateway(2), LoadMode::Replace).await;

        assert_eq!(summary.success, 1);
        let rows = fixture.warehouse.rows(&orders.landing_table());
        let ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["10", "11", "12"]);
        assert_eq!(rows[2].content_json().unwrap()["updated_at"], json!(null));

        let requests = fixture.transport.requests();
        assert_eq!(requests.len(), 2);
        let query = requests[1].body.as_ref().unwrap()["query"].as_str().unwrap().to_string();
        assert!(query.starts_with(r#"select * from (select * from "orders" order by 1 asc) as src where "updated_at" >= '"#));
        assert!(query.ends_with("LIMIT 2 OFFSET 2"));
    }

    #[traced_test]
    #[tokio::test]
    async fn tc08() {
        // Workspace follows next_cursor and filters on the edit timestamp.
        let tasks = TableConfig::new(Origin::Workspace, "tasks", "db-123", "tasks")
            .with_window(3, "last_edited_time");
        let fixture = Fixture::new(vec![tasks.clone()]);
        fixture
            .transport
            .push_json(200, workspace_page(&["p1", "p2"], Some("cursor-2")));
        fixture.transport.push_json(200, workspace_page(&["p3"], None));

        let summary = fixture.run(fixture.workspace(), LoadMode::Replace).await;

        assert_eq!(summary.success, 1);
        let ids: Vec<_> = fixture
            .warehouse
            .rows(&tasks.landing_table())
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);

        let requests = fixture.transport.requests();
        assert_eq!(requests[0].method, Method::Post);
        assert!(requests[0].url.ends_with("/databases/db-123/query"));
        let second = requests[1].body.as_ref().unwrap();
        assert_eq!(second["start_cursor"], "cursor-2");
        assert_eq!(second["filter"]["timestamp"], "last_edited_time");
        assert!(second["filter"]["last_edited_time"]["on_or_after"].is_string());
    }

    #[traced_test]
    #[tokio::test]
    async fn tc09() {
        // Enumerations and field dictionaries land one record per element.
        let statuses = crm_table("crm.status.list", "statuses", ExtractionStrategy::Enumeration);
        let fields = crm_table("crm.deal.fields", "deal_fields", ExtractionStrategy::FieldDictionary);
        let fixture = Fixture::new(vec![statuses.clone(), fields.clone()]);
        fixture.transport.route_json(
            "crm.status.list",
            200,
            json!({"result": [{"ID": "1", "STATUS_ID": "NEW"}, {"ID": "2", "STATUS_ID": "WON"}]}),
        );
        fixture.transport.route_json(
            "crm.deal.fields",
            200,
            json!({"result": {"TITLE": {"type": "string"}, "OPPORTUNITY": {"type": "double"}}}),
        );

        let summary = fixture.run(fixture.crm(), LoadMode::Replace).await;

        assert_eq!(summary.success, 2);
        assert_eq!(fixture.warehouse.rows(&statuses.landing_table()).len(), 2);
        let mut field_ids: Vec<_> = fixture
            .warehouse
            .rows(&fields.landing_table())
            .into_iter()
            .map(|r| r.id)
            .collect();
        field_ids.sort();
        assert_eq!(field_ids, vec!["OPPORTUNITY", "TITLE"]);
    }

    #[tokio::test]
    async fn tc10() {
        // Table selection: inactive tables are skipped, unknown names abort.
        let mut archived = crm_table("crm.quote", "quotes", ExtractionStrategy::FlatList);
        archived.active = false;
        let fixture = Fixture::new(vec![deals(), archived]);
        let catalog = fixture.tracker().catalog(Origin::Crm).await.unwrap();

        let all = catalog.select(None).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(catalog.select(Some("quotes")).unwrap().len(), 1);
        assert_eq!(
            catalog.select(Some("crm.invoice")).unwrap_err(),
            ConfigError::UnknownTable("crm.invoice".into())
        );
    }

    #[tokio::test]
    async fn tc11() {
        // An existing landing table needs no DDL, even without a schema source.
        let fixture = Fixture::new(vec![]);
        let landing = deals().landing_table();
        fixture.warehouse.seed_table(&landing);
        let loader = WarehouseLoader::new(
            Arc::new(fixture.warehouse.clone()),
            SchemaResolver::Unconfigured,
            LoadOptions::default(),
        );
        let records = vec![model::records::record::Record::success("1", &json!({}))];

        let result = loader.load(&landing, &records).await.unwrap();

        assert_eq!(result.rows_written, 1);
        assert!(fixture.warehouse.ddl().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn tc12() {
        // Sync-state writes survive a transient metadata outage.
        let fixture = Fixture::new(vec![deals()]);
        fixture.store.fail_updates(3);
        let tracker = SyncTracker::new(Arc::new(fixture.store.clone())).with_retry(fast_retry(5));

        tracker.record_attempt(&deals(), chrono::Utc::now()).await.unwrap();

        assert_eq!(fixture.store.failed_updates(), 3);
        assert!(fixture.store.reconnects() >= 1);
        assert!(
            fixture
                .synced(Origin::Crm, "crm.deal")
                .sync
                .last_sync_attempt_at
                .is_some()
        );
    }
}
