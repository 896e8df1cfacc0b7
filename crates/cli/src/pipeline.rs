use crate::{
    commands::RunArgs,
    env::{self, EnvManager},
    error::CliError,
    notify::WebhookNotifier,
    output::RunReport,
    transform::{TransformRunner, model_selector},
};
use connectors::{
    api::{
        base::transport::{HttpTransport, ReqwestTransport},
        crm::source::CrmConnector,
        gateway::source::{GatewayConnector, GatewayOptions},
        workspace::source::WorkspaceConnector,
    },
    sql::{base::adapter::WarehouseAdapter, postgres::adapter::PgAdapter},
};
use engine_core::{
    loader::WarehouseLoader,
    schema::resolver::SchemaResolver,
    state::{pg_store::PgSyncStore, tracker::SyncTracker},
};
use engine_runtime::{
    execution::{
        factory::SourceConnector,
        orchestrator::StreamOrchestrator,
        processor::{Isolated, ReplicationStep},
        settings::RunSettings,
        staging::RawStaging,
    },
    notify::{LogNotifier, Notifier},
};
use model::{
    config::table::{Origin, TableConfig},
    load::LoadOptions,
};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

pub async fn run(args: &RunArgs, cancel: CancellationToken) -> Result<RunReport, CliError> {
    let env = EnvManager::load(args.env_file.as_deref())?;
    for key in [env::WAREHOUSE_URL, env::METADATA_URL, env::NOTIFY_WEBHOOK_URL] {
        debug!(var = %env.describe(key), "Environment");
    }

    let tracker = SyncTracker::new(Arc::new(metadata_store(&env).await?));
    let catalog = tracker.catalog(args.origin).await?;
    let tables = catalog.select(args.selected_table())?;
    info!(origin = %args.origin, tables = tables.len(), "Tables selected");

    let connector = source_connector(args, &env)?;
    let warehouse = Arc::new(PgAdapter::connect(env.require(env::WAREHOUSE_URL)?).await?);
    let resolver = match &args.schema_file {
        Some(path) => SchemaResolver::from_file(args.schema_kind, path)?,
        None => SchemaResolver::default(),
    };
    let loader = WarehouseLoader::new(
        warehouse,
        resolver,
        LoadOptions::new(args.mode, args.chunk_size)?,
    );

    let mut step = ReplicationStep::new(Arc::new(connector), loader, tracker).with_settings(
        RunSettings {
            extract: args.extract,
            load: args.load,
        },
    );
    if let Some(dir) = &args.staging_dir {
        step = step.with_staging(RawStaging::new(dir));
    }

    let pipeline = format!("{}_pipeline", args.origin);
    let processor = Isolated::new(step, notifier(args, &env)?, pipeline);
    let summary = StreamOrchestrator::new(processor)
        .with_cancellation(cancel)
        .run(&tables)
        .await;

    let mut report = RunReport {
        summary,
        transformed: false,
        transform_error: None,
    };
    if args.transform && !report.summary.cancelled {
        let project_dir = env.require(env::TRANSFORM_PROJECT_DIR)?;
        let single = args.selected_table().and_then(|_| tables.first());
        let models = model_selector(args.origin, single);
        match TransformRunner::new(project_dir).run(args.origin, &models).await {
            Ok(()) => report.transformed = true,
            Err(err) => {
                error!(error = %err, "Transformation step failed");
                report.transform_error = Some(err.to_string());
            }
        }
    }
    Ok(report)
}

pub async fn tables(origin: Origin, env: &EnvManager) -> Result<Vec<TableConfig>, CliError> {
    let tracker = SyncTracker::new(Arc::new(metadata_store(env).await?));
    let catalog = tracker.catalog(origin).await?;
    Ok(catalog.all().to_vec())
}

pub async fn test_connection(conn_str: &str) -> Result<(), CliError> {
    info!("Pinging Postgres");
    let adapter = PgAdapter::connect(conn_str).await.map_err(|err| {
        error!(error = %err, "Postgres connection failed");
        err
    })?;
    adapter.ping().await?;
    info!("Postgres ping succeeded");
    Ok(())
}

/// The metadata table lives in the warehouse unless `METADATA_URL` says otherwise.
async fn metadata_store(env: &EnvManager) -> Result<PgSyncStore, CliError> {
    let url = match env.get(env::METADATA_URL) {
        Some(url) => url,
        None => env.require(env::WAREHOUSE_URL)?,
    };
    Ok(PgSyncStore::connect(url).await?)
}

fn source_connector(args: &RunArgs, env: &EnvManager) -> Result<SourceConnector, CliError> {
    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(HTTP_TIMEOUT)?);
    let credential = |key: (&'static str, &'static str)| env.credential(key).unwrap_or_default();

    let connector = match args.origin {
        Origin::Workspace => SourceConnector::Workspace(WorkspaceConnector::new(
            transport,
            credential(env::WORKSPACE_TOKEN),
        )?),
        Origin::Gateway => {
            let options = GatewayOptions {
                page_size: args.page_size,
                ..GatewayOptions::default()
            };
            SourceConnector::Gateway(GatewayConnector::new(
                transport,
                credential(env::GATEWAY_URL),
                credential(env::GATEWAY_TOKEN),
                options,
            )?)
        }
        Origin::Crm => SourceConnector::Crm(CrmConnector::new(
            transport,
            credential(env::CRM_URL),
            credential(env::CRM_USER_ID),
            credential(env::CRM_TOKEN),
        )?),
    };
    Ok(connector)
}

fn notifier(args: &RunArgs, env: &EnvManager) -> Result<Arc<dyn Notifier>, CliError> {
    if args.silent {
        return Ok(Arc::new(LogNotifier));
    }
    match env.get(env::NOTIFY_WEBHOOK_URL) {
        Some(url) => {
            let webhook = WebhookNotifier::new(url)
                .map_err(|err| CliError::Config(format!("invalid webhook client: {err}")))?;
            Ok(Arc::new(webhook))
        }
        None => {
            warn!("NOTIFY_WEBHOOK_URL is not set, notifications are logged only");
            Ok(Arc::new(LogNotifier))
        }
    }
}
