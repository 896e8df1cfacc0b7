use crate::{
    commands::Commands,
    env::EnvManager,
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod env;
mod error;
mod notify;
mod output;
mod pipeline;
mod shutdown;
mod transform;

#[derive(Parser)]
#[command(name = "landing", version, about = "Replicates vendor APIs into warehouse landing tables")]
struct Cli {
    #[arg(long, global = true, help = "Debug-level logging")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logger
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let shutdown = ShutdownCoordinator::new(CancellationToken::new());
    shutdown.register_handlers();

    let code = match execute(cli.command, &shutdown).await {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "Command failed");
            ExitCode::GeneralError
        }
    };
    std::process::exit(code.as_i32());
}

async fn execute(command: Commands, shutdown: &ShutdownCoordinator) -> Result<ExitCode, CliError> {
    match command {
        Commands::Run(args) => {
            let report = pipeline::run(&args, shutdown.cancel_token()).await?;
            match &args.output {
                Some(path) => output::write_report(&report, path).await?,
                None => output::print_report(&report)?,
            }

            if shutdown.is_shutdown_requested() {
                return Ok(ExitCode::ShutdownRequested);
            }
            if report.summary.failed() > 0 || report.transform_error.is_some() {
                info!(failed = report.summary.failed(), "Run finished with failures");
                return Ok(ExitCode::TablesFailed);
            }
            Ok(ExitCode::Success)
        }
        Commands::Tables {
            origin,
            json,
            env_file,
        } => {
            let env = EnvManager::load(env_file.as_deref())?;
            let tables = pipeline::tables(origin, &env).await?;
            output::print_tables(&tables, json)?;
            Ok(ExitCode::Success)
        }
        Commands::TestConn { conn_str } => {
            pipeline::test_connection(&conn_str).await?;
            Ok(ExitCode::Success)
        }
    }
}
