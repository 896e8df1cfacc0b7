use crate::error::CliError;
use engine_runtime::execution::orchestrator::RunSummary;
use model::config::table::TableConfig;
use serde::Serialize;
use std::path::Path;

/// JSON document printed at the end of `run`.
#[derive(Debug, Serialize)]
pub struct RunReport {
    #[serde(flatten)]
    pub summary: RunSummary,
    pub transformed: bool,
    pub transform_error: Option<String>,
}

fn report_json(report: &RunReport) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub async fn write_report(report: &RunReport, path: &Path) -> Result<(), CliError> {
    tokio::fs::write(path, report_json(report)?).await?;
    Ok(())
}

pub fn print_report(report: &RunReport) -> Result<(), CliError> {
    println!("{}", report_json(report)?);
    Ok(())
}

pub fn print_tables(tables: &[TableConfig], as_json: bool) -> Result<(), CliError> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(tables)?);
        return Ok(());
    }

    println!(
        "{:<28} {:<24} {:<8} {:<7} {:<6} {:<26} {}",
        "Source", "Target", "Strategy", "Active", "Days", "Last attempt", "Last success"
    );
    for table in tables {
        println!(
            "{:<28} {:<24} {:<8} {:<7} {:<6} {:<26} {}",
            table.source_name,
            table.target_name,
            table.extraction_strategy.as_str(),
            table.active,
            table.days_interval,
            timestamp(table.sync.last_sync_attempt_at),
            timestamp(table.sync.last_successful_sync_at),
        );
    }
    Ok(())
}

fn timestamp(at: Option<chrono::DateTime<chrono::Utc>>) -> String {
    at.map(|ts| ts.to_rfc3339())
        .unwrap_or_else(|| "n/a".to_string())
}
