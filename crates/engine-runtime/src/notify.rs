use crate::execution::orchestrator::RunSummary;
use async_trait::async_trait;
use model::config::table::TableConfig;
use tracing::info;

/// Receives run lifecycle messages. Delivery problems must never fail a run,
/// so implementations swallow (and log) their own errors.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn pipeline_started(&self, pipeline: &str);

    async fn table_failed(&self, pipeline: &str, table: &TableConfig, error: &str);

    async fn pipeline_finished(&self, summary: &RunSummary);
}

/// Logs the messages instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn pipeline_started(&self, pipeline: &str) {
        info!(content = %start_message(pipeline), "Silent notification");
    }

    async fn table_failed(&self, pipeline: &str, table: &TableConfig, error: &str) {
        info!(content = %failure_message(pipeline, table, error), "Silent notification");
    }

    async fn pipeline_finished(&self, summary: &RunSummary) {
        info!(content = %summary_message(summary), "Silent notification");
    }
}

pub fn start_message(pipeline: &str) -> String {
    format!("Starting pipeline: {pipeline}")
}

/// Only the first two lines of the error are kept.
pub fn failure_message(pipeline: &str, table: &TableConfig, error: &str) -> String {
    let error = error.lines().take(2).collect::<Vec<_>>().join(" ");
    format!(
        "Pipeline error: {pipeline} ({}).\n{error}",
        table.source_name
    )
}

pub fn summary_message(summary: &RunSummary) -> String {
    format!(
        "Pipeline finished: {}.\nTables scheduled for replication: {}, tables replicated successfully: {}, elapsed: {}",
        summary.pipeline,
        summary.total,
        summary.success,
        summary.elapsed_hms()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::config::table::Origin;

    #[test]
    fn failure_message_keeps_two_lines() {
        let table = TableConfig::new(Origin::Crm, "deals", "crm.deal", "deals");
        let message = failure_message("crm_pipeline", &table, "first\nsecond\nthird");
        assert_eq!(message, "Pipeline error: crm_pipeline (deals).\nfirst second");
    }
}
