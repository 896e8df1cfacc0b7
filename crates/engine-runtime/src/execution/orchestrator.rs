use crate::execution::processor::{Isolated, TableOutcome, TableProcessor};
use model::config::table::TableConfig;
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};

/// End-of-run report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub pipeline: String,
    pub total: usize,
    pub success: usize,
    pub elapsed_secs: u64,
    /// Set when a stop was requested before every table ran.
    pub cancelled: bool,
    pub tables: Vec<TableOutcome>,
}

impl RunSummary {
    fn new(pipeline: &str) -> Self {
        Self {
            pipeline: pipeline.to_string(),
            total: 0,
            success: 0,
            elapsed_secs: 0,
            cancelled: false,
            tables: Vec::new(),
        }
    }

    fn push(&mut self, outcome: TableOutcome) {
        self.total += 1;
        if outcome.is_success() {
            self.success += 1;
        }
        self.tables.push(outcome);
    }

    pub fn failed(&self) -> usize {
        self.total - self.success
    }

    /// `H:MM:SS`.
    pub fn elapsed_hms(&self) -> String {
        format_hms(Duration::from_secs(self.elapsed_secs))
    }
}

pub fn format_hms(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Runs tables strictly one after another. A stop request is honoured
/// between tables, never in the middle of one.
pub struct StreamOrchestrator<P> {
    processor: Isolated<P>,
    cancel: CancellationToken,
}

impl<P: TableProcessor> StreamOrchestrator<P> {
    pub fn new(processor: Isolated<P>) -> Self {
        Self {
            processor,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn run(&self, tables: &[TableConfig]) -> RunSummary {
        let started = Instant::now();
        let pipeline = self.processor.pipeline();
        let notifier = self.processor.notifier();
        let mut summary = RunSummary::new(pipeline);

        notifier.pipeline_started(pipeline).await;
        info!(pipeline, tables = tables.len(), "Replication started");

        for table in tables {
            if self.cancel.is_cancelled() {
                warn!(pipeline, remaining = tables.len() - summary.total, "Stop requested, skipping remaining tables");
                summary.cancelled = true;
                break;
            }

            let span = info_span!(
                "table",
                origin = %table.origin,
                source_name = %table.source_name
            );
            let outcome = self.processor.run(table).instrument(span).await;
            summary.push(outcome);
        }

        summary.elapsed_secs = started.elapsed().as_secs();
        info!(
            pipeline,
            total = summary.total,
            success = summary.success,
            elapsed = %summary.elapsed_hms(),
            "Replication finished"
        );
        notifier.pipeline_finished(&summary).await;
        summary
    }
}
