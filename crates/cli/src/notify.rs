use async_trait::async_trait;
use engine_runtime::{
    execution::orchestrator::RunSummary,
    notify::{Notifier, failure_message, start_message, summary_message},
};
use model::config::table::TableConfig;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Posts run messages to a chat webhook as `{"content": ...}`.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn post(&self, content: String) {
        let result = self
            .client
            .post(&self.url)
            .json(&json!({ "content": content }))
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match result {
            Ok(_) => debug!("Notification delivered"),
            Err(err) => warn!(error = %err, "Failed to deliver notification"),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn pipeline_started(&self, pipeline: &str) {
        self.post(start_message(pipeline)).await;
    }

    async fn table_failed(&self, pipeline: &str, table: &TableConfig, error: &str) {
        self.post(failure_message(pipeline, table, error)).await;
    }

    async fn pipeline_finished(&self, summary: &RunSummary) {
        self.post(summary_message(summary)).await;
    }
}
