use crate::api::base::{
    backoff::BackoffPolicy,
    normalizer::Normalizer,
    transport::{HttpRequest, HttpTransport},
};
use async_trait::async_trait;
use model::{
    pagination::page::Page,
    records::record::{FailurePayload, Record, object_id},
};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Table-by-id strategy: one detail request per listed id. Every failure is
/// captured in the record so the table still loads.
pub struct DetailNormalizer {
    transport: Arc<dyn HttpTransport>,
    url: String,
    backoff: BackoffPolicy,
}

impl DetailNormalizer {
    pub fn new(transport: Arc<dyn HttpTransport>, url: String, backoff: BackoffPolicy) -> Self {
        Self {
            transport,
            url,
            backoff,
        }
    }

    async fn fetch(&self, id: String) -> Record {
        let request = HttpRequest::get(&self.url).query("ID", id.as_str());
        let url = request.full_url();

        let response = match self.backoff.send(self.transport.as_ref(), &request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(%url, error = %err, "Detail request failed");
                return Record::failure(id, FailurePayload::new(err.to_string(), url, None));
            }
        };

        let status = Some(response.status);
        if !response.is_success() {
            warn!(%url, status = response.status, "Detail request returned an error status");
            return Record::failure(
                id,
                FailurePayload::new(format!("HTTP {}", response.status), url, status),
            );
        }

        match response.json() {
            Ok(body) => match body.get("result") {
                Some(result) => Record::success(id, result),
                None => Record::failure(
                    id,
                    FailurePayload::new("'result' key not found in response", url, status),
                ),
            },
            Err(err) => Record::failure(
                id,
                FailurePayload::new(format!("Invalid JSON: {err}"), url, status),
            ),
        }
    }
}

#[async_trait]
impl Normalizer for DetailNormalizer {
    async fn normalize(&self, page: Page, position: usize) -> Vec<Record> {
        let mut records = Vec::with_capacity(page.len());
        for (index, item) in page.items.iter().enumerate() {
            let record = match object_id(item) {
                Some(id) => self.fetch(id).await,
                None => Record::failure(
                    (position + index).to_string(),
                    FailurePayload::new("listed object has no ID", self.url.clone(), None),
                ),
            };
            records.push(record);
        }
        records
    }
}
