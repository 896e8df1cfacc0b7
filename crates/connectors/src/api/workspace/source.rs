use crate::api::base::{
    error::ApiError,
    normalizer::ObjectNormalizer,
    source::{Extractor, PageFetcher, TableExtraction},
    transport::{HttpRequest, HttpTransport},
};
use async_trait::async_trait;
use model::{
    config::table::{ExtractionStrategy, TableConfig},
    pagination::{cursor::PageCursor, page::Page},
    sync::window::ExtractionWindow,
};
use serde_json::{Map, Value, json};
use std::sync::Arc;

pub const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";
pub const API_VERSION: &str = "2021-08-16";

const TIMESTAMP_PROPERTIES: [&str; 2] = ["last_edited_time", "created_time"];

/// Workspace database connector (cursor pagination over database queries).
#[derive(Clone)]
pub struct WorkspaceConnector {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    token: String,
}

impl WorkspaceConnector {
    pub fn new(transport: Arc<dyn HttpTransport>, token: impl Into<String>) -> Result<Self, ApiError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ApiError::MissingCredential("WORKSPACE_TOKEN".into()));
        }
        Ok(Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            token,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn extractor(
        &self,
        table: &TableConfig,
        window: &ExtractionWindow,
    ) -> Result<Box<dyn Extractor>, ApiError> {
        match table.extraction_strategy {
            ExtractionStrategy::FlatList | ExtractionStrategy::Table => {
                let fetcher = WorkspaceFetcher {
                    transport: Arc::clone(&self.transport),
                    url: format!("{}/databases/{}/query", self.base_url, table.source_identifier),
                    token: self.token.clone(),
                    filter: window_filter(window),
                };
                Ok(Box::new(TableExtraction::new(fetcher, ObjectNormalizer)))
            }
            other => Err(ApiError::UnsupportedStrategy {
                origin: table.origin.to_string(),
                strategy: other.as_str().to_string(),
            }),
        }
    }
}

pub struct WorkspaceFetcher {
    transport: Arc<dyn HttpTransport>,
    url: String,
    token: String,
    filter: Option<Value>,
}

#[async_trait]
impl PageFetcher for WorkspaceFetcher {
    async fn fetch_page(&self, cursor: &PageCursor) -> Result<Page, ApiError> {
        let mut body = Map::new();
        if let Some(token) = cursor.token() {
            body.insert("start_cursor".into(), Value::String(token.to_string()));
        }
        if let Some(filter) = &self.filter {
            body.insert("filter".into(), filter.clone());
        }

        let request = HttpRequest::post(&self.url)
            .bearer(&self.token)
            .header("Notion-Version", API_VERSION)
            .json(Value::Object(body));
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            return Err(ApiError::PermanentHttp {
                status: response.status,
                url: self.url.clone(),
                body: response.text(),
            });
        }

        let data = response
            .json()
            .map_err(|err| ApiError::malformed(&self.url, err.to_string()))?;
        parse_query_page(&self.url, data)
    }

    fn endpoint(&self) -> String {
        self.url.clone()
    }
}

fn parse_query_page(url: &str, mut data: Value) -> Result<Page, ApiError> {
    let items = match data.get_mut("results").map(Value::take) {
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ApiError::malformed(url, "'results' is not an array")),
        None => return Err(ApiError::malformed(url, "'results' key not found in response")),
    };
    let has_more = data.get("has_more").and_then(Value::as_bool).unwrap_or(false);
    let next = data
        .get("next_cursor")
        .and_then(Value::as_str)
        .map(|token| PageCursor::Token(token.to_string()));

    Ok(Page::new(items, next, has_more))
}

/// Query filter restricting rows to the extraction window. Timestamp
/// properties use the dedicated timestamp filter, anything else is treated
/// as a date property.
pub fn window_filter(window: &ExtractionWindow) -> Option<Value> {
    let (property, since) = window.bound()?;
    let since = since.to_rfc3339();
    let filter = if TIMESTAMP_PROPERTIES.contains(&property) {
        json!({ "timestamp": property, property: { "on_or_after": since } })
    } else {
        json!({ "property": property, "date": { "on_or_after": since } })
    };
    Some(filter)
}
