use crate::api::{
    base::{
        error::ApiError,
        normalizer::ObjectNormalizer,
        source::{Extractor, PageFetcher, TableExtraction},
        transport::{HttpRequest, HttpTransport},
    },
    gateway::decode::{decode_body, parse_rows},
};
use async_trait::async_trait;
use model::{
    config::table::{ExtractionStrategy, TableConfig},
    core::identifiers::quote_ident,
    pagination::{cursor::PageCursor, page::Page},
    sync::window::ExtractionWindow,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_PAGE_SIZE: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayOptions {
    pub page_size: usize,
    pub separator: char,
    /// Overrides the generated `select *` for every table.
    pub query: Option<String>,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            separator: ';',
            query: None,
        }
    }
}

/// Report gateway connector (`LIMIT`/`OFFSET` paging over a query endpoint).
#[derive(Clone)]
pub struct GatewayConnector {
    transport: Arc<dyn HttpTransport>,
    url: String,
    token: String,
    options: GatewayOptions,
}

impl GatewayConnector {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        url: impl Into<String>,
        token: impl Into<String>,
        options: GatewayOptions,
    ) -> Result<Self, ApiError> {
        let url = url.into();
        let token = token.into();
        if url.trim().is_empty() {
            return Err(ApiError::MissingCredential("GATEWAY_URL".into()));
        }
        if token.trim().is_empty() {
            return Err(ApiError::MissingCredential("GATEWAY_TOKEN".into()));
        }
        if options.page_size == 0 {
            return Err(ApiError::InvalidOption("gateway page size must be positive".into()));
        }
        Ok(Self {
            transport,
            url,
            token,
            options,
        })
    }

    pub fn extractor(
        &self,
        table: &TableConfig,
        window: &ExtractionWindow,
    ) -> Result<Box<dyn Extractor>, ApiError> {
        match table.extraction_strategy {
            ExtractionStrategy::FlatList | ExtractionStrategy::Table => {
                let base = match &self.options.query {
                    Some(query) => query.trim().trim_end_matches(';').to_string(),
                    None => default_query(&table.source_identifier),
                };
                let fetcher = GatewayFetcher {
                    transport: Arc::clone(&self.transport),
                    url: self.url.clone(),
                    token: self.token.clone(),
                    query: windowed_query(&base, window),
                    page_size: self.options.page_size,
                    separator: self.options.separator,
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

pub struct GatewayFetcher {
    transport: Arc<dyn HttpTransport>,
    url: String,
    token: String,
    query: String,
    page_size: usize,
    separator: char,
}

#[async_trait]
impl PageFetcher for GatewayFetcher {
    async fn fetch_page(&self, cursor: &PageCursor) -> Result<Page, ApiError> {
        let offset = cursor.offset();
        let query = format!("{} LIMIT {} OFFSET {}", self.query, self.page_size, offset);
        debug!(%query, "Requesting report page");

        let request = HttpRequest::post(&self.url)
            .bearer(&self.token)
            .json(json!({ "query": query, "separator": self.separator.to_string() }));
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            return Err(ApiError::PermanentHttp {
                status: response.status,
                url: self.url.clone(),
                body: response.text(),
            });
        }

        let separator = u8::try_from(self.separator)
            .map_err(|_| ApiError::malformed(&self.url, "separator must be a single byte"))?;
        let text = decode_body(&response.body);
        let rows = parse_rows(&self.url, &text, separator)?;

        let has_more = rows.len() >= self.page_size;
        let next = PageCursor::Offset {
            offset: offset + self.page_size,
        };
        Ok(Page::new(rows, Some(next), has_more))
    }

    fn endpoint(&self) -> String {
        self.url.clone()
    }
}

pub fn default_query(identifier: &str) -> String {
    format!("select * from {} order by 1 asc", quote_ident(identifier))
}

/// Restricts a query to rows updated inside the window. The date literal is
/// produced from a typed date, never from user input.
pub fn windowed_query(query: &str, window: &ExtractionWindow) -> String {
    match (window.bound(), window.since_date()) {
        (Some((property, _)), Some(since)) => format!(
            "select * from ({query}) as src where {} >= '{}'",
            quote_ident(property),
            since.format("%Y-%m-%d")
        ),
        _ => query.to_string(),
    }
}
