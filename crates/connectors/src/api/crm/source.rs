use crate::api::{
    base::{
        backoff::BackoffPolicy,
        error::ApiError,
        normalizer::ObjectNormalizer,
        source::{Extractor, PageFetcher, TableExtraction},
        transport::{HttpRequest, HttpTransport},
    },
    crm::detail::DetailNormalizer,
};
use async_trait::async_trait;
use model::{
    config::table::{ExtractionStrategy, TableConfig},
    pagination::{cursor::PageCursor, page::Page},
    sync::window::ExtractionWindow,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

/// CRM REST connector. Credentials are part of the URL path.
#[derive(Clone)]
pub struct CrmConnector {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    backoff: BackoffPolicy,
}

impl CrmConnector {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        host: &str,
        user_id: &str,
        token: &str,
    ) -> Result<Self, ApiError> {
        for (name, value) in [("CRM_URL", host), ("CRM_USER_ID", user_id), ("CRM_TOKEN", token)] {
            if value.trim().is_empty() {
                return Err(ApiError::MissingCredential(name.into()));
            }
        }

        let host = host
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        Ok(Self {
            transport,
            base_url: format!("https://{host}/rest/{user_id}/{token}/"),
            backoff: BackoffPolicy::default(),
        })
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn extractor(
        &self,
        table: &TableConfig,
        window: &ExtractionWindow,
    ) -> Result<Box<dyn Extractor>, ApiError> {
        let identifier = table.source_identifier.as_str();
        let filter = window
            .bound()
            .zip(window.since_date())
            .map(|((property, _), since)| {
                (format!("FILTER[>={property}]"), since.format("%Y-%m-%d").to_string())
            });

        let extractor: Box<dyn Extractor> = match table.extraction_strategy {
            ExtractionStrategy::Table => {
                let fetcher = self.list_fetcher(format!("{identifier}.list.json"), filter, true);
                let normalizer = DetailNormalizer::new(
                    Arc::clone(&self.transport),
                    format!("{}{identifier}.get.json", self.base_url),
                    self.backoff.clone(),
                );
                Box::new(TableExtraction::new(fetcher, normalizer))
            }
            ExtractionStrategy::FlatList => {
                let fetcher = self.list_fetcher(format!("{identifier}.list.json"), filter, true);
                Box::new(TableExtraction::new(fetcher, ObjectNormalizer))
            }
            ExtractionStrategy::Enumeration => {
                let fetcher = self.list_fetcher(identifier.to_string(), None, false);
                Box::new(TableExtraction::new(fetcher, ObjectNormalizer))
            }
            ExtractionStrategy::FieldDictionary => {
                let fetcher = FieldsFetcher {
                    transport: Arc::clone(&self.transport),
                    url: format!("{}{identifier}", self.base_url),
                };
                Box::new(TableExtraction::new(fetcher, ObjectNormalizer))
            }
        };
        Ok(extractor)
    }

    fn list_fetcher(
        &self,
        method: String,
        filter: Option<(String, String)>,
        require_objects: bool,
    ) -> ListFetcher {
        ListFetcher {
            transport: Arc::clone(&self.transport),
            url: format!("{}{method}", self.base_url),
            filter,
            require_objects,
        }
    }
}

/// `start`/`next` paginated listing.
pub struct ListFetcher {
    transport: Arc<dyn HttpTransport>,
    url: String,
    filter: Option<(String, String)>,
    require_objects: bool,
}

#[async_trait]
impl PageFetcher for ListFetcher {
    async fn fetch_page(&self, cursor: &PageCursor) -> Result<Page, ApiError> {
        let mut request = HttpRequest::get(&self.url).query("start", cursor.start().to_string());
        if let Some((key, value)) = &self.filter {
            request = request.query(key.as_str(), value.as_str());
        }

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(ApiError::PermanentHttp {
                status: response.status,
                url: self.url.clone(),
                body: response.text(),
            });
        }

        let mut data = response
            .json()
            .map_err(|err| ApiError::malformed(&self.url, err.to_string()))?;

        let items = match data.get_mut("result").map(Value::take) {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => return Err(ApiError::malformed(&self.url, "invalid result format")),
        };
        if items.is_empty() {
            info!(url = %self.url, "No data found");
        }
        if self.require_objects && items.iter().any(|item| !item.is_object()) {
            return Err(ApiError::malformed(
                &self.url,
                "invalid result format (expected objects in list)",
            ));
        }

        let next = data
            .get("next")
            .and_then(next_start)
            .map(|start| PageCursor::Start { start });
        let has_more = next.is_some();
        Ok(Page::new(items, next, has_more))
    }

    fn endpoint(&self) -> String {
        self.url.clone()
    }
}

fn next_start(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Field dictionary: one object per key of the `result` map.
pub struct FieldsFetcher {
    transport: Arc<dyn HttpTransport>,
    url: String,
}

#[async_trait]
impl PageFetcher for FieldsFetcher {
    async fn fetch_page(&self, _cursor: &PageCursor) -> Result<Page, ApiError> {
        let response = self.transport.send(HttpRequest::get(&self.url)).await?;
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
        let Some(fields) = data.get("result").and_then(Value::as_object) else {
            return Err(ApiError::malformed(&self.url, "'result' is not a map"));
        };

        let items = fields.iter().map(|(key, value)| field_object(key, value)).collect();
        Ok(Page::last(items))
    }

    fn endpoint(&self) -> String {
        self.url.clone()
    }
}

fn field_object(key: &str, value: &Value) -> Value {
    let mut object = Map::new();
    object.insert("ID".into(), Value::String(key.to_string()));
    match value {
        Value::Object(attributes) => {
            for (name, attribute) in attributes {
                if name != "ID" {
                    object.insert(name.clone(), attribute.clone());
                }
            }
        }
        other => {
            object.insert("value".into(), other.clone());
        }
    }
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::base::scripted::ScriptedTransport;
    use chrono::{TimeZone, Utc};
    use model::config::table::Origin;
    use serde_json::json;

    fn connector(transport: &ScriptedTransport) -> CrmConnector {
        CrmConnector::new(Arc::new(transport.clone()), "acme.crm.test", "7", "tkn").unwrap()
    }

    #[test]
    fn base_url_embeds_credentials() {
        let transport: Arc<dyn HttpTransport> = Arc::new(ScriptedTransport::new());
        let connector = CrmConnector::new(transport, "https://acme.crm.test/", "7", "tkn").unwrap();
        assert_eq!(connector.base_url(), "https://acme.crm.test/rest/7/tkn/");
    }

    #[tokio::test]
    async fn flat_list_follows_next() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, json!({"result": [{"ID": "1"}, {"ID": "2"}], "next": 2}));
        transport.push_json(200, json!({"result": [{"ID": "3"}]}));

        let table = TableConfig::new(Origin::Crm, "leads", "crm.lead", "leads")
            .with_strategy(ExtractionStrategy::FlatList);
        let records = connector(&transport)
            .extractor(&table, &ExtractionWindow::full())
            .unwrap()
            .extract()
            .await
            .unwrap();

        assert_eq!(records.len(), 3);
        let requests = transport.requests();
        assert_eq!(requests[0].query, vec![("start".to_string(), "0".to_string())]);
        assert_eq!(requests[1].query, vec![("start".to_string(), "2".to_string())]);
        assert_eq!(requests[0].url, "https://acme.crm.test/rest/7/tkn/crm.lead.list.json");
    }

    #[tokio::test]
    async fn window_adds_inclusive_filter() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, json!({"result": []}));

        let now = Utc.with_ymd_and_hms(2024, 5, 20, 0, 0, 0).unwrap();
        let table = TableConfig::new(Origin::Crm, "leads", "crm.lead", "leads")
            .with_strategy(ExtractionStrategy::FlatList)
            .with_window(7, "DATE_MODIFY");
        connector(&transport)
            .extractor(&table, &table.window(now))
            .unwrap()
            .extract()
            .await
            .unwrap();

        let query = transport.requests()[0].query.clone();
        assert!(query.contains(&("FILTER[>=DATE_MODIFY]".to_string(), "2024-05-13".to_string())));
    }

    #[tokio::test]
    async fn non_object_list_is_malformed() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, json!({"result": [1, 2]}));

        let table = TableConfig::new(Origin::Crm, "leads", "crm.lead", "leads")
            .with_strategy(ExtractionStrategy::FlatList);
        let err = connector(&transport)
            .extractor(&table, &ExtractionWindow::full())
            .unwrap()
            .extract()
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::MalformedPage { .. }));
    }

    #[tokio::test]
    async fn enumeration_accepts_any_elements() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, json!({"result": [{"ID": "NEW", "NAME": "New"}, "loose"]}));

        let table = TableConfig::new(Origin::Crm, "stages", "crm.status.list", "stages")
            .with_strategy(ExtractionStrategy::Enumeration);
        let records = connector(&transport)
            .extractor(&table, &ExtractionWindow::full())
            .unwrap()
            .extract()
            .await
            .unwrap();

        assert_eq!(records[0].id, "NEW");
        assert_eq!(records[1].id, "1");
        assert_eq!(
            transport.requests()[0].url,
            "https://acme.crm.test/rest/7/tkn/crm.status.list"
        );
    }

    #[tokio::test]
    async fn field_dictionary_keys_become_ids() {
        let transport = ScriptedTransport::new();
        transport.push_json(
            200,
            json!({"result": {
                "TITLE": {"type": "string", "isRequired": false},
                "STAGE_ID": {"type": "crm_status"}
            }}),
        );

        let table = TableConfig::new(Origin::Crm, "deal_fields", "crm.deal.fields", "deal_fields")
            .with_strategy(ExtractionStrategy::FieldDictionary);
        let records = connector(&transport)
            .extractor(&table, &ExtractionWindow::full())
            .unwrap()
            .extract()
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        let title = records.iter().find(|r| r.id == "TITLE").unwrap();
        assert_eq!(title.content_json().unwrap()["type"], "string");
        assert_eq!(transport.requests().len(), 1);
    }
}
