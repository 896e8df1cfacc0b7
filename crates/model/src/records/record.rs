use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Column set of every landing table.
pub const ENVELOPE_COLUMNS: [&str; 3] = ["ID", "SUCCESS", "CONTENT"];

/// Canonical landing envelope. Vendor structure lives inside `content` and is
/// resolved downstream, so the warehouse never sees schema drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "SUCCESS")]
    pub success: bool,
    /// Always JSON text. On failure it holds a [`FailurePayload`].
    #[serde(rename = "CONTENT")]
    pub content: String,
}

/// Structured `CONTENT` of a failed record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailurePayload {
    #[serde(rename = "ERROR")]
    pub error: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "STATUS_CODE")]
    pub status_code: Option<u16>,
}

impl Record {
    pub fn success(id: impl Into<String>, content: &Value) -> Self {
        Self {
            id: non_empty_id(id.into(), 0),
            success: true,
            content: content.to_string(),
        }
    }

    pub fn failure(id: impl Into<String>, payload: FailurePayload) -> Self {
        let content = serde_json::json!({
            "ERROR": payload.error,
            "URL": payload.url,
            "STATUS_CODE": payload.status_code,
        });
        Self {
            id: non_empty_id(id.into(), 0),
            success: false,
            content: content.to_string(),
        }
    }

    /// One record per listed object: the object's own id, or its position.
    pub fn from_object(position: usize, object: &Value) -> Self {
        let id = object_id(object).unwrap_or_else(|| position.to_string());
        Self {
            id: non_empty_id(id, position),
            success: true,
            content: object.to_string(),
        }
    }

    pub fn content_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.content)
    }
}

impl FailurePayload {
    pub fn new(error: impl Into<String>, url: impl Into<String>, status_code: Option<u16>) -> Self {
        Self {
            error: error.into(),
            url: url.into(),
            status_code,
        }
    }
}

/// Reads `id`/`ID` from an object, accepting strings and numbers.
pub fn object_id(object: &Value) -> Option<String> {
    let map: &Map<String, Value> = object.as_object()?;
    let raw = map.get("id").or_else(|| map.get("ID"))?;
    match raw {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty_id(id: String, position: usize) -> String {
    if id.trim().is_empty() {
        position.to_string()
    } else {
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_id_or_position() {
        let with_id = Record::from_object(4, &json!({"id": "abc", "name": "x"}));
        assert_eq!(with_id.id, "abc");

        let numeric = Record::from_object(4, &json!({"ID": 17}));
        assert_eq!(numeric.id, "17");

        let without = Record::from_object(4, &json!({"name": "x"}));
        assert_eq!(without.id, "4");
        assert!(without.success);
        assert_eq!(without.content_json().unwrap()["name"], "x");
    }

    #[test]
    fn failure_content_is_structured_json() {
        let record = Record::failure(
            "3",
            FailurePayload::new("HTTP 500", "https://crm/deal.get.json?ID=3", Some(500)),
        );
        assert!(!record.success);
        let content = record.content_json().unwrap();
        assert_eq!(content["ERROR"], "HTTP 500");
        assert_eq!(content["STATUS_CODE"], 500);
        assert_eq!(content["URL"], "https://crm/deal.get.json?ID=3");
    }

    #[test]
    fn serializes_with_envelope_column_names() {
        let record = Record::success("1", &json!({"a": 1}));
        let value = serde_json::to_value(&record).unwrap();
        for column in ENVELOPE_COLUMNS {
            assert!(value.get(column).is_some(), "missing {column}");
        }
    }
}
