use crate::api::base::error::ApiError;
use csv::ReaderBuilder;
use serde_json::{Map, Value};

/// Decodes a report body to text. Bodies are UTF-8 on the wire but some
/// deployments send latin1, and some double-encode UTF-8 through latin1;
/// both are normalized here. Carriage returns are dropped.
pub fn decode_body(bytes: &[u8]) -> String {
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => repair_double_encoding(text),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    };
    text.replace('\r', "")
}

fn repair_double_encoding(text: &str) -> String {
    if text.is_ascii() || text.chars().any(|c| c as u32 > 0xFF) {
        return text.to_string();
    }
    let raw: Vec<u8> = text.chars().map(|c| c as u8).collect();
    match String::from_utf8(raw) {
        Ok(repaired) => repaired,
        Err(_) => text.to_string(),
    }
}

/// Parses delimited text with a header row into one JSON object per row.
/// Empty cells become `null`.
pub fn parse_rows(url: &str, text: &str, separator: u8) -> Result<Vec<Value>, ApiError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(separator)
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|err| ApiError::malformed(url, err.to_string()))?
        .clone();

    let mut rows = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|err| ApiError::malformed(url, err.to_string()))?;
        let object: Map<String, Value> = headers
            .iter()
            .zip(row.iter())
            .map(|(name, cell)| {
                let value = if cell.is_empty() {
                    Value::Null
                } else {
                    Value::String(cell.to_string())
                };
                (name.to_string(), value)
            })
            .collect();
        rows.push(Value::Object(object));
    }

    Ok(rows)
}
