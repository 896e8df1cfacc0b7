use model::records::record::Record;

/// Encodes one record as a `COPY ... FORMAT csv` line.
pub fn encode_record(record: &Record) -> String {
    format!(
        "{},{},{}\n",
        escape_csv_string(&record.id),
        record.success,
        escape_csv_string(&record.content)
    )
}

pub fn escape_csv_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('"');
    for ch in value.chars() {
        if ch == '"' {
            escaped.push('"');
        }
        escaped.push(ch);
    }
    escaped.push('"');
    escaped
}
