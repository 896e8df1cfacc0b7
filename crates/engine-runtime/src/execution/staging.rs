use crate::error::ReplicationError;
use model::{config::table::TableConfig, records::record::Record};
use std::path::{Path, PathBuf};
use tokio::{
    fs,
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
};
use tracing::debug;

/// Raw extraction output on disk, one JSON record per line, so a load can
/// be rerun without calling the vendor again.
#[derive(Debug, Clone)]
pub struct RawStaging {
    root: PathBuf,
}

impl RawStaging {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, table: &TableConfig) -> PathBuf {
        self.root
            .join(table.origin.as_str())
            .join(format!("{}.jsonl", table.source_name))
    }

    pub async fn write(&self, table: &TableConfig, records: &[Record]) -> Result<PathBuf, ReplicationError> {
        let path = self.path_for(table);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|err| staging_error(&path, err))?;
        }

        let mut buffer = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buffer, record)
                .map_err(|err| ReplicationError::Staging(err.to_string()))?;
            buffer.push(b'\n');
        }

        let mut file = fs::File::create(&path).await.map_err(|err| staging_error(&path, err))?;
        file.write_all(&buffer).await.map_err(|err| staging_error(&path, err))?;
        file.flush().await.map_err(|err| staging_error(&path, err))?;

        debug!(path = %path.display(), records = records.len(), "Staged raw records");
        Ok(path)
    }

    pub async fn read(&self, table: &TableConfig) -> Result<Vec<Record>, ReplicationError> {
        let path = self.path_for(table);
        let file = fs::File::open(&path).await.map_err(|err| staging_error(&path, err))?;

        let mut lines = BufReader::new(file).lines();
        let mut records = Vec::new();
        while let Some(line) = lines.next_line().await.map_err(|err| staging_error(&path, err))? {
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line)
                .map_err(|err| ReplicationError::Staging(format!("{}: {err}", path.display())))?;
            records.push(record);
        }
        Ok(records)
    }
}

fn staging_error(path: &Path, err: std::io::Error) -> ReplicationError {
    ReplicationError::Staging(format!("{}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::config::table::Origin;
    use serde_json::json;

    #[tokio::test]
    async fn staged_records_read_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let staging = RawStaging::new(dir.path());
        let table = TableConfig::new(Origin::Crm, "crm.deal", "crm.deal", "deals");
        let records = vec![
            Record::success("1", &json!({"TITLE": "a\nb"})),
            Record::success("2", &json!({"TITLE": "c"})),
        ];

        let path = staging.write(&table, &records).await.unwrap();
        assert!(path.ends_with("crm/crm.deal.jsonl"));
        assert_eq!(staging.read(&table).await.unwrap(), records);
    }

    #[tokio::test]
    async fn missing_file_is_a_staging_error() {
        let dir = tempfile::tempdir().unwrap();
        let staging = RawStaging::new(dir.path());
        let table = TableConfig::new(Origin::Gateway, "orders", "orders", "orders");

        let err = staging.read(&table).await.unwrap_err();
        assert!(matches!(err, ReplicationError::Staging(_)));
    }
}
