use std::path::PathBuf;

use asset_report::model::Record;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::memory::matches_cost_center;
use super::{RecordStore, StoreError};

/// Records read from a JSON file holding an array of documents.
///
/// The file is read again on every fetch so edits show up without a restart.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> Result<Vec<Record>, StoreError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.display().to_string(),
                source,
            })?;

        let documents: Vec<Value> = serde_json::from_slice(&bytes)?;
        let records = documents
            .into_iter()
            .map(Record::from_json)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(path = %self.path.display(), count = records.len(), "Loaded records");
        Ok(records)
    }
}

#[async_trait]
impl RecordStore for FileStore {
    async fn fetch_all(&self) -> Result<Vec<Record>, StoreError> {
        self.load().await
    }

    async fn fetch_by_cost_center(&self, cost_center: &str) -> Result<Vec<Record>, StoreError> {
        let mut records = self.load().await?;
        records.retain(|record| matches_cost_center(record, cost_center));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn reads_loosely_typed_documents() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"[
                {{"placa": "P1", "valorAtual": 10.5, "centroCusto": "TI"}},
                {{"placa": 42, "valorAtual": "5", "centroCusto": "RH", "imgBlob": null}},
                {{"nome": "Sem centro"}}
            ]"#
        )
        .expect("write");

        let store = FileStore::new(file.path());
        let all = store.fetch_all().await.expect("fetch all");
        assert_eq!(all.len(), 3);
        assert_eq!(all[1].plate(), Some("42"));

        let scoped = store.fetch_by_cost_center("TI").await.expect("fetch scoped");
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].plate(), Some("P1"));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let store = FileStore::new("/__missing__/records.json");
        assert!(matches!(
            store.fetch_all().await,
            Err(StoreError::Io { .. })
        ));
    }
}
