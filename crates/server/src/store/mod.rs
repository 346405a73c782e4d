//! Record store gateway.
//!
//! A store returns flat asset records, either all of them or those whose cost center equals a
//! given id exactly.  Records come back in store order.

mod file;
mod firestore;
mod memory;

use std::sync::Arc;

use asset_report::model::Record;
use async_trait::async_trait;
use thiserror::Error;

use crate::config::{StoreConfig, StoreKind};

pub use file::FileStore;
pub use firestore::{FirestoreStore, ServiceAccountKey};
pub use memory::MemoryStore;

/// Firestore field holding the cost center.
pub const COST_CENTER_FIELD: &str = "centroCusto";

/// Record store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store is not configured correctly.
    #[error("Store configuration error: {0}")]
    Config(String),

    /// Reading a local file failed.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Stored data could not be decoded.
    #[error("Malformed store data: {0}")]
    Decode(#[from] serde_json::Error),

    /// Building a service account token failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The HTTP request did not complete.
    #[error("Store request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with an error status.
    #[error("Store returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Source of asset records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All records of the collection.
    async fn fetch_all(&self) -> Result<Vec<Record>, StoreError>;

    /// Records whose cost center equals `cost_center`.
    async fn fetch_by_cost_center(&self, cost_center: &str) -> Result<Vec<Record>, StoreError>;
}

/// Creates the store selected by `config`.
///
/// # Errors
///
/// Returns [`StoreError::Config`] when required settings are missing, or the error of reading
/// the service account key.
pub fn from_config(config: &StoreConfig) -> Result<Arc<dyn RecordStore>, StoreError> {
    match config.kind {
        StoreKind::File => {
            let path = config.path.clone().ok_or_else(|| {
                StoreError::Config("store.path is required for the file store".to_string())
            })?;
            Ok(Arc::new(FileStore::new(path)))
        }
        StoreKind::Firestore => Ok(Arc::new(FirestoreStore::from_config(config)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_needs_a_path() {
        let config = StoreConfig {
            kind: StoreKind::File,
            ..StoreConfig::default()
        };
        assert!(matches!(from_config(&config), Err(StoreError::Config(_))));
    }

    #[test]
    fn emulator_store_needs_no_credentials() {
        let config = StoreConfig {
            project_id: Some("demo".to_string()),
            emulator_host: Some("localhost:8080".to_string()),
            ..StoreConfig::default()
        };
        assert!(from_config(&config).is_ok());
    }
}
