use asset_report::model::Record;
use async_trait::async_trait;

use super::{RecordStore, StoreError};

/// Records held in memory, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<Record>,
}

impl MemoryStore {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }
}

/// Exact match on the stored value, as a Firestore `EQUAL` filter does.
pub(super) fn matches_cost_center(record: &Record, cost_center: &str) -> bool {
    record.cost_center() == Some(cost_center)
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch_all(&self) -> Result<Vec<Record>, StoreError> {
        Ok(self.records.clone())
    }

    async fn fetch_by_cost_center(&self, cost_center: &str) -> Result<Vec<Record>, StoreError> {
        Ok(self
            .records
            .iter()
            .filter(|record| matches_cost_center(record, cost_center))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn filters_by_exact_cost_center() {
        let store = MemoryStore::new(vec![
            Record::new().with_plate("1").with_cost_center("TI"),
            Record::new().with_plate("2").with_cost_center("ti"),
            Record::new().with_plate("3"),
            Record::new().with_plate("4").with_cost_center("TI"),
        ]);

        let plates: Vec<_> = store
            .fetch_by_cost_center("TI")
            .await
            .expect("fetch")
            .iter()
            .map(|record| record.plate().map(str::to_string))
            .collect();
        assert_eq!(plates, vec![Some("1".to_string()), Some("4".to_string())]);
        assert_eq!(store.fetch_all().await.expect("fetch").len(), 4);
    }
}
