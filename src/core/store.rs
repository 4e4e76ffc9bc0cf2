use crate::domain::model::{AttributionRecord, Snapshot};
use std::collections::BTreeMap;

/// Accumulated item → venue attributions for one page context.
///
/// Append-only: an entry is never replaced once recorded, so concurrent
/// ingestion paths can finish in any order and produce the same mapping.
#[derive(Debug, Default)]
pub struct AttributionStore {
    records: BTreeMap<String, AttributionRecord>,
}

impl AttributionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 第一次寫入者勝出；已存在時回傳 false 且不覆寫
    pub fn upsert_if_absent(&mut self, record: AttributionRecord) -> bool {
        if self.records.contains_key(&record.item_id) {
            return false;
        }
        self.records.insert(record.item_id.clone(), record);
        true
    }

    pub fn get(&self, item_id: &str) -> Option<&AttributionRecord> {
        self.records.get(item_id)
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.records.contains_key(item_id)
    }

    /// Owned copy of the whole mapping.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_entries(self.records.clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Venue;

    fn record(id: &str, venue: Venue) -> AttributionRecord {
        AttributionRecord {
            item_id: id.to_string(),
            display_name: None,
            venue,
            kind_tag: "unknown".to_string(),
        }
    }

    #[test]
    fn test_first_writer_wins() {
        let mut store = AttributionStore::new();

        assert!(store.upsert_if_absent(record("EQ1", Venue::Getgems)));
        assert!(!store.upsert_if_absent(record("EQ1", Venue::Fragment)));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("EQ1").unwrap().venue, Venue::Getgems);
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_writes() {
        let mut store = AttributionStore::new();
        store.upsert_if_absent(record("EQ1", Venue::Getgems));

        let snapshot = store.snapshot();
        store.upsert_if_absent(record("EQ2", Venue::Fragment));

        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot.contains("EQ2"));
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn test_empty_store() {
        let store = AttributionStore::new();
        assert!(store.is_empty());
        assert!(store.get("EQ1").is_none());
        assert!(store.snapshot().is_empty());
    }
}
