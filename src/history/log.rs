//! Append-only conversion history, newest first, bounded.

use std::collections::VecDeque;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::ItemId;
use crate::history::store::{HISTORY_KEY, KeyValueStore};
use crate::utils::{ConverterResult, ImageFormat};

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// One completed conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: ItemId,
    /// Original file name
    pub name: String,
    /// Source mime type
    pub from: String,
    /// Requested target format
    pub to: ImageFormat,
    pub size_in: u64,
    pub size_out: u64,
    /// Unix timestamp in milliseconds
    pub date: i64,
}

#[derive(Debug, Clone)]
pub struct HistoryLog {
    records: VecDeque<HistoryRecord>,
    limit: usize,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl HistoryLog {
    pub fn new(limit: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// Loads the persisted list. Unreadable entries are logged and skipped
    /// rather than failing startup.
    pub fn load(store: &dyn KeyValueStore, limit: usize) -> ConverterResult<Self> {
        let mut log = Self::new(limit);
        let Some(value) = store.get(HISTORY_KEY)? else {
            return Ok(log);
        };
        match serde_json::from_value::<Vec<HistoryRecord>>(value) {
            Ok(records) => {
                log.records = records.into_iter().take(limit).collect();
            }
            Err(e) => warn!("Ignoring unreadable history: {e}"),
        }
        Ok(log)
    }

    pub fn persist(&self, store: &dyn KeyValueStore) -> ConverterResult<()> {
        store.set(HISTORY_KEY, self.to_value()?)
    }

    /// Stored form of the log, most recent first
    pub fn to_value(&self) -> ConverterResult<serde_json::Value> {
        Ok(serde_json::to_value(&self.records)?)
    }

    /// Adds a record at the front, evicting the oldest beyond the limit.
    pub fn push(&mut self, record: HistoryRecord) {
        self.records.push_front(record);
        self.records.truncate(self.limit);
    }

    /// Records, most recent first
    pub fn records(&self) -> impl Iterator<Item = &HistoryRecord> {
        self.records.iter()
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
    use crate::history::store::MemoryStore;

    fn record(n: usize) -> HistoryRecord {
        HistoryRecord {
            id: ItemId::from(format!("id{n}").as_str()),
            name: format!("img{n}.png"),
            from: "image/png".into(),
            to: ImageFormat::WebP,
            size_in: 1000,
            size_out: 400,
            date: n as i64,
        }
    }

    #[test]
    fn keeps_newest_fifty() {
        let mut log = HistoryLog::default();
        for n in 0..60 {
            log.push(record(n));
        }
        assert_eq!(log.len(), 50);
        let dates: Vec<_> = log.records().map(|r| r.date).collect();
        assert_eq!(dates.first(), Some(&59));
        assert_eq!(dates.last(), Some(&10));
    }

    #[test]
    fn persists_and_reloads() {
        let store = MemoryStore::new();
        let mut log = HistoryLog::new(5);
        log.push(record(1));
        log.push(record(2));
        log.persist(&store).unwrap();

        let value = store.get(HISTORY_KEY).unwrap().unwrap();
        assert_eq!(value[0]["sizeIn"], 1000);
        assert_eq!(value[0]["to"], "webp");

        let reloaded = HistoryLog::load(&store, 1).unwrap();
        assert_eq!(reloaded.records().collect::<Vec<_>>(), vec![&record(2)]);
    }

    #[test]
    fn unreadable_history_starts_empty() {
        let store = MemoryStore::new();
        store.set(HISTORY_KEY, serde_json::json!("garbage")).unwrap();
        let log = HistoryLog::load(&store, 50).unwrap();
        assert!(log.is_empty());
    }
}
