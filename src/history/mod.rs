//! Persistent conversion history and the key-value store behind it.

mod log;
mod store;

pub use log::{DEFAULT_HISTORY_LIMIT, HistoryLog, HistoryRecord};
pub use store::{HISTORY_KEY, JsonFileStore, KeyValueStore, MemoryStore, RENAME_KEY};
