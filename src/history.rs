//! Saved calculations, newest first, kept in a single JSON file.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{Error, Result};

pub const HISTORY_FILE: &str = "history.json";
pub const HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Which tool produced the entry, e.g. `loan`.
    pub key: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(HISTORY_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Vec<HistoryEntry>> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(Vec::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(source) => Err(Error::HistoryIo {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// All saved entries. A missing or unreadable store reads as empty.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.read().unwrap_or_else(|err| {
            warn!(%err, "ignoring unreadable history");
            Vec::new()
        })
    }

    /// Prepends an entry and trims the store to the newest ten.
    pub fn save<T: Serialize>(&self, key: &str, data: &T) -> Result<HistoryEntry> {
        let entry = HistoryEntry {
            key: key.to_string(),
            data: serde_json::to_value(data)?,
            timestamp: Utc::now(),
        };

        let mut history = self.read()?;
        history.insert(0, entry.clone());
        history.truncate(HISTORY_LIMIT);

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|source| Error::HistoryIo {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(&history)?;
        fs::write(&self.path, json).map_err(|source| Error::HistoryIo {
            path: self.path.clone(),
            source,
        })?;

        info!(key, entries = history.len(), "calculation saved");
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_store_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path());
        assert!(store.entries().is_empty());
    }

    #[test]
    fn corrupt_store_reads_empty_but_refuses_to_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path());
        fs::write(store.path(), "{not json").unwrap();

        assert!(store.entries().is_empty());
        assert!(matches!(store.save("loan", &json!({})), Err(Error::HistoryFormat(_))));
    }

    #[test]
    fn newest_entry_comes_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path());
        store.save("loan", &json!({"principal": 1})).unwrap();
        store.save("roi", &json!({"price": 2})).unwrap();

        let entries = store.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "roi");
        assert_eq!(entries[1].data, json!({"principal": 1}));
    }
}
