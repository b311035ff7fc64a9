use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StorageError;
use crate::store::{LogEntry, Query};

/// Persistence backend behind the query store and the log.
///
/// Calls are synchronous. Retrying, if any, is the backend's business.
pub trait Storage: Send + Sync {
    /// Load every learned query, oldest first.
    fn load_learned_queries(&self) -> Result<Vec<Query>, StorageError>;
    /// Replace the persisted learned queries.
    fn persist_learned_queries(&self, queries: &[Query]) -> Result<(), StorageError>;
    /// Load every log entry, oldest first.
    fn load_log_entries(&self) -> Result<Vec<LogEntry>, StorageError>;
    /// Replace the persisted log entries.
    fn persist_log_entries(&self, entries: &[LogEntry]) -> Result<(), StorageError>;
}

/// Process-local backend. Can be switched unavailable to exercise failure paths.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    queries: Mutex<Vec<Query>>,
    entries: Mutex<Vec<LogEntry>>,
    unavailable: Mutex<bool>,
}

impl MemoryStorage {
    /// Create an empty, available backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call succeed (`true`) or fail (`false`).
    pub fn set_available(&self, available: bool) {
        *self.unavailable.lock() = !available;
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if *self.unavailable.lock() {
            return Err(StorageError::Backend(
                "memory storage switched unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn load_learned_queries(&self) -> Result<Vec<Query>, StorageError> {
        self.check_available()?;
        Ok(self.queries.lock().clone())
    }

    fn persist_learned_queries(&self, queries: &[Query]) -> Result<(), StorageError> {
        self.check_available()?;
        *self.queries.lock() = queries.to_vec();
        Ok(())
    }

    fn load_log_entries(&self) -> Result<Vec<LogEntry>, StorageError> {
        self.check_available()?;
        Ok(self.entries.lock().clone())
    }

    fn persist_log_entries(&self, entries: &[LogEntry]) -> Result<(), StorageError> {
        self.check_available()?;
        *self.entries.lock() = entries.to_vec();
        Ok(())
    }
}

/// Backend keeping two pretty-printed JSON files in a state directory.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    dir: PathBuf,
}

const LEARNED_QUERIES_FILE: &str = "learned_queries.json";
const LOG_ENTRIES_FILE: &str = "log_entries.json";

impl JsonFileStorage {
    /// Use `dir` as state directory. It is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// State directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn load<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, StorageError> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&path).map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| StorageError::Serialization { path, source })
    }

    fn persist<T: Serialize>(&self, file: &str, items: &[T]) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| StorageError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.dir.join(file);
        let content =
            serde_json::to_string_pretty(items).map_err(|source| StorageError::Serialization {
                path: path.clone(),
                source,
            })?;
        std::fs::write(&path, content).map_err(|source| StorageError::Io { path, source })
    }
}

impl Storage for JsonFileStorage {
    fn load_learned_queries(&self) -> Result<Vec<Query>, StorageError> {
        self.load(LEARNED_QUERIES_FILE)
    }

    fn persist_learned_queries(&self, queries: &[Query]) -> Result<(), StorageError> {
        self.persist(LEARNED_QUERIES_FILE, queries)
    }

    fn load_log_entries(&self) -> Result<Vec<LogEntry>, StorageError> {
        self.load(LOG_ENTRIES_FILE)
    }

    fn persist_log_entries(&self, entries: &[LogEntry]) -> Result<(), StorageError> {
        self.persist(LOG_ENTRIES_FILE, entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Token;

    #[test]
    fn json_storage_round_trips_queries_and_entries() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let storage = JsonFileStorage::new(dir.path().join("state"));

        assert!(storage.load_learned_queries().unwrap().is_empty());
        assert!(storage.load_log_entries().unwrap().is_empty());

        let query = Query::new(
            "SELECT name FROM city",
            Token::SelectStatement([Token::ColumnList([Token::column("name")].into())].into()),
            "world",
            "tester",
        );
        let entry = LogEntry::new("SELECT 1", "world", "tester", "No learned query");
        storage.persist_learned_queries(&[query.clone()]).unwrap();
        storage.persist_log_entries(&[entry.clone()]).unwrap();

        let queries = storage.load_learned_queries().unwrap();
        assert_eq!(queries, vec![query]);
        assert_eq!(queries[0].raw(), "SELECT name FROM city");
        assert_eq!(storage.load_log_entries().unwrap(), vec![entry]);

        let persisted =
            std::fs::read_to_string(storage.dir().join(LEARNED_QUERIES_FILE)).unwrap();
        assert!(!persisted.contains("tokens"), "{persisted}");
    }

    #[test]
    fn json_storage_reports_corrupt_files() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        std::fs::write(dir.path().join(LOG_ENTRIES_FILE), "not json").unwrap();

        let err = JsonFileStorage::new(dir.path())
            .load_log_entries()
            .expect_err("corrupt file should fail");
        assert!(matches!(err, StorageError::Serialization { .. }));
    }

    #[test]
    fn memory_storage_can_be_switched_unavailable() {
        let storage = MemoryStorage::new();
        storage.set_available(false);
        assert!(storage.load_learned_queries().is_err());
        storage.set_available(true);
        assert!(storage.load_learned_queries().is_ok());
    }
}
