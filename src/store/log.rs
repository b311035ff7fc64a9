use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::storage::Storage;

/// Immutable record of a rejected statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    query: String,
    database: String,
    database_user: String,
    violation: String,
    timestamp: DateTime<Utc>,
}

impl LogEntry {
    /// Record a violation observed now.
    pub fn new(
        query: impl Into<String>,
        database: impl Into<String>,
        database_user: impl Into<String>,
        violation: impl Into<String>,
    ) -> Self {
        Self::with_timestamp(query, database, database_user, violation, Utc::now())
    }

    /// Record a violation observed at `timestamp`.
    pub fn with_timestamp(
        query: impl Into<String>,
        database: impl Into<String>,
        database_user: impl Into<String>,
        violation: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            query: query.into(),
            database: database.into(),
            database_user: database_user.into(),
            violation: violation.into(),
            timestamp,
        }
    }

    /// Rejected SQL text.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Database the statement targeted.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Database user that issued the statement.
    pub fn database_user(&self) -> &str {
        &self.database_user
    }

    /// Violation category and detail, e.g. `Filter violated: ...`.
    pub fn violation(&self) -> &str {
        &self.violation
    }

    /// When the violation was recorded.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Append-only log of rejections, cached in memory and persisted on every write.
pub struct Log {
    entries: Vec<LogEntry>,
    storage: Arc<dyn Storage>,
}

impl Log {
    /// An empty log backed by `storage`. Nothing is loaded.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            entries: Vec::new(),
            storage,
        }
    }

    /// Load the persisted log.
    pub fn open(storage: Arc<dyn Storage>) -> Result<Self, StorageError> {
        let entries = storage.load_log_entries()?;
        Ok(Self { entries, storage })
    }

    /// Append an entry. `None` is accepted and ignored.
    pub fn write(&mut self, entry: Option<LogEntry>) -> Result<(), StorageError> {
        let Some(entry) = entry else {
            return Ok(());
        };
        self.entries.push(entry);
        if let Err(err) = self.storage.persist_log_entries(&self.entries) {
            self.entries.pop();
            return Err(err);
        }
        Ok(())
    }

    /// Entries, most recent first.
    pub fn read(&self) -> Vec<LogEntry> {
        self.entries.iter().rev().cloned().collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing has been logged.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use chrono::TimeZone;

    fn entry(query: &str) -> LogEntry {
        LogEntry::new(query, "testDatabase", "root", "Columnlist violated")
    }

    #[test]
    fn getters_return_constructor_values() {
        let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let attack = LogEntry::with_timestamp(
            "SELECT x FROM y;",
            "testDatabase",
            "root",
            "Columnlist violated",
            timestamp,
        );

        assert_eq!(attack.query(), "SELECT x FROM y;");
        assert_eq!(attack.database(), "testDatabase");
        assert_eq!(attack.database_user(), "root");
        assert_eq!(attack.violation(), "Columnlist violated");
        assert_eq!(attack.timestamp(), timestamp);
    }

    #[test]
    fn write_none_is_a_noop() {
        let storage = Arc::new(MemoryStorage::new());
        let mut log = Log::open(storage.clone()).unwrap();
        log.write(Some(entry("SELECT 1"))).unwrap();

        log.write(None).unwrap();

        assert_eq!(log.len(), 1);
        assert_eq!(storage.load_log_entries().unwrap().len(), 1);
    }

    #[test]
    fn read_returns_most_recent_first() {
        let mut log = Log::new(Arc::new(MemoryStorage::new()));
        log.write(Some(entry("first"))).unwrap();
        log.write(Some(entry("second"))).unwrap();

        let queries: Vec<_> = log.read().iter().map(|e| e.query().to_string()).collect();
        assert_eq!(queries, vec!["second", "first"]);
    }

    #[test]
    fn open_reads_persisted_entries() {
        let storage = Arc::new(MemoryStorage::new());
        storage.persist_log_entries(&[entry("persisted")]).unwrap();

        let log = Log::open(storage).unwrap();
        assert_eq!(log.read()[0].query(), "persisted");
    }

    #[test]
    fn failed_persist_leaves_log_unchanged() {
        let storage = Arc::new(MemoryStorage::new());
        let mut log = Log::open(storage.clone()).unwrap();
        storage.set_available(false);

        let err = log.write(Some(entry("lost"))).expect_err("write should fail");
        assert!(matches!(err, StorageError::Backend(_)));
        assert!(log.is_empty());
    }
}
