use crate::domain::{
    check_history::CheckHistory,
    errors::{MonitorError, PersistenceError},
    snapshot::Snapshot,
};
use async_trait::async_trait;

/// Port: read access to the monitored table (implemented by SqlxTableSource)
#[async_trait]
pub trait TableSource: Send + Sync {
    /// Read row count, ordered `(id, value)` projection and max id.
    ///
    /// The three reads are not transactionally linked.
    async fn capture(&self) -> Result<Snapshot, MonitorError>;
}

/// Port: durable storage of the latest snapshot (implemented by JsonFileSnapshotStore)
pub trait SnapshotStore: Send + Sync {
    /// `Ok(None)` only when nothing was ever stored.
    fn load(&self) -> Result<Option<Snapshot>, PersistenceError>;
    /// Replace the stored snapshot atomically.
    fn save(&self, snapshot: &Snapshot) -> Result<(), PersistenceError>;
}

/// Port: attempt/success bookkeeping (implemented by JsonFileCheckStore)
pub trait CheckStore: Send + Sync {
    fn load(&self) -> Result<Option<CheckHistory>, PersistenceError>;
    fn save(&self, history: &CheckHistory) -> Result<(), PersistenceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

/// Port: append-only, timestamped text log (implemented by FileLogSink)
pub trait LogSink: Send + Sync {
    fn append(&self, level: Severity, message: &str) -> Result<(), PersistenceError>;
    /// Last `n` lines, oldest first.
    fn tail(&self, n: usize) -> Result<Vec<String>, PersistenceError>;
}
