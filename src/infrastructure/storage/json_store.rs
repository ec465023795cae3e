use std::path::{Path, PathBuf};

use crate::domain::check_history::CheckHistory;
use crate::domain::errors::PersistenceError;
use crate::domain::ports::{CheckStore, SnapshotStore};
use crate::domain::snapshot::Snapshot;
use crate::infrastructure::storage::atomic_file::{read_json, write_json};

/// Latest snapshot as a JSON document at a fixed path.
pub struct JsonFileSnapshotStore {
    path: PathBuf,
}

impl JsonFileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonFileSnapshotStore {
    fn load(&self) -> Result<Option<Snapshot>, PersistenceError> {
        read_json(&self.path)
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        write_json(&self.path, snapshot)
    }
}

/// [`CheckHistory`] as a JSON document at a fixed path.
pub struct JsonFileCheckStore {
    path: PathBuf,
}

impl JsonFileCheckStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CheckStore for JsonFileCheckStore {
    fn load(&self) -> Result<Option<CheckHistory>, PersistenceError> {
        read_json(&self.path)
    }

    fn save(&self, history: &CheckHistory) -> Result<(), PersistenceError> {
        write_json(&self.path, history)
    }
}
