//! Error taxonomy for a monitor.
//!
//! Every error a poll cycle can raise is one of four kinds. Only
//! [`MonitorError::Configuration`] is fatal to the process; the others end
//! the current cycle and are retried at the next tick.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the file-backed stores.
///
/// A missing file is not an error (loads return `Ok(None)`); a file that
/// exists but cannot be parsed is [`PersistenceError::Corrupt`] and must
/// never be mistaken for a first run.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum MonitorError {
    /// The data source could not be reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// A query ran but failed, or returned data of an unexpected shape.
    #[error("data source error: {0}")]
    DataSource(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Missing or invalid settings, detected before the run loop starts.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl MonitorError {
    /// Stable short name of the error kind, used in logs and status output.
    pub fn kind(&self) -> &'static str {
        match self {
            MonitorError::Connection(_) => "connection",
            MonitorError::DataSource(_) => "data_source",
            MonitorError::Persistence(_) => "persistence",
            MonitorError::Configuration(_) => "configuration",
        }
    }
}

impl From<sqlx::Error> for MonitorError {
    /// Transport-level failures mean the source is unreachable; everything
    /// else happened after a connection was established.
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Configuration(_) => MonitorError::Connection(err.to_string()),
            _ => MonitorError::DataSource(err.to_string()),
        }
    }
}
