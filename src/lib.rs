use std::sync::Arc;

pub mod application;
pub mod domain;
pub mod infrastructure;
#[cfg(feature = "cli")]
pub mod presentation;

// ─── Log level ────────────────────────────────────────────────────────────────

/// Controls the verbosity of tablewatch's internal tracing output.
///
/// Pass to [`init_tracing`] before calling any async entry point.
///
/// | Variant | `tracing` level | When to use                          |
/// |---------|-----------------|--------------------------------------|
/// | `Error` | `error`         | `--quiet` / cron jobs                |
/// | `Info`  | `info`          | Default — one line per check         |
/// | `Debug` | `debug`         | `--verbose` — shows SQL queries too  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    #[default]
    Info,
    Debug,
}

/// Initialise the global `tracing` subscriber for tablewatch.
///
/// Respects `RUST_LOG` when set, falling back to `level` otherwise.
/// Library consumers who manage their own subscriber should skip this.
///
/// Only available when the `cli` feature is enabled (pulls in
/// `tracing-subscriber`).
#[cfg(feature = "cli")]
pub fn init_tracing(level: LogLevel) {
    use tracing_subscriber::fmt::format::FmtSpan;

    let default_filter = match level {
        LogLevel::Error => "tablewatch=error",
        LogLevel::Info => "tablewatch=info",
        LogLevel::Debug => "tablewatch=debug",
    };

    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}

// ─── Public API Facade ───

pub use application::classify::classify;
pub use application::monitoring::{CaptureStats, TimedTableSource};
pub use application::poller::{PollerSettings, PollerState, SnapshotPoller};
pub use application::shutdown::{Shutdown, ShutdownTrigger};
pub use application::status::{SnapshotSummary, StatusReport, StatusService};
pub use domain::change_event::{ChangeEvent, ChangeKind};
pub use domain::check_history::{CheckFailure, CheckHistory};
pub use domain::errors::{MonitorError, PersistenceError};
pub use domain::ports::{CheckStore, LogSink, Severity, SnapshotStore, TableSource};
pub use domain::snapshot::{Record, Snapshot};
pub use domain::value_objects::{ColumnName, MonitoredTable, Schema, TableName};
pub use infrastructure::config::{AppConfig, DbConfig, MonitorConfig, TableConfig};

use crate::infrastructure::db::client::connect_lazy;
use crate::infrastructure::storage::json_store::{JsonFileCheckStore, JsonFileSnapshotStore};
use crate::infrastructure::storage::log_sink::FileLogSink;

// ─── Public entry points ───

/// Wire a [`SnapshotPoller`] from configuration: sqlx table source wrapped
/// in the timing decorator, JSON file stores, file log sink.
///
/// Fails only with [`MonitorError::Configuration`]; the database is not
/// contacted until the first poll.
pub fn build_poller(cfg: &AppConfig) -> Result<SnapshotPoller, MonitorError> {
    cfg.validate()?;
    let table = cfg.monitored_table();
    let label = table.to_string();
    let source = Arc::new(connect_lazy(&cfg.database, table)?);

    Ok(SnapshotPoller::new(
        Arc::new(TimedTableSource::new(source, label)),
        Arc::new(JsonFileSnapshotStore::new(cfg.monitor.state_path())),
        Arc::new(JsonFileCheckStore::new(cfg.monitor.status_path())),
        Arc::new(FileLogSink::new(cfg.monitor.log_path())),
        PollerSettings::new(cfg.monitor.interval(), cfg.monitor.retry_backoff()),
    ))
}

/// Read-only status service over the files a poller built from `cfg` writes.
pub fn status_service(cfg: &AppConfig) -> StatusService {
    StatusService::new(
        cfg.monitored_table().to_string(),
        PollerSettings::new(cfg.monitor.interval(), cfg.monitor.retry_backoff()),
        Arc::new(JsonFileSnapshotStore::new(cfg.monitor.state_path())),
        Arc::new(JsonFileCheckStore::new(cfg.monitor.status_path())),
        Arc::new(FileLogSink::new(cfg.monitor.log_path())),
    )
}

/// Run a single check.
pub async fn check_once(cfg: &AppConfig) -> Result<ChangeEvent, MonitorError> {
    build_poller(cfg)?.poll_once().await
}

/// Poll until `shutdown` fires. Returns early only on a configuration error.
pub async fn run(cfg: &AppConfig, shutdown: Shutdown) -> Result<(), MonitorError> {
    let poller = build_poller(cfg)?;
    poller.run_forever(shutdown).await;
    Ok(())
}

/// Read the status report for the table configured in `cfg`.
pub fn status(cfg: &AppConfig, tail_lines: usize) -> Result<StatusReport, MonitorError> {
    status_service(cfg).report(tail_lines)
}
