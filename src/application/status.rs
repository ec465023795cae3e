use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::application::poller::{scheduled_after, PollerSettings};
use crate::domain::check_history::CheckHistory;
use crate::domain::errors::MonitorError;
use crate::domain::ports::{CheckStore, LogSink, SnapshotStore};

/// What the last persisted snapshot says about the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotSummary {
    pub captured_at: DateTime<Utc>,
    pub record_count: u64,
    pub max_id: Option<i64>,
}

/// Read-only view for dashboards and the `status` command.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub table: String,
    pub interval_secs: u64,
    pub snapshot: Option<SnapshotSummary>,
    pub history: CheckHistory,
    pub next_check_at: Option<DateTime<Utc>>,
    pub log_tail: Vec<String>,
}

impl StatusReport {
    /// Age of the last successful check relative to `now`.
    pub fn staleness(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.history.last_success_at.map(|t| now - t)
    }
}

/// Assembles a [`StatusReport`] from the stores a poller writes.
///
/// Never writes. A corrupt state file is reported as an error rather than
/// as "never checked".
pub struct StatusService {
    table: String,
    settings: PollerSettings,
    snapshots: Arc<dyn SnapshotStore>,
    checks: Arc<dyn CheckStore>,
    sink: Arc<dyn LogSink>,
}

impl StatusService {
    pub fn new(
        table: impl Into<String>,
        settings: PollerSettings,
        snapshots: Arc<dyn SnapshotStore>,
        checks: Arc<dyn CheckStore>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            table: table.into(),
            settings,
            snapshots,
            checks,
            sink,
        }
    }

    pub fn report(&self, tail_lines: usize) -> Result<StatusReport, MonitorError> {
        let snapshot = self.snapshots.load()?.map(|s| SnapshotSummary {
            captured_at: s.captured_at,
            record_count: s.row_count,
            max_id: s.max_key,
        });
        let history = self.checks.load()?.unwrap_or_default();

        let last_seen = history
            .last_attempt_at
            .or_else(|| snapshot.as_ref().map(|s| s.captured_at));
        // A failing poller retries after the backoff, not the interval.
        let delay = self.settings.delay_after(history.is_failing());
        let next_check_at = last_seen.and_then(|t| scheduled_after(t, delay));

        Ok(StatusReport {
            table: self.table.clone(),
            interval_secs: self.settings.interval.as_secs(),
            snapshot,
            history,
            next_check_at,
            log_tail: self.sink.tail(tail_lines)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::change_event::ChangeKind;
    use crate::domain::errors::PersistenceError;
    use crate::domain::ports::Severity;
    use crate::domain::snapshot::{Record, Snapshot};
    use crate::infrastructure::storage::json_store::{JsonFileCheckStore, JsonFileSnapshotStore};
    use crate::infrastructure::storage::log_sink::FileLogSink;
    use chrono::TimeZone;
    use std::time::Duration;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> StatusService {
        StatusService::new(
            "clinic.patients",
            PollerSettings::new(Duration::from_secs(3600), Duration::from_secs(60)),
            Arc::new(JsonFileSnapshotStore::new(dir.path().join("state.json"))),
            Arc::new(JsonFileCheckStore::new(dir.path().join("status.json"))),
            Arc::new(FileLogSink::new(dir.path().join("monitor.log"))),
        )
    }

    #[test]
    fn test_never_checked_reports_empty_status() {
        let dir = tempfile::tempdir().unwrap();
        let report = service(&dir).report(20).unwrap();
        assert!(report.snapshot.is_none());
        assert!(report.history.last_attempt_at.is_none());
        assert!(report.next_check_at.is_none());
        assert!(report.log_tail.is_empty());
    }

    #[test]
    fn test_failures_are_visible_next_to_a_stale_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();

        JsonFileSnapshotStore::new(dir.path().join("state.json"))
            .save(&Snapshot::from_records(t0, vec![Record::new(4, "D")]))
            .unwrap();
        let mut h = CheckHistory::default();
        h.record_success(t0, ChangeKind::InitialScan);
        h.record_failure(t1, &MonitorError::Connection("timed out".into()));
        JsonFileCheckStore::new(dir.path().join("status.json"))
            .save(&h)
            .unwrap();
        FileLogSink::new(dir.path().join("monitor.log"))
            .append(Severity::Error, "Check failed [connection]: timed out")
            .unwrap();

        let report = service(&dir).report(20).unwrap();
        let snap = report.snapshot.as_ref().unwrap();
        assert_eq!(snap.record_count, 1);
        assert_eq!(snap.max_id, Some(4));
        assert_eq!(report.history.last_success_at, Some(t0));
        assert_eq!(report.history.last_attempt_at, Some(t1));
        assert_eq!(report.next_check_at, Some(t1 + chrono::Duration::seconds(60)));
        assert_eq!(report.log_tail.len(), 1);
        assert_eq!(
            report.staleness(t1 + chrono::Duration::hours(1)),
            Some(chrono::Duration::hours(2))
        );
    }

    #[test]
    fn test_healthy_poller_is_next_checked_after_the_interval() {
        let dir = tempfile::tempdir().unwrap();
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let mut h = CheckHistory::default();
        h.record_success(t0, ChangeKind::Unchanged);
        JsonFileCheckStore::new(dir.path().join("status.json"))
            .save(&h)
            .unwrap();

        let report = service(&dir).report(5).unwrap();
        assert_eq!(report.next_check_at, Some(t0 + chrono::Duration::hours(1)));
    }

    #[test]
    fn test_unrepresentable_next_check_is_reported_as_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = CheckHistory::default();
        h.record_success(Utc::now(), ChangeKind::Unchanged);
        JsonFileCheckStore::new(dir.path().join("status.json"))
            .save(&h)
            .unwrap();
        let svc = StatusService::new(
            "clinic.patients",
            PollerSettings::new(
                Duration::from_secs(1_000_000_000_000_000),
                Duration::from_secs(60),
            ),
            Arc::new(JsonFileSnapshotStore::new(dir.path().join("state.json"))),
            Arc::new(JsonFileCheckStore::new(dir.path().join("status.json"))),
            Arc::new(FileLogSink::new(dir.path().join("monitor.log"))),
        );

        assert!(svc.report(5).unwrap().next_check_at.is_none());
    }

    #[test]
    fn test_corrupt_state_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("state.json"), "[").unwrap();
        let err = service(&dir).report(20).unwrap_err();
        assert!(matches!(
            err,
            MonitorError::Persistence(PersistenceError::Corrupt { .. })
        ));
    }
}
