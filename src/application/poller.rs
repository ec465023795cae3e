use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::application::classify::classify;
use crate::application::shutdown::Shutdown;
use crate::domain::change_event::ChangeEvent;
use crate::domain::errors::MonitorError;
use crate::domain::ports::{CheckStore, LogSink, Severity, SnapshotStore, TableSource};

// ─── PollerState ─────────────────────────────────────────────────────────────

/// Lifecycle of a running poller. `ShuttingDown` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollerState {
    Idle,
    Polling,
    Sleeping,
    ShuttingDown,
}

// ─── Settings ────────────────────────────────────────────────────────────────

/// Shortest wait after a failed cycle, whatever `retry_backoff` says.
pub const MIN_RETRY_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerSettings {
    /// Delay between the end of one successful cycle and the next.
    pub interval: Duration,
    /// Delay after a failed cycle. Never longer than `interval`, never
    /// shorter than [`MIN_RETRY_BACKOFF`] unless `interval` is.
    pub retry_backoff: Duration,
}

impl PollerSettings {
    pub fn new(interval: Duration, retry_backoff: Duration) -> Self {
        Self {
            interval,
            retry_backoff,
        }
    }

    pub fn failure_delay(&self) -> Duration {
        self.retry_backoff.max(MIN_RETRY_BACKOFF).min(self.interval)
    }

    /// Delay the loop applies after a cycle with the given outcome.
    pub fn delay_after(&self, failed: bool) -> Duration {
        if failed {
            self.failure_delay()
        } else {
            self.interval
        }
    }
}

/// `from + delay`, or `None` when the result is not representable.
pub fn scheduled_after(from: DateTime<Utc>, delay: Duration) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|d| from.checked_add_signed(d))
}

// ─── SnapshotPoller ──────────────────────────────────────────────────────────

/// Captures the monitored table, compares it with the stored snapshot,
/// logs the classified change, then replaces the stored snapshot.
///
/// Cycles are strictly sequential. Cancellation is only observed between
/// cycles, so a cycle that has started always finishes its persistence.
pub struct SnapshotPoller {
    source: Arc<dyn TableSource>,
    snapshots: Arc<dyn SnapshotStore>,
    checks: Arc<dyn CheckStore>,
    sink: Arc<dyn LogSink>,
    settings: PollerSettings,
    state: watch::Sender<PollerState>,
}

impl SnapshotPoller {
    pub fn new(
        source: Arc<dyn TableSource>,
        snapshots: Arc<dyn SnapshotStore>,
        checks: Arc<dyn CheckStore>,
        sink: Arc<dyn LogSink>,
        settings: PollerSettings,
    ) -> Self {
        let (state, _) = watch::channel(PollerState::Idle);
        Self {
            source,
            snapshots,
            checks,
            sink,
            settings,
            state,
        }
    }

    pub fn settings(&self) -> PollerSettings {
        self.settings
    }

    pub fn state(&self) -> PollerState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<PollerState> {
        self.state.subscribe()
    }

    fn set_state(&self, next: PollerState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            tracing::debug!(?prev, ?next, "poller state changed");
        }
    }

    /// Run one capture-compare-log-persist cycle.
    ///
    /// On error the stored snapshot is left exactly as it was. The outcome,
    /// success or failure, is recorded in the check history.
    #[instrument(name = "poll_cycle", skip(self), fields(cycle_id = %Uuid::new_v4().simple()))]
    pub async fn poll_once(&self) -> Result<ChangeEvent, MonitorError> {
        let started_at = Utc::now();
        let outcome = self.run_cycle().await;
        self.record_outcome(started_at, &outcome);
        outcome
    }

    async fn run_cycle(&self) -> Result<ChangeEvent, MonitorError> {
        info!("Starting table check");

        let current = self.source.capture().await?;
        for issue in current.consistency_issues() {
            // Count, projection and max are separate reads.
            warn!(%issue, "snapshot reads were not consistent");
            self.sink
                .append(Severity::Warn, &format!("Inconsistent snapshot: {issue}"))?;
        }

        let previous = self.snapshots.load()?;
        let event = classify(previous.as_ref(), &current);

        self.emit(&event)?;

        // Last step: nothing after this can fail the cycle.
        self.snapshots.save(&current)?;
        Ok(event)
    }

    fn emit(&self, event: &ChangeEvent) -> Result<(), MonitorError> {
        info!(kind = %event.kind(), "{}", event.message());

        let mut text = event.message();
        for (i, record) in event.listed_records().iter().enumerate() {
            text.push_str(&format!(
                "\n  {}. ID: {}, Name: {}",
                i + 1,
                record.id,
                record.name.as_deref().unwrap_or("NULL")
            ));
        }
        let next_check = match scheduled_after(Utc::now(), self.settings.interval) {
            Some(t) => t.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            None => "unknown".to_string(),
        };
        text.push_str(&format!("\n  Next check scheduled for: {next_check}"));

        self.sink.append(Severity::Info, &text)?;
        Ok(())
    }

    fn record_outcome(
        &self,
        started_at: DateTime<Utc>,
        outcome: &Result<ChangeEvent, MonitorError>,
    ) {
        if let Err(err) = outcome {
            let line = format!(
                "Check started at {} failed [{}]: {}",
                started_at.to_rfc3339(),
                err.kind(),
                err
            );
            if let Err(e) = self.sink.append(Severity::Error, &line) {
                warn!(error = %e, "could not write failure to log sink");
            }
        }

        // A corrupt history is left in place for inspection.
        let mut history = match self.checks.load() {
            Ok(h) => h.unwrap_or_default(),
            Err(e) => {
                error!(error = %e, "check history unreadable, not updating it");
                let line = format!("Check history unreadable, not updating it: {e}");
                if let Err(e) = self.sink.append(Severity::Error, &line) {
                    warn!(error = %e, "could not write failure to log sink");
                }
                return;
            }
        };

        match outcome {
            Ok(event) => history.record_success(started_at, event.kind()),
            Err(err) => history.record_failure(started_at, err),
        }

        if let Err(e) = self.checks.save(&history) {
            warn!(error = %e, "could not persist check history");
        }
    }

    /// Poll immediately, then keep polling every `interval` until `shutdown`
    /// fires. A failed cycle is logged and followed by `retry_backoff`
    /// instead of the full interval; it never ends the loop.
    pub async fn run_forever(&self, mut shutdown: Shutdown) {
        info!(
            interval_secs = self.settings.interval.as_secs(),
            retry_backoff_secs = self.settings.failure_delay().as_secs(),
            "Starting table monitor"
        );

        while !shutdown.is_triggered() {
            self.set_state(PollerState::Polling);
            let outcome = self.poll_once().await;
            if let Err(err) = &outcome {
                error!(
                    at = %Utc::now().to_rfc3339(),
                    kind = err.kind(),
                    error = %err,
                    "check failed, retrying after backoff"
                );
            }
            let delay = self.settings.delay_after(outcome.is_err());

            self.set_state(PollerState::Sleeping);
            if !shutdown.sleep(delay).await {
                break;
            }
        }

        self.set_state(PollerState::ShuttingDown);
        info!("Table monitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::shutdown::ShutdownTrigger;
    use crate::domain::change_event::ChangeKind;
    use crate::domain::errors::PersistenceError;
    use crate::domain::snapshot::{Record, Snapshot};
    use crate::infrastructure::storage::json_store::{JsonFileCheckStore, JsonFileSnapshotStore};
    use crate::infrastructure::storage::log_sink::FileLogSink;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::TempDir;

    enum Step {
        Rows(Vec<(i64, &'static str)>),
        Unreachable,
    }

    /// Replays a script of table states. Once the script runs out the last
    /// state repeats. Optionally fires shutdown while capturing.
    struct ScriptedSource {
        steps: Mutex<VecDeque<Step>>,
        last: Mutex<Vec<(i64, &'static str)>>,
        captured_at: Mutex<Vec<tokio::time::Instant>>,
        stop_after: Option<(usize, ShutdownTrigger)>,
    }

    impl ScriptedSource {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: Mutex::new(steps.into()),
                last: Mutex::new(Vec::new()),
                captured_at: Mutex::new(Vec::new()),
                stop_after: None,
            }
        }

        fn stopping_after(mut self, captures: usize, trigger: ShutdownTrigger) -> Self {
            self.stop_after = Some((captures, trigger));
            self
        }

        fn captures(&self) -> Vec<tokio::time::Instant> {
            self.captured_at.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TableSource for ScriptedSource {
        async fn capture(&self) -> Result<Snapshot, MonitorError> {
            let n = {
                let mut at = self.captured_at.lock().unwrap();
                at.push(tokio::time::Instant::now());
                at.len()
            };
            if let Some((limit, trigger)) = &self.stop_after {
                if n >= *limit {
                    trigger.trigger();
                }
            }

            let step = self.steps.lock().unwrap().pop_front();
            let rows = match step {
                Some(Step::Unreachable) => {
                    return Err(MonitorError::Connection("connection refused".into()))
                }
                Some(Step::Rows(rows)) => {
                    *self.last.lock().unwrap() = rows.clone();
                    rows
                }
                None => self.last.lock().unwrap().clone(),
            };

            Ok(Snapshot::from_records(
                Utc::now(),
                rows.into_iter().map(|(id, v)| Record::new(id, v)).collect(),
            ))
        }
    }

    struct Harness {
        dir: TempDir,
        source: Arc<ScriptedSource>,
        poller: SnapshotPoller,
    }

    impl Harness {
        fn new(source: ScriptedSource) -> Self {
            Self::with_settings(
                source,
                PollerSettings::new(Duration::from_secs(3600), Duration::from_secs(60)),
            )
        }

        fn with_settings(source: ScriptedSource, settings: PollerSettings) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let source = Arc::new(source);
            let poller = SnapshotPoller::new(
                source.clone(),
                Arc::new(JsonFileSnapshotStore::new(dir.path().join("monitor_state.json"))),
                Arc::new(JsonFileCheckStore::new(dir.path().join("monitor_status.json"))),
                Arc::new(FileLogSink::new(dir.path().join("monitor.log"))),
                settings,
            );
            Self {
                dir,
                source,
                poller,
            }
        }

        fn state_path(&self) -> PathBuf {
            self.dir.path().join("monitor_state.json")
        }

        fn stored(&self) -> Option<Snapshot> {
            JsonFileSnapshotStore::new(self.state_path()).load().unwrap()
        }

        fn history(&self) -> crate::domain::check_history::CheckHistory {
            JsonFileCheckStore::new(self.dir.path().join("monitor_status.json"))
                .load()
                .unwrap()
                .unwrap()
        }

        fn log(&self) -> Vec<String> {
            FileLogSink::new(self.dir.path().join("monitor.log"))
                .tail(100)
                .unwrap()
        }
    }

    #[tokio::test]
    async fn test_first_poll_is_initial_scan_and_second_is_unchanged() {
        let h = Harness::new(ScriptedSource::new(vec![Step::Rows(vec![(1, "A"), (2, "B")])]));

        let first = h.poller.poll_once().await.unwrap();
        assert_eq!(first.kind(), ChangeKind::InitialScan);
        assert_eq!(h.stored().unwrap().row_count, 2);

        let second = h.poller.poll_once().await.unwrap();
        assert_eq!(second, ChangeEvent::Unchanged { row_count: 2 });
    }

    #[tokio::test]
    async fn test_insert_is_detected_and_logged_then_persisted() {
        let h = Harness::new(ScriptedSource::new(vec![
            Step::Rows(vec![(1, "A"), (2, "B")]),
            Step::Rows(vec![(1, "A"), (2, "B"), (3, "C")]),
        ]));
        h.poller.poll_once().await.unwrap();

        let ev = h.poller.poll_once().await.unwrap();
        assert_eq!(ev.listed_records(), &[Record::new(3, "C")]);

        let stored = h.stored().unwrap();
        assert_eq!(stored.row_count, 3);
        assert_eq!(stored.max_key, Some(3));

        let log = h.log();
        assert!(log.iter().any(|l| l.contains("NEW RECORDS DETECTED")), "{log:#?}");
        assert!(log.iter().any(|l| l.ends_with("1. ID: 3, Name: C")), "{log:#?}");
    }

    #[tokio::test]
    async fn test_delete_and_modify_are_classified() {
        let h = Harness::new(ScriptedSource::new(vec![
            Step::Rows(vec![(1, "A"), (2, "B"), (3, "C"), (4, "D"), (5, "E")]),
            Step::Rows(vec![(1, "A"), (2, "B"), (3, "C")]),
            Step::Rows(vec![(1, "A"), (2, "B"), (3, "Z")]),
        ]));
        h.poller.poll_once().await.unwrap();

        let deleted = h.poller.poll_once().await.unwrap();
        assert!(matches!(deleted, ChangeEvent::Deleted { removed: 2, .. }));

        let modified = h.poller.poll_once().await.unwrap();
        assert_eq!(modified.kind(), ChangeKind::Modified);
    }

    #[tokio::test]
    async fn test_corrupt_state_fails_the_cycle_without_touching_the_file() {
        let h = Harness::new(ScriptedSource::new(vec![Step::Rows(vec![(1, "A")])]));
        std::fs::write(h.state_path(), "{ truncated").unwrap();

        let err = h.poller.poll_once().await.unwrap_err();
        assert!(
            matches!(err, MonitorError::Persistence(PersistenceError::Corrupt { .. })),
            "got: {err:?}"
        );
        assert_eq!(std::fs::read_to_string(h.state_path()).unwrap(), "{ truncated");

        let history = h.history();
        assert_eq!(history.consecutive_failures, 1);
        assert_eq!(history.last_success_at, None);
        assert_eq!(history.last_error.unwrap().kind, "persistence");
    }

    #[tokio::test]
    async fn test_unreachable_source_leaves_state_untouched_and_is_visible_in_history() {
        let h = Harness::new(ScriptedSource::new(vec![
            Step::Rows(vec![(1, "A")]),
            Step::Unreachable,
        ]));
        h.poller.poll_once().await.unwrap();
        let before = h.stored().unwrap();

        let err = h.poller.poll_once().await.unwrap_err();
        assert_eq!(err.kind(), "connection");
        assert_eq!(h.stored().unwrap(), before);

        let history = h.history();
        assert!(history.last_success_at.is_some());
        assert!(history.last_attempt_at >= history.last_success_at);
        assert_eq!(history.consecutive_failures, 1);
        assert!(h.log().iter().any(|l| l.contains("failed [connection]")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_cycle_waits_backoff_then_resumes_interval() {
        let (trigger, shutdown) = Shutdown::new();
        let source = ScriptedSource::new(vec![
            Step::Rows(vec![(1, "A")]),
            Step::Unreachable,
            Step::Rows(vec![(1, "A"), (2, "B")]),
        ])
        .stopping_after(4, trigger);
        let h = Harness::with_settings(
            source,
            PollerSettings::new(Duration::from_secs(3600), Duration::from_secs(60)),
        );

        h.poller.run_forever(shutdown).await;

        let at = h.source.captures();
        assert_eq!(at.len(), 4);
        assert_eq!(at[1] - at[0], Duration::from_secs(3600));
        assert_eq!(at[2] - at[1], Duration::from_secs(60));
        assert_eq!(at[3] - at[2], Duration::from_secs(3600));
        assert_eq!(h.poller.state(), PollerState::ShuttingDown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_a_cycle_lets_it_persist_before_exiting() {
        let (trigger, shutdown) = Shutdown::new();
        let source = ScriptedSource::new(vec![
            Step::Rows(vec![(1, "A")]),
            Step::Rows(vec![(1, "A"), (2, "B")]),
        ])
        .stopping_after(2, trigger);
        let h = Harness::new(source);

        h.poller.run_forever(shutdown).await;

        assert_eq!(h.source.captures().len(), 2);
        assert_eq!(h.stored().unwrap().row_count, 2);
        assert_eq!(h.history().last_event, Some(ChangeKind::Inserted));
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_moves_through_polling_and_sleeping() {
        let (trigger, shutdown) = Shutdown::new();
        let h = Harness::new(ScriptedSource::new(vec![Step::Rows(vec![(1, "A")])]));
        let mut states = h.poller.subscribe_state();
        assert_eq!(*states.borrow(), PollerState::Idle);

        let run = h.poller.run_forever(shutdown);
        let observe = async {
            states.wait_for(|s| *s == PollerState::Sleeping).await.unwrap();
            trigger.trigger();
        };
        tokio::join!(run, observe);

        assert_eq!(h.poller.state(), PollerState::ShuttingDown);
    }

    #[test]
    fn test_backoff_is_capped_by_interval() {
        let s = PollerSettings::new(Duration::from_secs(30), Duration::from_secs(60));
        assert_eq!(s.failure_delay(), Duration::from_secs(30));
    }

    #[test]
    fn test_zero_backoff_still_waits_before_retrying() {
        let s = PollerSettings::new(Duration::from_secs(3600), Duration::ZERO);
        assert_eq!(s.failure_delay(), MIN_RETRY_BACKOFF);
        assert_eq!(s.delay_after(true), MIN_RETRY_BACKOFF);
        assert_eq!(s.delay_after(false), Duration::from_secs(3600));
    }

    #[test]
    fn test_scheduling_past_the_calendar_yields_none() {
        let now = Utc::now();
        assert!(scheduled_after(now, Duration::from_secs(1_000_000_000_000_000)).is_none());
        assert_eq!(
            scheduled_after(now, Duration::from_secs(60)),
            Some(now + chrono::Duration::seconds(60))
        );
    }

    #[tokio::test]
    async fn test_huge_interval_does_not_break_the_cycle() {
        let h = Harness::with_settings(
            ScriptedSource::new(vec![Step::Rows(vec![(1, "A")])]),
            PollerSettings::new(
                Duration::from_secs(1_000_000_000_000_000),
                Duration::from_secs(60),
            ),
        );

        let ev = h.poller.poll_once().await.unwrap();
        assert_eq!(ev.kind(), ChangeKind::InitialScan);
        assert!(
            h.log().iter().any(|l| l.ends_with("Next check scheduled for: unknown")),
            "{:#?}",
            h.log()
        );
    }

    #[tokio::test]
    async fn test_corrupt_check_history_is_reported_and_left_in_place() {
        let h = Harness::new(ScriptedSource::new(vec![Step::Rows(vec![(1, "A")])]));
        let status_path = h.dir.path().join("monitor_status.json");
        std::fs::write(&status_path, "{ truncated").unwrap();

        let ev = h.poller.poll_once().await.unwrap();
        assert_eq!(ev.kind(), ChangeKind::InitialScan);
        assert_eq!(h.stored().unwrap().row_count, 1);

        assert_eq!(std::fs::read_to_string(&status_path).unwrap(), "{ truncated");
        let log = h.log();
        assert!(
            log.iter()
                .any(|l| l.contains(" - ERROR - ") && l.contains("Check history unreadable")),
            "{log:#?}"
        );
    }
}
