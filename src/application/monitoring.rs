use crate::domain::errors::MonitorError;
use crate::domain::ports::TableSource;
use crate::domain::snapshot::Snapshot;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{info, instrument, warn};

// ─── CaptureStats ────────────────────────────────────────────────────────────

/// Accumulated capture timings for one monitor process.
#[derive(Debug, Default, Clone, Serialize)]
pub struct CaptureStats {
    pub captures: u64,
    pub failures: u64,
    pub last_rows: Option<u64>,
    pub last_duration_ms: Option<u128>,
    pub total_ms: u128,
}

impl CaptureStats {
    fn record(stats: &Mutex<Self>, duration_ms: u128, rows: Option<u64>) {
        if let Ok(mut s) = stats.lock() {
            s.captures += 1;
            s.total_ms += duration_ms;
            s.last_duration_ms = Some(duration_ms);
            match rows {
                Some(n) => s.last_rows = Some(n),
                None => s.failures += 1,
            }
        }
    }
}

// ─── TimedTableSource ────────────────────────────────────────────────────────

/// Decorator: wraps any `TableSource`, measures wall time per `capture`
/// call, and accumulates it in a shared [`CaptureStats`].
pub struct TimedTableSource {
    inner: Arc<dyn TableSource>,
    label: String,
    stats: Arc<Mutex<CaptureStats>>,
}

impl TimedTableSource {
    pub fn new(inner: Arc<dyn TableSource>, label: impl Into<String>) -> Self {
        Self {
            inner,
            label: label.into(),
            stats: Arc::new(Mutex::new(CaptureStats::default())),
        }
    }

    pub fn stats(&self) -> CaptureStats {
        self.stats
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TableSource for TimedTableSource {
    #[instrument(
        name = "capture",
        skip(self),
        fields(db.table = %self.label),
        level = "info"
    )]
    async fn capture(&self) -> Result<Snapshot, MonitorError> {
        let start = Instant::now();
        let result = self.inner.capture().await;
        let duration_ms = start.elapsed().as_millis();

        match &result {
            Ok(snap) => {
                info!(table = %self.label, rows = snap.row_count, max_id = ?snap.max_key, duration_ms, "capture completed");
                CaptureStats::record(&self.stats, duration_ms, Some(snap.row_count));
            }
            Err(err) => {
                warn!(table = %self.label, kind = err.kind(), duration_ms, "capture failed");
                CaptureStats::record(&self.stats, duration_ms, None);
            }
        }

        result
    }
}
