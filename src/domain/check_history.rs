use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::change_event::ChangeKind;
use crate::domain::errors::MonitorError;

/// The most recent failed cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckFailure {
    pub at: DateTime<Utc>,
    pub kind: String,
    pub message: String,
}

/// Attempt/success bookkeeping kept next to the snapshot.
///
/// The snapshot only changes on success, so on its own it cannot show a run
/// of failures. This record is updated after every cycle, whatever its
/// outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckHistory {
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_event: Option<ChangeKind>,
    pub consecutive_failures: u32,
    pub total_checks: u64,
    pub last_error: Option<CheckFailure>,
}

impl CheckHistory {
    pub fn record_success(&mut self, at: DateTime<Utc>, kind: ChangeKind) {
        self.last_attempt_at = Some(at);
        self.last_success_at = Some(at);
        self.last_event = Some(kind);
        self.consecutive_failures = 0;
        self.total_checks += 1;
    }

    pub fn record_failure(&mut self, at: DateTime<Utc>, err: &MonitorError) {
        self.last_attempt_at = Some(at);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.total_checks += 1;
        self.last_error = Some(CheckFailure {
            at,
            kind: err.kind().to_string(),
            message: err.to_string(),
        });
    }

    /// `true` when the latest attempt did not succeed.
    pub fn is_failing(&self) -> bool {
        self.consecutive_failures > 0
    }
}
