use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::snapshot::Record;

/// Discriminant of a [`ChangeEvent`], handy for logs and status output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    InitialScan,
    Inserted,
    Deleted,
    Modified,
    Unchanged,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeKind::InitialScan => "initial_scan",
            ChangeKind::Inserted => "inserted",
            ChangeKind::Deleted => "deleted",
            ChangeKind::Modified => "modified",
            ChangeKind::Unchanged => "unchanged",
        };
        f.write_str(s)
    }
}

/// Classified result of comparing two consecutive snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeEvent {
    /// No previous snapshot existed; `records` is the full current set.
    InitialScan { row_count: u64, records: Vec<Record> },

    /// Row count grew. `records` holds rows whose id was not present before;
    /// an existing id with a new value is not an insert.
    Inserted {
        previous_count: u64,
        current_count: u64,
        records: Vec<Record>,
    },

    /// Row count shrank by `removed`, whichever ids went away.
    Deleted {
        previous_count: u64,
        current_count: u64,
        removed: u64,
    },

    /// Same row count, but at least one shared id carries a different value.
    /// No field-level diff is computed.
    Modified { row_count: u64, modified: bool },

    Unchanged { row_count: u64 },
}

impl ChangeEvent {
    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeEvent::InitialScan { .. } => ChangeKind::InitialScan,
            ChangeEvent::Inserted { .. } => ChangeKind::Inserted,
            ChangeEvent::Deleted { .. } => ChangeKind::Deleted,
            ChangeEvent::Modified { .. } => ChangeKind::Modified,
            ChangeEvent::Unchanged { .. } => ChangeKind::Unchanged,
        }
    }

    /// `true` for every kind that an operator should be alerted about.
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            ChangeEvent::Inserted { .. } | ChangeEvent::Deleted { .. } | ChangeEvent::Modified { .. }
        )
    }

    /// One-line human-readable summary.
    pub fn message(&self) -> String {
        match self {
            ChangeEvent::InitialScan { row_count, .. } => {
                format!("Initial scan: found {row_count} existing record(s)")
            }
            ChangeEvent::Inserted {
                previous_count,
                current_count,
                records,
            } => format!(
                "NEW RECORDS DETECTED: {} record(s) added ({} -> {}), {} new id(s)",
                current_count - previous_count,
                previous_count,
                current_count,
                records.len()
            ),
            ChangeEvent::Deleted {
                previous_count,
                current_count,
                removed,
            } => format!(
                "RECORDS DELETED: {removed} record(s) removed ({previous_count} -> {current_count})"
            ),
            ChangeEvent::Modified { row_count, .. } => {
                format!("Records modified: same count ({row_count}) but different data")
            }
            ChangeEvent::Unchanged { row_count } => {
                format!("No changes detected. Current count: {row_count}")
            }
        }
    }

    /// Records worth listing one per line under the summary.
    pub fn listed_records(&self) -> &[Record] {
        match self {
            ChangeEvent::Inserted { records, .. } => records,
            _ => &[],
        }
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inserted_message_reports_delta() {
        let ev = ChangeEvent::Inserted {
            previous_count: 2,
            current_count: 3,
            records: vec![Record::new(3, "C")],
        };
        assert_eq!(ev.kind(), ChangeKind::Inserted);
        assert!(ev.is_change());
        assert!(ev.message().contains("1 record(s) added"), "got: {}", ev);
        assert_eq!(ev.listed_records().len(), 1);
    }

    #[test]
    fn test_unchanged_and_initial_scan_are_not_alerts() {
        assert!(!ChangeEvent::Unchanged { row_count: 4 }.is_change());
        assert!(!ChangeEvent::InitialScan {
            row_count: 0,
            records: vec![]
        }
        .is_change());
    }

    #[test]
    fn test_serialises_with_kind_tag() {
        let ev = ChangeEvent::Deleted {
            previous_count: 5,
            current_count: 3,
            removed: 2,
        };
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["kind"], json!("deleted"));
        assert_eq!(v["removed"], json!(2));
    }
}
