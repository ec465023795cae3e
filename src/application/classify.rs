use std::collections::BTreeSet;

use crate::domain::change_event::ChangeEvent;
use crate::domain::snapshot::{Record, Snapshot};

/// Compare two consecutive snapshots and classify the change.
///
/// Row counts decide first: growth is an insert, shrinkage a delete. Only
/// when counts match are the `id -> value` mappings compared, and any
/// difference (a changed value, or one id swapped for another) is reported
/// as a modification.
pub fn classify(previous: Option<&Snapshot>, current: &Snapshot) -> ChangeEvent {
    let Some(previous) = previous else {
        return ChangeEvent::InitialScan {
            row_count: current.row_count,
            records: current.records.clone(),
        };
    };

    if current.row_count > previous.row_count {
        ChangeEvent::Inserted {
            previous_count: previous.row_count,
            current_count: current.row_count,
            records: new_ids(previous, current),
        }
    } else if current.row_count < previous.row_count {
        ChangeEvent::Deleted {
            previous_count: previous.row_count,
            current_count: current.row_count,
            removed: previous.row_count - current.row_count,
        }
    } else if previous.value_map() != current.value_map() {
        ChangeEvent::Modified {
            row_count: current.row_count,
            modified: true,
        }
    } else {
        ChangeEvent::Unchanged {
            row_count: current.row_count,
        }
    }
}

/// Records of `current` whose id does not appear in `previous`.
/// Keyed by id only: an existing id with a new value is not new.
fn new_ids(previous: &Snapshot, current: &Snapshot) -> Vec<Record> {
    let known: BTreeSet<i64> = previous.records.iter().map(|r| r.id).collect();
    current
        .records
        .iter()
        .filter(|r| !known.contains(&r.id))
        .cloned()
        .collect()
}
