use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of the monitored table, reduced to its identity and value columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    /// Value column rendered as text. `None` when the column is NULL.
    pub name: Option<String>,
}

impl Record {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
        }
    }
}

/// Full observed state of the monitored table at one point in time.
///
/// The serialised layout is the on-disk state file format read by dashboards:
/// `{timestamp, record_count, max_id, records: [{id, name}]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "timestamp")]
    pub captured_at: DateTime<Utc>,
    #[serde(rename = "record_count")]
    pub row_count: u64,
    #[serde(rename = "max_id")]
    pub max_key: Option<i64>,
    /// Ordered by `id`, ids unique.
    pub records: Vec<Record>,
}

impl Snapshot {
    /// Build a snapshot whose count and high-water mark are derived from
    /// `records`, so the invariants hold by construction.
    pub fn from_records(captured_at: DateTime<Utc>, mut records: Vec<Record>) -> Self {
        records.sort_by_key(|r| r.id);
        let max_key = records.last().map(|r| r.id);
        Self {
            captured_at,
            row_count: records.len() as u64,
            max_key,
            records,
        }
    }

    /// `id -> value` view used for set difference and modification checks.
    pub fn value_map(&self) -> BTreeMap<i64, Option<&str>> {
        self.records
            .iter()
            .map(|r| (r.id, r.name.as_deref()))
            .collect()
    }

    /// Describe every broken invariant of this snapshot.
    ///
    /// Count, projection and max are three separate reads, so a row written
    /// between them leaves the snapshot internally inconsistent. Callers log
    /// these; they are not fatal.
    pub fn consistency_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.records.len() as u64 != self.row_count {
            issues.push(format!(
                "record_count is {} but {} records were read",
                self.row_count,
                self.records.len()
            ));
        }

        let observed_max = self.records.iter().map(|r| r.id).max();
        if observed_max != self.max_key {
            issues.push(format!(
                "max_id is {} but the highest record id is {}",
                fmt_key(self.max_key),
                fmt_key(observed_max)
            ));
        }

        let distinct = self.value_map().len();
        if distinct != self.records.len() {
            issues.push(format!(
                "{} duplicate id(s) in records",
                self.records.len() - distinct
            ));
        }

        issues
    }
}

fn fmt_key(key: Option<i64>) -> String {
    key.map_or_else(|| "null".to_string(), |k| k.to_string())
}
