use serde::{Deserialize, Serialize};
use std::fmt;

/// Newtype to avoid confusion between schema names
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Schema(pub String);

/// Newtype for table names
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableName(pub String);

/// Newtype for column names
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ColumnName(pub String);

/// The one table a poller watches, and which two columns it projects.
///
/// `id_column` is the identity column: unique per row, used as the key for
/// every comparison and as the high-water mark. `value_column` is the single
/// payload column whose changes are detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredTable {
    pub schema: Schema,
    pub table: TableName,
    pub id_column: ColumnName,
    pub value_column: ColumnName,
}

impl fmt::Display for MonitoredTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.schema.0.is_empty() {
            write!(f, "{}", self.table.0)
        } else {
            write!(f, "{}.{}", self.schema.0, self.table.0)
        }
    }
}
