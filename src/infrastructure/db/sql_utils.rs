use crate::domain::value_objects::MonitoredTable;
use crate::infrastructure::db::dialect::Dialect;

// ─────────────────────────────────────────────────────────────────────────────
// Query builders
// ─────────────────────────────────────────────────────────────────────────────

/// The three read shapes a capture needs, built once per source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureQueries {
    pub count: String,
    pub projection: String,
    pub max_key: String,
}

fn qualified_table(table: &MonitoredTable, dialect: &dyn Dialect) -> String {
    format!(
        "{}{}",
        dialect.schema_prefix(&table.schema.0),
        dialect.quote_ident(&table.table.0)
    )
}

/// `SELECT COUNT(*) FROM <schema>.<table>`
pub fn build_count_query(table: &MonitoredTable, dialect: &dyn Dialect) -> String {
    format!(
        "SELECT {} FROM {}",
        dialect.cast_to_bigint("COUNT(*)"),
        qualified_table(table, dialect)
    )
}

/// `SELECT <id>, <value> FROM <schema>.<table> ORDER BY <id>`, with the casts
/// that make both columns decodable through `AnyRow`.
pub fn build_projection_query(table: &MonitoredTable, dialect: &dyn Dialect) -> String {
    let id = dialect.quote_ident(&table.id_column.0);
    let value = dialect.quote_ident(&table.value_column.0);
    format!(
        "SELECT {} AS {}, {} AS {} FROM {} ORDER BY {}",
        dialect.cast_to_bigint(&id),
        id,
        dialect.cast_to_text(&value),
        value,
        qualified_table(table, dialect),
        id
    )
}

/// `SELECT MAX(<id>) FROM <schema>.<table>`
pub fn build_max_key_query(table: &MonitoredTable, dialect: &dyn Dialect) -> String {
    let id = dialect.quote_ident(&table.id_column.0);
    format!(
        "SELECT {} FROM {}",
        dialect.cast_to_bigint(&format!("MAX({})", id)),
        qualified_table(table, dialect)
    )
}

pub fn build_capture_queries(table: &MonitoredTable, dialect: &dyn Dialect) -> CaptureQueries {
    CaptureQueries {
        count: build_count_query(table, dialect),
        projection: build_projection_query(table, dialect),
        max_key: build_max_key_query(table, dialect),
    }
}
