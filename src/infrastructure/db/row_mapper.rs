use sqlx::any::AnyRow;
use sqlx::{Column, Row, TypeInfo};

use crate::domain::errors::MonitorError;
use crate::domain::snapshot::Record;
use crate::domain::value_objects::MonitoredTable;

/// Convert a projection row into a [`Record`].
///
/// Columns are looked up by the aliases `build_projection_query` gives them,
/// so the select list order does not matter. A NULL identity is malformed
/// data.
pub fn row_to_record(row: &AnyRow, table: &MonitoredTable) -> Result<Record, MonitorError> {
    let id: Option<i64> = row.try_get(table.id_column.0.as_str())?;
    let id = id.ok_or_else(|| {
        MonitorError::DataSource(format!("identity column '{}' returned NULL", table.id_column.0))
    })?;
    let name = text_or_blob(row, &table.value_column.0)?;
    Ok(Record { id, name })
}

/// Read a column as text, handling MySQL's habit of returning converted
/// strings as BLOB to sqlx AnyRow.
fn text_or_blob(row: &AnyRow, column: &str) -> Result<Option<String>, MonitorError> {
    let type_name = row.try_column(column)?.type_info().name();
    if type_name == "BLOB" {
        let bytes: Option<Vec<u8>> = row.try_get(column)?;
        Ok(bytes.map(|b| String::from_utf8_lossy(&b).into_owned()))
    } else {
        Ok(row.try_get(column)?)
    }
}
