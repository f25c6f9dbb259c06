use rusqlite::Statement;
use rusqlite::types::Value;

use crate::error::VsqlError;
use crate::row::{Row, RowShape};
use crate::types::RowValues;

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
///
/// Returns `VsqlError` if the value cannot be read.
pub fn sqlite_extract_value(row: &rusqlite::Row<'_>, idx: usize) -> Result<RowValues, VsqlError> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => RowValues::Float(f),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(b) => RowValues::Blob(b),
    })
}

/// Step a bound statement to exhaustion, materializing every row.
///
/// # Errors
/// Returns `VsqlError::SqliteError` if stepping or reading a column fails.
pub fn read_rows(stmt: &mut Statement<'_>) -> Result<Vec<Row>, VsqlError> {
    let shape = RowShape::new(
        stmt.column_names()
            .iter()
            .map(std::string::ToString::to_string)
            .collect(),
    );
    let col_count = shape.len();

    let mut rows = stmt.raw_query();
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            values.push(sqlite_extract_value(row, i)?);
        }
        out.push(shape.row(values));
    }
    Ok(out)
}

/// First column of the first row, or `Null` when there is no row.
///
/// # Errors
/// Returns `VsqlError::SqliteError` if stepping or reading fails.
pub fn read_scalar(stmt: &mut Statement<'_>) -> Result<RowValues, VsqlError> {
    if stmt.column_count() == 0 {
        stmt.raw_execute()?;
        return Ok(RowValues::Null);
    }
    let mut rows = stmt.raw_query();
    match rows.next()? {
        Some(row) => sqlite_extract_value(row, 0),
        None => Ok(RowValues::Null),
    }
}
