use rusqlite::Statement;
use rusqlite::types::Value;

use crate::error::VsqlError;
use crate::params::ParamSet;
use crate::types::RowValues;

/// Convert a single `RowValues` to a rusqlite `Value`.
#[must_use]
pub fn row_value_to_sqlite_value(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => Value::Integer(*i),
        RowValues::Float(f) => Value::Real(*f),
        RowValues::Text(s) => Value::Text(s.clone()),
        RowValues::Bool(b) => Value::Integer(i64::from(*b)),
        RowValues::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        RowValues::Null => Value::Null,
        RowValues::JSON(jval) => Value::Text(jval.to_string()),
        RowValues::Blob(bytes) => Value::Blob(bytes.clone()),
    }
}

/// Bind every named placeholder of `stmt` from `params`.
///
/// `SQLite` reports placeholder names with their sigil (`@id`, `:id`, `$id`);
/// the set is keyed without it. Entries the statement does not use are ignored.
///
/// # Errors
/// Returns `VsqlError::ParameterError` for a placeholder with no value or a
/// positional (`?`) placeholder, and `VsqlError::SqliteError` if binding fails.
pub fn bind_named(stmt: &mut Statement<'_>, params: &ParamSet) -> Result<(), VsqlError> {
    for idx in 1..=stmt.parameter_count() {
        let Some(name) = stmt.parameter_name(idx).map(str::to_owned) else {
            return Err(VsqlError::ParameterError(format!(
                "positional placeholder #{idx} is not supported; use @name"
            )));
        };
        if name.starts_with('?') {
            return Err(VsqlError::ParameterError(format!(
                "positional placeholder {name} is not supported; use @name"
            )));
        }
        let value = params
            .get(&name)
            .ok_or_else(|| VsqlError::ParameterError(format!("parameter {name} must be defined")))?;
        stmt.raw_bind_parameter(idx, row_value_to_sqlite_value(value))?;
    }
    Ok(())
}
