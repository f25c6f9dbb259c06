use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tokio_postgres::types::Type;

use crate::error::VsqlError;
use crate::row::{Row, RowShape};
use crate::types::RowValues;

/// Extracts a `RowValues` from a `tokio_postgres` Row at the given index.
///
/// Types without a dedicated mapping are read as text, which fails for
/// binary-only types such as `numeric`; cast those in SQL (`amount::float8`).
///
/// # Errors
/// Returns `VsqlError` if the column cannot be decoded.
pub fn postgres_extract_value(
    row: &tokio_postgres::Row,
    idx: usize,
) -> Result<RowValues, VsqlError> {
    let type_info = row.columns()[idx].type_();

    let value = match *type_info {
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)?
            .map(|v| RowValues::Int(i64::from(v))),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(idx)?
            .map(|v| RowValues::Int(i64::from(v))),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.map(RowValues::Int),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)?
            .map(|v| RowValues::Float(f64::from(v))),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.map(RowValues::Float),
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.map(RowValues::Bool),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(RowValues::Timestamp),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(|v| RowValues::Timestamp(v.naive_utc())),
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(idx)?
            .map(|v| RowValues::Timestamp(v.and_time(chrono::NaiveTime::MIN))),
        Type::JSON | Type::JSONB => row.try_get::<_, Option<Value>>(idx)?.map(RowValues::JSON),
        Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(idx)?.map(RowValues::Blob),
        _ => row.try_get::<_, Option<String>>(idx)?.map(RowValues::Text),
    };
    Ok(value.unwrap_or(RowValues::Null))
}

/// Convert driver rows into [`Row`]s sharing one column layout.
///
/// # Errors
/// Returns errors from row value extraction.
pub fn build_rows(rows: &[tokio_postgres::Row]) -> Result<Vec<Row>, VsqlError> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let shape = RowShape::new(
        first
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect(),
    );

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let mut values = Vec::with_capacity(shape.len());
        for idx in 0..shape.len() {
            values.push(postgres_extract_value(row, idx)?);
        }
        out.push(shape.row(values));
    }
    Ok(out)
}

/// First column of the first row, or `Null`.
///
/// # Errors
/// Returns errors from value extraction.
pub fn first_cell(rows: &[tokio_postgres::Row]) -> Result<RowValues, VsqlError> {
    match rows.first() {
        Some(row) if !row.is_empty() => postgres_extract_value(row, 0),
        _ => Ok(RowValues::Null),
    }
}
