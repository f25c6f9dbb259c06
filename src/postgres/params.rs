use std::borrow::Cow;
use std::error::Error;

use chrono::{TimeZone, Utc};
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_util::bytes;

use crate::command::Command;
use crate::error::VsqlError;
use crate::types::RowValues;

use super::placeholders::rewrite_named;

/// A command ready for `tokio-postgres`: positional SQL plus values in `$n` order.
pub struct BoundCommand<'c> {
    pub sql: Cow<'c, str>,
    values: Vec<&'c RowValues>,
}

impl<'c> BoundCommand<'c> {
    /// Rewrite the command's named placeholders and look up a value for each.
    ///
    /// # Errors
    /// Returns `VsqlError::ParameterError` if a placeholder has no value.
    pub fn bind(command: &'c Command<'_>) -> Result<Self, VsqlError> {
        let positional = rewrite_named(command.text());
        let mut values = Vec::with_capacity(positional.names.len());
        for name in &positional.names {
            let value = command.params().get(name).ok_or_else(|| {
                VsqlError::ParameterError(format!("parameter @{name} must be defined"))
            })?;
            values.push(value);
        }
        Ok(Self {
            sql: positional.sql,
            values,
        })
    }

    /// Borrow the values as driver parameters.
    #[must_use]
    pub fn as_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.values
            .iter()
            .map(|v| *v as &(dyn ToSql + Sync))
            .collect()
    }
}

fn mismatch(value: &RowValues, ty: &Type) -> Box<dyn Error + Sync + Send> {
    format!("cannot bind {} value to postgres type {ty}", value.kind()).into()
}

fn is_text_type(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN
    )
}

impl ToSql for RowValues {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            RowValues::Null => Ok(IsNull::Yes),
            RowValues::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                Type::INT8 => i.to_sql(ty, out),
                #[allow(clippy::cast_precision_loss)]
                Type::FLOAT4 => (*i as f32).to_sql(ty, out),
                #[allow(clippy::cast_precision_loss)]
                Type::FLOAT8 => (*i as f64).to_sql(ty, out),
                Type::BOOL => (*i != 0).to_sql(ty, out),
                _ if is_text_type(ty) => i.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            RowValues::Float(f) => match *ty {
                #[allow(clippy::cast_possible_truncation)]
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                Type::FLOAT8 => f.to_sql(ty, out),
                _ if is_text_type(ty) => f.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            RowValues::Bool(b) => match *ty {
                Type::BOOL => b.to_sql(ty, out),
                Type::INT2 => i16::from(*b).to_sql(ty, out),
                Type::INT4 => i32::from(*b).to_sql(ty, out),
                Type::INT8 => i64::from(*b).to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            RowValues::Text(s) => match *ty {
                Type::JSON | Type::JSONB => {
                    serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out)
                }
                _ if is_text_type(ty) => s.as_str().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            RowValues::Timestamp(dt) => match *ty {
                Type::TIMESTAMP => dt.to_sql(ty, out),
                Type::TIMESTAMPTZ => Utc.from_utc_datetime(dt).to_sql(ty, out),
                Type::DATE => dt.date().to_sql(ty, out),
                _ if is_text_type(ty) => dt.format("%F %T%.f").to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            RowValues::JSON(jsval) => match *ty {
                Type::JSON | Type::JSONB => jsval.to_sql(ty, out),
                _ if is_text_type(ty) => jsval.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            RowValues::Blob(blob) => match *ty {
                Type::BYTEA => blob.to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
        }
    }

    // Type checks happen per value in `to_sql`; a NULL binds to any column.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}
