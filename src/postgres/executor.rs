use crate::command::Command;
use crate::error::VsqlError;
use crate::row::Row;
use crate::types::RowValues;

use super::config::PgSession;
use super::params::BoundCommand;
use super::query::{build_rows, first_cell};

/// Execute a non-query and return the affected row count.
///
/// # Errors
/// Returns errors from parameter binding or query execution.
pub async fn execute_non_query(
    session: &PgSession,
    command: &Command<'_>,
) -> Result<u64, VsqlError> {
    let bound = BoundCommand::bind(command)?;
    let affected = session.client.execute(bound.sql.as_ref(), &bound.as_refs()).await?;
    Ok(affected)
}

/// Execute a query and return its first cell.
///
/// # Errors
/// Returns errors from parameter binding, execution or value extraction.
pub async fn execute_scalar(
    session: &PgSession,
    command: &Command<'_>,
) -> Result<RowValues, VsqlError> {
    let bound = BoundCommand::bind(command)?;
    let rows = session.client.query(bound.sql.as_ref(), &bound.as_refs()).await?;
    first_cell(&rows)
}

/// Execute a query and materialize all rows.
///
/// # Errors
/// Returns errors from parameter binding, execution or value extraction.
pub async fn execute_reader(
    session: &PgSession,
    command: &Command<'_>,
) -> Result<Vec<Row>, VsqlError> {
    let bound = BoundCommand::bind(command)?;
    let rows = session.client.query(bound.sql.as_ref(), &bound.as_refs()).await?;
    build_rows(&rows)
}

/// Explicit `BEGIN`/`COMMIT`/`ROLLBACK` keep the client owned by the session
/// rather than borrowed by a `Transaction` guard.
///
/// # Errors
/// Returns `VsqlError::PostgresError` if the statement fails.
pub async fn begin(session: &PgSession) -> Result<(), VsqlError> {
    session.client.batch_execute("BEGIN").await?;
    Ok(())
}

/// # Errors
/// Returns `VsqlError::PostgresError` if the statement fails.
pub async fn commit(session: &PgSession) -> Result<(), VsqlError> {
    session.client.batch_execute("COMMIT").await?;
    Ok(())
}

/// # Errors
/// Returns `VsqlError::PostgresError` if the statement fails.
pub async fn rollback(session: &PgSession) -> Result<(), VsqlError> {
    session.client.batch_execute("ROLLBACK").await?;
    Ok(())
}
