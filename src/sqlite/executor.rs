use crate::command::Command;
use crate::error::VsqlError;
use crate::row::Row;
use crate::types::RowValues;

use super::connection::SqliteConnection;
use super::params::bind_named;
use super::query::{read_rows, read_scalar};

/// Run a statement as a non-query and return the number of rows changed.
///
/// # Errors
/// Returns `VsqlError` if preparing, binding or stepping the statement fails.
pub async fn execute_non_query(
    conn: &SqliteConnection,
    command: &Command<'_>,
) -> Result<u64, VsqlError> {
    let sql = command.text().to_owned();
    let params = command.params().clone();
    conn.with_connection(move |raw| {
        let mut stmt = raw.prepare(&sql)?;
        bind_named(&mut stmt, &params)?;
        if stmt.column_count() == 0 {
            let changed = stmt.raw_execute()?;
            return affected_count(changed);
        }
        // `RETURNING`, `SELECT` and row-returning pragmas: step to the end and discard rows
        let read_only = stmt.readonly();
        let mut rows = stmt.raw_query();
        while rows.next()?.is_some() {}
        drop(rows);
        if read_only {
            Ok(0)
        } else {
            affected_count(raw.changes())
        }
    })
    .await
}

fn affected_count<N: TryInto<u64>>(changed: N) -> Result<u64, VsqlError>
where
    N::Error: std::fmt::Display,
{
    changed
        .try_into()
        .map_err(|e| VsqlError::ExecutionError(format!("invalid rows affected count: {e}")))
}

/// Run a statement and return the first cell of the first row.
///
/// # Errors
/// Returns `VsqlError` if preparing, binding or reading fails.
pub async fn execute_scalar(
    conn: &SqliteConnection,
    command: &Command<'_>,
) -> Result<RowValues, VsqlError> {
    let sql = command.text().to_owned();
    let params = command.params().clone();
    conn.with_connection(move |raw| {
        let mut stmt = raw.prepare(&sql)?;
        bind_named(&mut stmt, &params)?;
        read_scalar(&mut stmt)
    })
    .await
}

/// Run a statement and materialize every row it returns.
///
/// # Errors
/// Returns `VsqlError` if preparing, binding or reading fails.
pub async fn execute_reader(
    conn: &SqliteConnection,
    command: &Command<'_>,
) -> Result<Vec<Row>, VsqlError> {
    let sql = command.text().to_owned();
    let params = command.params().clone();
    conn.with_connection(move |raw| {
        let mut stmt = raw.prepare(&sql)?;
        bind_named(&mut stmt, &params)?;
        read_rows(&mut stmt)
    })
    .await
}

/// `BEGIN IMMEDIATE` takes the write lock up front so two concurrent
/// transactions wait on the busy timeout instead of deadlocking on upgrade.
///
/// # Errors
/// Returns `VsqlError::TransactionError` if a transaction is already open,
/// or `VsqlError::SqliteError` if `BEGIN` fails.
pub async fn begin(conn: &SqliteConnection) -> Result<(), VsqlError> {
    conn.with_connection(|raw| {
        if !raw.is_autocommit() {
            return Err(VsqlError::TransactionError(
                "SQLite transaction already in progress".into(),
            ));
        }
        raw.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    })
    .await
}

/// # Errors
/// Returns `VsqlError::SqliteError` if `COMMIT` fails.
pub async fn commit(conn: &SqliteConnection) -> Result<(), VsqlError> {
    conn.with_connection(|raw| {
        raw.execute_batch("COMMIT")?;
        Ok(())
    })
    .await
}

/// # Errors
/// Returns `VsqlError::SqliteError` if `ROLLBACK` fails.
pub async fn rollback(conn: &SqliteConnection) -> Result<(), VsqlError> {
    conn.with_connection(|raw| {
        raw.execute_batch("ROLLBACK")?;
        Ok(())
    })
    .await
}
