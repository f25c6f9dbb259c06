use std::fmt;
use std::sync::Arc;

use crate::command::Command;
use crate::config::ConnectionString;
use crate::connection::{AsyncDatabaseExecutor, ConnectionStats, ScopedConnection};
use crate::error::VsqlError;
use crate::params::ParamSet;
use crate::row::Row;
use crate::transaction::{TxOutcome, TxState, TxTracker, run_tracked};
use crate::types::RowValues;

/// The operation a log line or error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Execute,
    FetchScalar,
    FetchAll,
    Transaction,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationKind::Execute => "execute",
            OperationKind::FetchScalar => "fetch_scalar",
            OperationKind::FetchAll => "fetch_all",
            OperationKind::Transaction => "transaction",
        })
    }
}

/// Runs each operation on its own connection.
///
/// The `try_*` methods return the error; the plain methods log it once at
/// `ERROR` and return the operation's safe default instead:
///
/// | operation      | default        |
/// |----------------|----------------|
/// | `execute`      | `0`            |
/// | `fetch_scalar` | `Null`         |
/// | `fetch_all`    | no rows        |
/// | `transaction`  | `false`        |
#[derive(Debug, Clone, Default)]
pub struct QueryExecutor {
    stats: Arc<ConnectionStats>,
}

impl QueryExecutor {
    #[must_use]
    pub fn new(stats: Arc<ConnectionStats>) -> Self {
        Self { stats }
    }

    #[must_use]
    pub fn stats(&self) -> &Arc<ConnectionStats> {
        &self.stats
    }

    /// # Errors
    /// Returns connection, parameter or execution errors.
    pub async fn try_execute(
        &self,
        connection_string: &ConnectionString,
        query: &str,
        params: &ParamSet,
    ) -> Result<u64, VsqlError> {
        let mut conn = ScopedConnection::open(connection_string, &self.stats).await?;
        let result = conn.execute_non_query(&Command::new(query, params)).await;
        conn.close().await;
        result
    }

    /// # Errors
    /// Returns connection, parameter or execution errors.
    pub async fn try_fetch_scalar(
        &self,
        connection_string: &ConnectionString,
        query: &str,
        params: &ParamSet,
    ) -> Result<RowValues, VsqlError> {
        let mut conn = ScopedConnection::open(connection_string, &self.stats).await?;
        let result = conn.execute_scalar(&Command::new(query, params)).await;
        conn.close().await;
        result
    }

    /// # Errors
    /// Returns connection, parameter or execution errors.
    pub async fn try_fetch_all(
        &self,
        connection_string: &ConnectionString,
        query: &str,
        params: &ParamSet,
    ) -> Result<Vec<Row>, VsqlError> {
        let mut conn = ScopedConnection::open(connection_string, &self.stats).await?;
        let result = conn.execute_reader(&Command::new(query, params)).await;
        conn.close().await;
        result
    }

    /// Run `queries` as one transaction.
    ///
    /// # Errors
    /// Returns an error when the connection cannot be opened or `BEGIN`
    /// fails. Statement, commit and rollback failures are reported in the
    /// [`TxOutcome`] and have already been logged.
    pub async fn try_transaction(
        &self,
        connection_string: &ConnectionString,
        queries: &[String],
        params: &ParamSet,
    ) -> Result<TxOutcome, VsqlError> {
        let mut tracker = TxTracker::new();
        let mut conn = ScopedConnection::open(connection_string, &self.stats).await?;
        tracker.enter(TxState::ConnectionOpen);
        let result = run_tracked(&mut conn, queries, params, &mut tracker).await;
        conn.close().await;
        tracker.enter(TxState::Closed);
        result
    }

    pub async fn execute(
        &self,
        connection_string: &ConnectionString,
        query: &str,
        params: &ParamSet,
    ) -> u64 {
        let result = self.try_execute(connection_string, query, params).await;
        or_default(OperationKind::Execute, result)
    }

    pub async fn fetch_scalar(
        &self,
        connection_string: &ConnectionString,
        query: &str,
        params: &ParamSet,
    ) -> RowValues {
        let result = self.try_fetch_scalar(connection_string, query, params).await;
        or_default(OperationKind::FetchScalar, result)
    }

    pub async fn fetch_all(
        &self,
        connection_string: &ConnectionString,
        query: &str,
        params: &ParamSet,
    ) -> Vec<Row> {
        let result = self.try_fetch_all(connection_string, query, params).await;
        or_default(OperationKind::FetchAll, result)
    }

    /// `true` only if every statement ran and the commit succeeded.
    pub async fn transaction(
        &self,
        connection_string: &ConnectionString,
        queries: &[String],
        params: &ParamSet,
    ) -> bool {
        match self
            .try_transaction(connection_string, queries, params)
            .await
        {
            Ok(outcome) => outcome.is_committed(),
            Err(err) => {
                log_failure(OperationKind::Transaction, &err);
                false
            }
        }
    }
}

fn or_default<T: Default>(operation: OperationKind, result: Result<T, VsqlError>) -> T {
    result.unwrap_or_else(|err| {
        log_failure(operation, &err);
        T::default()
    })
}

fn log_failure(operation: OperationKind, err: &VsqlError) {
    tracing::error!(
        operation = %operation,
        category = err.category(),
        error = %err,
        "database operation failed"
    );
}
