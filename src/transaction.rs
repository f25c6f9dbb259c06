use std::fmt;

use crate::command::Command;
use crate::connection::AsyncDatabaseExecutor;
use crate::error::VsqlError;
use crate::params::ParamSet;

/// Where a transaction is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Idle,
    ConnectionOpen,
    TransactionBegun,
    Executing,
    Committed,
    RolledBack,
    Closed,
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TxState::Idle => "idle",
            TxState::ConnectionOpen => "connection_open",
            TxState::TransactionBegun => "transaction_begun",
            TxState::Executing => "executing",
            TxState::Committed => "committed",
            TxState::RolledBack => "rolled_back",
            TxState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Moves a transaction through its states, logging each transition at debug.
#[derive(Debug)]
pub(crate) struct TxTracker {
    state: TxState,
}

impl TxTracker {
    pub(crate) fn new() -> Self {
        Self {
            state: TxState::Idle,
        }
    }

    pub(crate) fn enter(&mut self, next: TxState) {
        tracing::debug!(from = %self.state, to = %next, "transaction state");
        self.state = next;
    }
}

/// How a transaction that got as far as `BEGIN` ended.
#[derive(Debug)]
pub enum TxOutcome {
    /// Every statement ran and `COMMIT` succeeded.
    Committed { statements: usize },
    /// A statement (or the commit, when `failed_statement` is `None`) failed
    /// and the rollback succeeded.
    RolledBack {
        failed_statement: Option<usize>,
        error: VsqlError,
    },
    /// The rollback after a failure failed too.
    RollbackFailed {
        failed_statement: Option<usize>,
        error: VsqlError,
        rollback_error: VsqlError,
    },
}

impl TxOutcome {
    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self, TxOutcome::Committed { .. })
    }

    /// Collapse the outcome into the number of statements committed.
    ///
    /// # Errors
    /// Returns `VsqlError::TransactionError` describing the failure for any
    /// outcome other than `Committed`.
    pub fn into_result(self) -> Result<usize, VsqlError> {
        match self {
            TxOutcome::Committed { statements } => Ok(statements),
            TxOutcome::RolledBack {
                failed_statement,
                error,
            } => Err(VsqlError::TransactionError(format!(
                "rolled back after {}: {error}",
                describe(failed_statement)
            ))),
            TxOutcome::RollbackFailed {
                failed_statement,
                error,
                rollback_error,
            } => Err(VsqlError::TransactionError(format!(
                "rollback failed ({rollback_error}) after {}: {error}",
                describe(failed_statement)
            ))),
        }
    }
}

fn describe(failed_statement: Option<usize>) -> String {
    match failed_statement {
        Some(idx) => format!("statement {idx} failed"),
        None => "commit failed".to_string(),
    }
}

/// Run `queries` in order inside one transaction on `conn`.
///
/// Every statement is executed as a non-query with the same `params`. The
/// first failure stops the sequence and triggers a rollback; a failed
/// `COMMIT` is treated the same way. Failures past `BEGIN` are logged here
/// and reported through the returned [`TxOutcome`].
///
/// # Errors
/// Returns the error from `BEGIN`; nothing has run at that point.
pub async fn run_transaction<E>(
    conn: &mut E,
    queries: &[String],
    params: &ParamSet,
) -> Result<TxOutcome, VsqlError>
where
    E: AsyncDatabaseExecutor + ?Sized,
{
    let mut tracker = TxTracker::new();
    tracker.enter(TxState::ConnectionOpen);
    run_tracked(conn, queries, params, &mut tracker).await
}

pub(crate) async fn run_tracked<E>(
    conn: &mut E,
    queries: &[String],
    params: &ParamSet,
    tracker: &mut TxTracker,
) -> Result<TxOutcome, VsqlError>
where
    E: AsyncDatabaseExecutor + ?Sized,
{
    conn.begin().await?;
    tracker.enter(TxState::TransactionBegun);

    let mut command = Command::new(String::new(), params);
    let mut failure: Option<(Option<usize>, VsqlError)> = None;

    tracker.enter(TxState::Executing);
    for (idx, query) in queries.iter().enumerate() {
        command.set_text(query.as_str());
        if let Err(err) = conn.execute_non_query(&command).await {
            failure = Some((Some(idx), err));
            break;
        }
    }

    let (failed_statement, error) = match failure {
        Some(failed) => failed,
        None => match conn.commit().await {
            Ok(()) => {
                tracker.enter(TxState::Committed);
                return Ok(TxOutcome::Committed {
                    statements: queries.len(),
                });
            }
            Err(err) => (None, err),
        },
    };

    tracing::error!(
        operation = "transaction",
        statement = ?failed_statement,
        error = %error,
        "transaction failed, rolling back"
    );

    match conn.rollback().await {
        Ok(()) => {
            tracker.enter(TxState::RolledBack);
            Ok(TxOutcome::RolledBack {
                failed_statement,
                error,
            })
        }
        Err(rollback_error) => {
            tracing::error!(
                operation = "transaction",
                error = %rollback_error,
                "rollback failed"
            );
            Ok(TxOutcome::RollbackFailed {
                failed_statement,
                error,
                rollback_error,
            })
        }
    }
}
