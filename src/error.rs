use thiserror::Error;

#[cfg(feature = "sqlite")]
use rusqlite;
#[cfg(feature = "postgres")]
use tokio_postgres;

#[derive(Debug, Error)]
pub enum VsqlError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Transaction error: {0}")]
    TransactionError(String),

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),
}

impl VsqlError {
    /// Broad failure category used in diagnostics.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            VsqlError::ConfigError(_) | VsqlError::ConnectionError(_) | VsqlError::Io(_) => {
                "connection"
            }
            VsqlError::TransactionError(_) => "transaction",
            VsqlError::Unimplemented(_) => "unsupported",
            _ => "command",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_failure_origin() {
        assert_eq!(VsqlError::ConfigError("x".into()).category(), "connection");
        assert_eq!(VsqlError::ParameterError("x".into()).category(), "command");
        assert_eq!(
            VsqlError::TransactionError("x".into()).category(),
            "transaction"
        );
    }

    #[test]
    fn display_includes_message() {
        let err = VsqlError::ParameterError("parameter @id must be defined".into());
        assert_eq!(
            err.to_string(),
            "Parameter error: parameter @id must be defined"
        );
    }
}
