use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::command::Command;
use crate::config::{ConnectionString, ConnectionTarget};
use crate::error::VsqlError;
use crate::row::Row;
use crate::types::{DatabaseType, RowValues};

#[cfg(feature = "postgres")]
use crate::postgres::{self, PgSession};
#[cfg(feature = "sqlite")]
use crate::sqlite::{self, SqliteConnection};

/// Counts of connections opened and closed by a bridge context.
///
/// Once every operation has finished the two counts are equal.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    opened: AtomicU64,
    closed: AtomicU64,
}

impl ConnectionStats {
    #[must_use]
    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn closed(&self) -> u64 {
        self.closed.load(Ordering::SeqCst)
    }

    /// Connections opened and not yet closed.
    #[must_use]
    pub fn open_now(&self) -> u64 {
        self.opened().saturating_sub(self.closed())
    }

    fn record_open(&self) {
        self.opened.fetch_add(1, Ordering::SeqCst);
    }

    fn record_close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// A live backend connection.
#[derive(Debug)]
pub enum DbConnection {
    #[cfg(feature = "postgres")]
    Postgres(PgSession),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteConnection),
}

impl DbConnection {
    async fn open(target: ConnectionTarget) -> Result<Self, VsqlError> {
        match target {
            #[cfg(feature = "postgres")]
            ConnectionTarget::Postgres(config) => {
                Ok(DbConnection::Postgres(PgSession::connect(&config).await?))
            }
            #[cfg(feature = "sqlite")]
            ConnectionTarget::Sqlite(path) => {
                Ok(DbConnection::Sqlite(SqliteConnection::open(&path).await?))
            }
        }
    }

    async fn close(self) -> Result<(), VsqlError> {
        match self {
            #[cfg(feature = "postgres")]
            DbConnection::Postgres(session) => {
                session.close().await;
                Ok(())
            }
            #[cfg(feature = "sqlite")]
            DbConnection::Sqlite(conn) => conn.close().await,
        }
    }

    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        match self {
            #[cfg(feature = "postgres")]
            DbConnection::Postgres(_) => DatabaseType::Postgres,
            #[cfg(feature = "sqlite")]
            DbConnection::Sqlite(_) => DatabaseType::Sqlite,
        }
    }
}

/// A connection owned by exactly one operation.
///
/// `close` is the normal exit. If the value is dropped instead (an early
/// return or a panic in the owning task) the backend connection is released
/// by its own destructor and still counted as closed, once.
#[derive(Debug)]
pub struct ScopedConnection {
    conn: Option<DbConnection>,
    stats: Arc<ConnectionStats>,
}

impl ScopedConnection {
    /// Parse the connection string and open a fresh connection.
    ///
    /// # Errors
    /// Returns `VsqlError::ConfigError` for an unusable connection string, or
    /// the backend's error if the connection cannot be established.
    pub async fn open(
        connection_string: &ConnectionString,
        stats: &Arc<ConnectionStats>,
    ) -> Result<Self, VsqlError> {
        let target = connection_string.target()?;
        let conn = DbConnection::open(target).await?;
        stats.record_open();
        Ok(Self {
            conn: Some(conn),
            stats: Arc::clone(stats),
        })
    }

    #[must_use]
    pub fn database_type(&self) -> Option<DatabaseType> {
        self.conn.as_ref().map(DbConnection::database_type)
    }

    /// Close the connection. A close error is logged and otherwise ignored:
    /// the operation's result is already decided.
    pub async fn close(mut self) {
        if let Some(conn) = self.conn.take() {
            self.stats.record_close();
            if let Err(err) = conn.close().await {
                tracing::debug!(error = %err, "error while closing connection");
            }
        }
    }

    fn live(&mut self) -> Result<&mut DbConnection, VsqlError> {
        self.conn
            .as_mut()
            .ok_or_else(|| VsqlError::ConnectionError("connection already closed".to_string()))
    }
}

impl Drop for ScopedConnection {
    fn drop(&mut self) {
        if self.conn.take().is_some() {
            self.stats.record_close();
        }
    }
}

/// The statement-level operations the query executor and transaction
/// orchestrator need from a connection.
#[async_trait]
pub trait AsyncDatabaseExecutor: Send {
    /// Run a non-query and return the affected row count.
    async fn execute_non_query(&mut self, command: &Command<'_>) -> Result<u64, VsqlError>;

    /// Run a query and return its first cell, or `Null`.
    async fn execute_scalar(&mut self, command: &Command<'_>) -> Result<RowValues, VsqlError>;

    /// Run a query and materialize every row.
    async fn execute_reader(&mut self, command: &Command<'_>) -> Result<Vec<Row>, VsqlError>;

    async fn begin(&mut self) -> Result<(), VsqlError>;

    async fn commit(&mut self) -> Result<(), VsqlError>;

    async fn rollback(&mut self) -> Result<(), VsqlError>;
}

#[async_trait]
impl AsyncDatabaseExecutor for ScopedConnection {
    async fn execute_non_query(&mut self, command: &Command<'_>) -> Result<u64, VsqlError> {
        match self.live()? {
            #[cfg(feature = "postgres")]
            DbConnection::Postgres(session) => {
                postgres::executor::execute_non_query(session, command).await
            }
            #[cfg(feature = "sqlite")]
            DbConnection::Sqlite(conn) => sqlite::executor::execute_non_query(conn, command).await,
        }
    }

    async fn execute_scalar(&mut self, command: &Command<'_>) -> Result<RowValues, VsqlError> {
        match self.live()? {
            #[cfg(feature = "postgres")]
            DbConnection::Postgres(session) => {
                postgres::executor::execute_scalar(session, command).await
            }
            #[cfg(feature = "sqlite")]
            DbConnection::Sqlite(conn) => sqlite::executor::execute_scalar(conn, command).await,
        }
    }

    async fn execute_reader(&mut self, command: &Command<'_>) -> Result<Vec<Row>, VsqlError> {
        match self.live()? {
            #[cfg(feature = "postgres")]
            DbConnection::Postgres(session) => {
                postgres::executor::execute_reader(session, command).await
            }
            #[cfg(feature = "sqlite")]
            DbConnection::Sqlite(conn) => sqlite::executor::execute_reader(conn, command).await,
        }
    }

    async fn begin(&mut self) -> Result<(), VsqlError> {
        match self.live()? {
            #[cfg(feature = "postgres")]
            DbConnection::Postgres(session) => postgres::executor::begin(session).await,
            #[cfg(feature = "sqlite")]
            DbConnection::Sqlite(conn) => sqlite::executor::begin(conn).await,
        }
    }

    async fn commit(&mut self) -> Result<(), VsqlError> {
        match self.live()? {
            #[cfg(feature = "postgres")]
            DbConnection::Postgres(session) => postgres::executor::commit(session).await,
            #[cfg(feature = "sqlite")]
            DbConnection::Sqlite(conn) => sqlite::executor::commit(conn).await,
        }
    }

    async fn rollback(&mut self) -> Result<(), VsqlError> {
        match self.live()? {
            #[cfg(feature = "postgres")]
            DbConnection::Postgres(session) => postgres::executor::rollback(session).await,
            #[cfg(feature = "sqlite")]
            DbConnection::Sqlite(conn) => sqlite::executor::rollback(conn).await,
        }
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::params::ParamSet;

    fn sqlite_string(dir: &tempfile::TempDir) -> ConnectionString {
        let path = dir.path().join("conn.db");
        ConnectionString::new(&format!("sqlite:{}", path.display()))
    }

    #[tokio::test]
    async fn close_and_drop_each_count_once() {
        let dir = tempfile::tempdir().unwrap();
        let cs = sqlite_string(&dir);
        let stats = Arc::new(ConnectionStats::default());

        let conn = ScopedConnection::open(&cs, &stats).await.unwrap();
        assert_eq!(conn.database_type(), Some(DatabaseType::Sqlite));
        conn.close().await;

        let dropped = ScopedConnection::open(&cs, &stats).await.unwrap();
        drop(dropped);

        assert_eq!(stats.opened(), 2);
        assert_eq!(stats.closed(), 2);
        assert_eq!(stats.open_now(), 0);
    }

    #[tokio::test]
    async fn failed_open_counts_nothing() {
        let stats = Arc::new(ConnectionStats::default());
        let err = ScopedConnection::open(&ConnectionString::new("nonsense"), &stats)
            .await
            .unwrap_err();
        assert!(matches!(err, VsqlError::ConfigError(_)));
        assert_eq!(stats.opened(), 0);
        assert_eq!(stats.closed(), 0);
    }

    #[tokio::test]
    async fn dispatches_statements_to_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let stats = Arc::new(ConnectionStats::default());
        let mut conn = ScopedConnection::open(&sqlite_string(&dir), &stats)
            .await
            .unwrap();

        let empty = ParamSet::new();
        conn.execute_non_query(&Command::new("CREATE TABLE t (id INTEGER, name TEXT)", &empty))
            .await
            .unwrap();

        let params = ParamSet::new().with("id", 1).with("name", "alice");
        let inserted = conn
            .execute_non_query(&Command::new("INSERT INTO t VALUES (@id, @name)", &params))
            .await
            .unwrap();
        assert_eq!(inserted, 1);

        let name = conn
            .execute_scalar(&Command::new("SELECT name FROM t WHERE id = @id", &params))
            .await
            .unwrap();
        assert_eq!(name, RowValues::Text("alice".into()));
        conn.close().await;
    }
}
