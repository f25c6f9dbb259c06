use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::error::VsqlError;

pub(crate) type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

/// Concurrent operations open concurrent connections to the same file.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A single `SQLite` connection whose work always runs on the blocking pool.
pub struct SqliteConnection {
    handle: SharedSqliteConnection,
    path: String,
}

impl SqliteConnection {
    /// Open `path` off the async runtime.
    ///
    /// # Errors
    /// Returns `VsqlError::SqliteError` if the database cannot be opened.
    pub async fn open(path: &str) -> Result<Self, VsqlError> {
        let owned = path.to_owned();
        let conn = tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&owned)?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            Ok::<_, VsqlError>(conn)
        })
        .await
        .map_err(|e| VsqlError::ConnectionError(format!("sqlite open join error: {e}")))??;

        Ok(Self {
            handle: Arc::new(Mutex::new(conn)),
            path: path.to_owned(),
        })
    }

    /// Run synchronous work against the raw connection on the blocking pool.
    ///
    /// # Errors
    /// Returns whatever `func` returns, or `VsqlError::ExecutionError` if the
    /// blocking task could not be joined.
    pub async fn with_connection<F, R>(&self, func: F) -> Result<R, VsqlError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R, VsqlError> + Send + 'static,
        R: Send + 'static,
    {
        run_blocking(Arc::clone(&self.handle), func).await
    }

    /// Close the connection, surfacing any error `sqlite3_close` reports.
    ///
    /// # Errors
    /// Returns `VsqlError::SqliteError` if closing fails.
    pub async fn close(self) -> Result<(), VsqlError> {
        let Ok(mutex) = Arc::try_unwrap(self.handle) else {
            // another handle is still alive; the last drop closes it
            return Ok(());
        };
        let conn = mutex.into_inner();
        tokio::task::spawn_blocking(move || conn.close().map_err(|(_conn, err)| err))
            .await
            .map_err(|e| VsqlError::ConnectionError(format!("sqlite close join error: {e}")))?
            .map_err(VsqlError::SqliteError)
    }
}

impl fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

pub(crate) async fn run_blocking<F, R>(
    conn: SharedSqliteConnection,
    func: F,
) -> Result<R, VsqlError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, VsqlError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        func(&mut guard)
    })
    .await
    .map_err(|e| VsqlError::ExecutionError(format!("sqlite spawn_blocking join error: {e}")))?
}
