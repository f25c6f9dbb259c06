use std::fmt;

use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls};

use crate::error::VsqlError;

/// One `tokio-postgres` client plus the task driving its socket.
pub struct PgSession {
    pub(crate) client: Client,
    driver: JoinHandle<()>,
}

impl PgSession {
    /// Connect without TLS and spawn the connection driver on the current runtime.
    ///
    /// # Errors
    /// Returns `VsqlError::PostgresError` if the server cannot be reached or
    /// rejects the credentials.
    pub async fn connect(config: &tokio_postgres::Config) -> Result<Self, VsqlError> {
        let (client, connection) = config.connect(NoTls).await?;
        let driver = tokio::spawn(async move {
            if let Err(err) = connection.await {
                tracing::debug!(error = %err, "postgres connection driver exited with error");
            }
        });
        Ok(Self { client, driver })
    }

    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Drop the client and wait for the driver task to finish the shutdown.
    pub async fn close(self) {
        let PgSession { client, driver } = self;
        drop(client);
        if let Err(err) = driver.await {
            tracing::debug!(error = %err, "postgres connection driver join failed");
        }
    }
}

impl fmt::Debug for PgSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgSession")
            .field("closed", &self.client.is_closed())
            .finish_non_exhaustive()
    }
}
