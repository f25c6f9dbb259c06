use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::error::VsqlError;

/// Host configuration key holding the connection string.
pub const DEFAULT_CONNECTION_STRING_KEY: &str = "vsql_connection_string";

/// Read access to the host's configuration variables.
///
/// Implemented for plain closures so a host binding can pass its accessor
/// directly:
/// ```rust
/// use vsql::config::ConnectionResolver;
///
/// let resolver = ConnectionResolver::new(
///     "vsql_connection_string",
///     |_key: &str| Some("sqlite:game.db".to_string()),
/// );
/// assert_eq!(resolver.resolve().as_str(), "sqlite:game.db");
/// ```
pub trait ConfigSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

impl<F> ConfigSource for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn get(&self, key: &str) -> Option<String> {
        self(key)
    }
}

/// A fixed value, whatever the key.
#[derive(Debug, Clone)]
pub struct StaticConfig(pub String);

impl ConfigSource for StaticConfig {
    fn get(&self, _key: &str) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Reads the key from the process environment, upper-cased
/// (`vsql_connection_string` -> `VSQL_CONNECTION_STRING`).
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfig;

impl ConfigSource for EnvConfig {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key.to_ascii_uppercase()).ok()
    }
}

/// Opaque connection string, cheap to clone into background tasks.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString(Arc<str>);

impl ConnectionString {
    #[must_use]
    pub fn new(value: &str) -> Self {
        Self(Arc::from(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Work out which backend this string addresses.
    ///
    /// # Errors
    /// Returns `VsqlError::ConfigError` if the string matches no enabled backend.
    pub fn target(&self) -> Result<ConnectionTarget, VsqlError> {
        ConnectionTarget::parse(self.as_str())
    }
}

// Connection strings carry passwords; keep them out of logs.
impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConnectionString")
            .field(&format_args!("<{} bytes>", self.0.len()))
            .finish()
    }
}

/// Resolves the connection string once and caches it for the resolver's lifetime.
pub struct ConnectionResolver {
    key: String,
    source: Box<dyn ConfigSource>,
    resolved: OnceLock<ConnectionString>,
}

impl ConnectionResolver {
    pub fn new(key: impl Into<String>, source: impl ConfigSource + 'static) -> Self {
        Self {
            key: key.into(),
            source: Box::new(source),
            resolved: OnceLock::new(),
        }
    }

    /// Return the cached connection string, reading the host on first use.
    ///
    /// Concurrent first calls read the host at most once; every caller sees
    /// the same value. An unset key resolves to the empty string and fails
    /// later, when an operation tries to connect.
    pub fn resolve(&self) -> ConnectionString {
        self.resolved
            .get_or_init(|| {
                let value = self.source.get(&self.key).unwrap_or_default();
                tracing::debug!(
                    key = %self.key,
                    resolved = !value.is_empty(),
                    "connection string resolved"
                );
                ConnectionString::new(&value)
            })
            .clone()
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Debug for ConnectionResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionResolver")
            .field("key", &self.key)
            .field("resolved", &self.is_resolved())
            .finish_non_exhaustive()
    }
}

/// A parsed connection string.
#[derive(Debug, Clone)]
pub enum ConnectionTarget {
    #[cfg(feature = "postgres")]
    Postgres(tokio_postgres::Config),
    #[cfg(feature = "sqlite")]
    Sqlite(String),
}

impl ConnectionTarget {
    /// Parse a connection string.
    ///
    /// * `postgres://…`, `postgresql://…`, or a key/value string with `host=`
    ///   or `dbname=` select `PostgreSQL`.
    /// * `sqlite:<path>`, `sqlite://<path>`, `file:<uri>`, `:memory:`, or a
    ///   path ending in `.db`, `.sqlite` or `.sqlite3` select `SQLite`.
    ///
    /// Every operation opens its own connection, so a `:memory:` database
    /// starts empty each time and nothing persists between operations.
    ///
    /// # Errors
    /// Returns `VsqlError::ConfigError` for an empty or unrecognised string,
    /// `VsqlError::Unimplemented` when the addressed backend is compiled out.
    pub fn parse(raw: &str) -> Result<Self, VsqlError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(VsqlError::ConfigError(
                "connection string is empty".to_string(),
            ));
        }
        if is_postgres(trimmed) {
            return Self::postgres(trimmed);
        }
        if let Some(path) = sqlite_path(trimmed) {
            return Self::sqlite(path);
        }
        Err(VsqlError::ConfigError(
            "connection string does not name a supported database".to_string(),
        ))
    }

    #[cfg(feature = "postgres")]
    fn postgres(raw: &str) -> Result<Self, VsqlError> {
        raw.parse::<tokio_postgres::Config>()
            .map(ConnectionTarget::Postgres)
            .map_err(|e| VsqlError::ConfigError(format!("invalid postgres connection string: {e}")))
    }

    #[cfg(not(feature = "postgres"))]
    fn postgres(_raw: &str) -> Result<Self, VsqlError> {
        Err(VsqlError::Unimplemented(
            "postgres support is not enabled in this build".to_string(),
        ))
    }

    #[cfg(feature = "sqlite")]
    #[allow(clippy::unnecessary_wraps)]
    fn sqlite(path: &str) -> Result<Self, VsqlError> {
        Ok(ConnectionTarget::Sqlite(path.to_owned()))
    }

    #[cfg(not(feature = "sqlite"))]
    fn sqlite(_path: &str) -> Result<Self, VsqlError> {
        Err(VsqlError::Unimplemented(
            "sqlite support is not enabled in this build".to_string(),
        ))
    }

    #[must_use]
    pub fn database_type(&self) -> crate::types::DatabaseType {
        match self {
            #[cfg(feature = "postgres")]
            ConnectionTarget::Postgres(_) => crate::types::DatabaseType::Postgres,
            #[cfg(feature = "sqlite")]
            ConnectionTarget::Sqlite(_) => crate::types::DatabaseType::Sqlite,
        }
    }
}

fn is_postgres(raw: &str) -> bool {
    raw.starts_with("postgres://")
        || raw.starts_with("postgresql://")
        || raw
            .split_whitespace()
            .any(|pair| pair.starts_with("host=") || pair.starts_with("dbname="))
}

fn sqlite_path(raw: &str) -> Option<&str> {
    if let Some(rest) = raw.strip_prefix("sqlite://") {
        return Some(rest);
    }
    if let Some(rest) = raw.strip_prefix("sqlite:") {
        return Some(rest);
    }
    let lower = raw.to_ascii_lowercase();
    if raw == ":memory:"
        || raw.starts_with("file:")
        || lower.ends_with(".db")
        || lower.ends_with(".sqlite")
        || lower.ends_with(".sqlite3")
    {
        return Some(raw);
    }
    None
}
