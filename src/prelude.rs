//! Convenient imports for embedding the bridge.

pub use crate::bridge::{Bridge, BridgeOptions, BridgeOptionsBuilder, TickRequester};
pub use crate::command::Command;
pub use crate::config::{
    ConfigSource, ConnectionResolver, ConnectionString, ConnectionTarget,
    DEFAULT_CONNECTION_STRING_KEY, EnvConfig, StaticConfig,
};
pub use crate::connection::{AsyncDatabaseExecutor, ConnectionStats, ScopedConnection};
pub use crate::error::VsqlError;
pub use crate::executor::{OperationKind, QueryExecutor};
pub use crate::logging::{HostConsoleWriter, HostSink, host_subscriber, init_host_logging};
pub use crate::params::ParamSet;
pub use crate::queue::CallbackQueue;
pub use crate::row::Row;
pub use crate::transaction::{TxOutcome, TxState, run_transaction};
pub use crate::types::{DatabaseType, RowValues};
