//! Asynchronous SQL for single-threaded game-server hosts.
//!
//! A [`Bridge`](bridge::Bridge) runs each query on a Tokio runtime with its
//! own connection and hands the result back through a callback queue that the
//! host drains once per tick. Failures are logged through `tracing` and turn
//! into safe defaults (`0`, `Null`, no rows, `false`), so host scripts never
//! see a database error.
//!
//! Backends are chosen by the connection string:
//! - `postgres://…` or `host=… dbname=…` for `PostgreSQL` (feature `postgres`)
//! - `sqlite:<path>` or `*.db` for `SQLite` (feature `sqlite`)

pub mod bridge;
pub mod command;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod logging;
pub mod params;
pub mod prelude;
pub mod queue;
pub mod row;
pub mod transaction;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use bridge::{Bridge, BridgeOptions, BridgeOptionsBuilder};
pub use error::VsqlError;
pub use params::ParamSet;
pub use row::Row;
pub use types::RowValues;
