// SQLite backend
//
// - connection: open/close and the blocking-pool hop for every call
// - params: named parameter binding
// - query: row and scalar extraction
// - executor: the operations the bridge runs

pub mod connection;
pub mod executor;
pub mod params;
pub mod query;

pub use connection::SqliteConnection;
