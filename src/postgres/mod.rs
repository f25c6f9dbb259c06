// PostgreSQL backend
//
// - config: connect and own the client plus its driver task
// - placeholders: `@name` / `:name` to `$n` rewriting
// - params: value binding
// - query: row and scalar extraction
// - executor: the operations the bridge runs

pub mod config;
pub mod executor;
pub mod params;
pub mod placeholders;
pub mod query;

pub use config::PgSession;
pub use params::BoundCommand;
pub use placeholders::rewrite_named;
