/// Append-only rejection log and its entries.
pub mod log;
/// Tokenized statements bound to a database and user.
pub mod query;
/// Insertion-ordered set of learned queries.
pub mod query_store;

pub use log::{Log, LogEntry};
pub use query::Query;
pub use query_store::QueryStore;
