//! Learn-then-enforce SQL firewall comparing the structural shape of queries.
#![warn(missing_docs)]

/// Single-concern structural checkers and the chain evaluating them.
pub mod checker;
/// Learning/productive state machine and the scoped matching algorithm.
pub mod classifier;
/// JSON configuration: SQL dialect, checker order, column policy.
pub mod config;
/// Error types for tokenizing, persistence and the facade.
pub mod error;
/// The `Firewall` facade tying tokenizer and classifier together.
pub mod firewall;
/// Markdown report generation and file output.
pub mod output;
/// SQL text to token tree.
pub mod parser;
/// Persistence backends for learned queries and the log.
pub mod storage;
/// Learned queries, the query store, and the rejection log.
pub mod store;
/// Structural token model of a query's shape.
pub mod token;

pub use classifier::Mode;
pub use config::{FirewallConfig, SqlDialect};
pub use error::{Error, Result};
pub use firewall::Firewall;
