use std::path::PathBuf;

use thiserror::Error;

/// Failure to turn SQL text into a token tree.
#[derive(Debug, Error)]
pub enum TokenizeError {
    /// The SQL grammar rejected the text.
    #[error("malformed query: {0}")]
    Malformed(#[from] sqlparser::parser::ParserError),

    /// The text holds a statement kind other than a query.
    #[error("unsupported statement: {0}")]
    UnsupportedStatement(String),

    /// The text holds zero or several statements.
    #[error("expected exactly one statement, found {0}")]
    StatementCount(usize),
}

/// Failure of the persistence backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing a state file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A state file could not be encoded or decoded.
    #[error("invalid state file {}: {source}", path.display())]
    Serialization {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Backend-specific failure.
    #[error("storage backend unavailable: {0}")]
    Backend(String),
}

/// Errors surfaced by the firewall facade.
#[derive(Debug, Error)]
pub enum Error {
    /// A required input was absent or blank.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The persistence backend failed.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),
}

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;
