//! Error types for InPhO corpus mining.

use thiserror::Error;

/// Result type alias using the InPhO Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for mining operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found (article text, term, file)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Scanning a single article failed
    #[error("Scan error: {0}")]
    Scan(String),

    /// External association miner failed (spawn, exit status, timeout)
    #[error("Miner error: {0}")]
    Miner(String),

    /// Miner output did not follow `<ante> <cons> <confidence> <jweight>`
    #[error("Malformed miner output at line {line}: {content:?}")]
    MalformedRules { line: usize, content: String },

    /// Edge weighting was attempted without any node entropy values
    #[error("No entropy values: cannot weight {edge_count} edges")]
    EmptyEntropy { edge_count: usize },

    /// Edge sink rejected the replacement edge set
    #[error("Publish error: {0}")]
    Publish(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error aborts a whole mining run.
    ///
    /// Per-item failures (`NotFound`, `Scan`) degrade one article's
    /// contribution; everything else stops the run before publishing.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::NotFound(_) | Error::Scan(_))
    }
}
