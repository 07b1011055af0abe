//! Error types for docgraph

use thiserror::Error;

/// Result type alias for docgraph operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in docgraph operations
#[derive(Error, Debug)]
pub enum Error {
    /// The embedding provider failed to produce a vector
    #[error("embedding provider error: {0}")]
    Provider(String),

    /// A vector or graph store was unreachable or rejected a read/write
    #[error("store error: {0}")]
    Store(String),

    /// Vector or node id does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// A source page could not be fetched or parsed
    #[error("scrape error: {0}")]
    Scrape(String),

    /// Configuration is missing or malformed
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid input provided
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Returns `true` for [`Error::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
