//! Error types for the node collectors.

use thiserror::Error;

/// Errors raised while building the node collectors.
#[derive(Debug, Error)]
pub enum NodeError {
    /// A configured collector name is not known.
    #[error("Unknown node collector '{0}'")]
    UnknownCollector(String),

    /// A mount point exclusion pattern does not compile.
    #[error("Invalid mount point pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}
