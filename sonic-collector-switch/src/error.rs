//! Error types for the switch collectors.

use std::time::Duration;

use sonic_exporter_framework::CollectionError;
use thiserror::Error;

/// Errors raised while building the switch collectors.
#[derive(Debug, Error)]
pub enum SwitchError {
    /// The Redis URL could not be parsed.
    #[error("Invalid Redis URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: redis::RedisError,
    },

    /// A configured collector name is not known.
    #[error("Unknown switch collector '{0}'")]
    UnknownCollector(String),
}

/// Errors raised by a SONiC database read.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Database request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Database unavailable: {0}")]
    Unavailable(String),
}

impl From<DbError> for CollectionError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Timeout(limit) => CollectionError::Timeout(limit),
            other => CollectionError::unavailable(other.to_string()),
        }
    }
}
