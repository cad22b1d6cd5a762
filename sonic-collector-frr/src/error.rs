//! Error types for the FRR collectors.

use std::path::PathBuf;
use std::time::Duration;

use sonic_exporter_framework::CollectionError;
use thiserror::Error;

/// Errors raised while building the FRR collectors.
#[derive(Debug, Error)]
pub enum FrrError {
    /// A configured collector name is not known.
    #[error("Unknown FRR collector '{0}'")]
    UnknownCollector(String),
}

/// Errors raised by a VTY exchange with an FRR daemon.
#[derive(Debug, Error)]
pub enum VtyError {
    #[error("Failed to connect to {}: {source}", path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("VTY I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("VTY request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Daemon closed the connection before completing the reply")]
    Closed,

    #[error("Command '{command}' failed with status {status}")]
    Command { command: String, status: u8 },

    #[error("Reply is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl From<VtyError> for CollectionError {
    fn from(e: VtyError) -> Self {
        match e {
            VtyError::Timeout(limit) => CollectionError::Timeout(limit),
            other => CollectionError::unavailable(other.to_string()),
        }
    }
}
