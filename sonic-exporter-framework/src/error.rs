//! Error types for the collector framework.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using [`FrameworkError`].
pub type Result<T> = std::result::Result<T, FrameworkError>;

/// Fatal startup errors raised while assembling the collector set.
#[derive(Error, Debug)]
pub enum FrameworkError {
    /// Two collectors declare overlapping metric identities.
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    /// A collector could not be constructed.
    #[error("Failed to construct collector '{collector}': {source}")]
    Construction {
        collector: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl FrameworkError {
    /// Wrap a construction failure for the named collector.
    pub fn construction<E>(collector: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Construction {
            collector: collector.into(),
            source: source.into(),
        }
    }
}

/// Registration rejected because of a metric identity conflict.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConflictError {
    /// The identity is already registered.
    #[error("Collector '{identity}' is already registered")]
    DuplicateIdentity { identity: String },

    /// A claimed metric name or prefix overlaps one claimed by another collector.
    #[error(
        "Collector '{identity}' claims '{claim}' which overlaps '{existing_claim}' of collector '{existing}'"
    )]
    Overlap {
        identity: String,
        claim: String,
        existing: String,
        existing_claim: String,
    },

    /// An identity, prefix or described name is not a valid metric name.
    #[error("Collector '{identity}' declares invalid name '{name}': {reason}")]
    InvalidName {
        identity: String,
        name: String,
        reason: String,
    },

    /// A described metric is not covered by the collector's declared prefixes.
    #[error("Collector '{identity}' describes '{metric}' outside its declared prefixes")]
    Undeclared { identity: String, metric: String },
}

/// A single collection attempt failed. Recoverable: isolated to one collector.
#[derive(Error, Debug)]
pub enum CollectionError {
    /// The data source could not be reached or queried.
    #[error("Source unavailable: {0}")]
    Source(String),

    /// The data source answered with data that could not be parsed.
    #[error("Malformed data: {0}")]
    Parse(String),

    /// The collection did not finish in time.
    #[error("Collection timed out after {0:?}")]
    Timeout(Duration),

    /// The collector panicked.
    #[error("Collector panicked: {0}")]
    Panicked(String),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl CollectionError {
    /// Create a source-unavailable error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Wrap an error with context.
    pub fn with_context<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

impl From<std::io::Error> for CollectionError {
    fn from(err: std::io::Error) -> Self {
        Self::Source(err.to_string())
    }
}

/// Render a panic payload as text.
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
