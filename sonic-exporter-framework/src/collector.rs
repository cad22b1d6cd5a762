//! The collector capability implemented by every data source.

use async_trait::async_trait;
use sonic_exporter_common::{MetricDesc, MetricSample, prefix_claims};

use crate::error::CollectionError;

/// Registration-time identity of a collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorDescriptor {
    /// Unique key within a registry. Also the stem of the `<identity>_up` signal.
    pub identity: String,
    /// Metric name prefixes this collector may emit.
    ///
    /// When empty, the collector may only emit the exact names it describes.
    pub produces: Vec<String>,
}

impl CollectorDescriptor {
    /// Create a descriptor claiming the given prefixes.
    pub fn new<I, S>(identity: impl Into<String>, produces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            identity: identity.into(),
            produces: produces.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a descriptor whose only prefix is its identity.
    pub fn prefixed(identity: impl Into<String>) -> Self {
        let identity = identity.into();
        Self {
            produces: vec![identity.clone()],
            identity,
        }
    }

    /// Name of the synthetic success gauge for this collector.
    pub fn up_metric(&self) -> String {
        format!("{}_up", self.identity)
    }

    /// Whether one of the declared prefixes covers `name`.
    pub fn covers(&self, name: &str) -> bool {
        self.produces.iter().any(|p| prefix_claims(p, name))
    }
}

/// A unit that produces metric samples from one data source.
///
/// Implementations must not block indefinitely: a collector performing live
/// external I/O applies its own timeout and reports it as a
/// [`CollectionError`].
#[async_trait]
pub trait Collector: Send + Sync {
    /// Identity and claimed prefixes, checked at registration.
    fn descriptor(&self) -> CollectorDescriptor;

    /// Every metric family this collector may emit. Must not read the data source.
    fn describe(&self) -> Vec<MetricDesc>;

    /// Read the data source and produce samples.
    async fn collect(&self) -> Result<Vec<MetricSample>, CollectionError>;
}

/// Owned, type-erased collector.
pub type BoxedCollector = Box<dyn Collector>;

#[async_trait]
impl<C: Collector + ?Sized> Collector for Box<C> {
    fn descriptor(&self) -> CollectorDescriptor {
        (**self).descriptor()
    }

    fn describe(&self) -> Vec<MetricDesc> {
        (**self).describe()
    }

    async fn collect(&self) -> Result<Vec<MetricSample>, CollectionError> {
        (**self).collect().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_descriptor() {
        let desc = CollectorDescriptor::prefixed("frr");
        assert_eq!(desc.identity, "frr");
        assert_eq!(desc.produces, vec!["frr"]);
        assert_eq!(desc.up_metric(), "frr_up");
    }

    #[test]
    fn test_covers() {
        let desc = CollectorDescriptor::new("interface", ["sonic_interface"]);
        assert!(desc.covers("sonic_interface_receive_bytes_total"));
        assert!(!desc.covers("sonic_hw_fan_status"));

        let exact = CollectorDescriptor::new("iface", Vec::<String>::new());
        assert!(!exact.covers("iface_rx_bytes"));
    }
}
