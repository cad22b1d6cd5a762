//! Collector registry with registration-time conflict detection.

use sonic_exporter_common::{MetricDesc, is_valid_label_name, is_valid_metric_name, prefix_claims};
use tracing::{debug, info};

use crate::collector::{BoxedCollector, Collector, CollectorDescriptor};
use crate::error::ConflictError;

/// A metric name space claimed by a registered collector.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Claim {
    /// The prefix and every `<prefix>_...` name.
    Prefix(String),
    /// Exactly one name.
    Name(String),
}

impl Claim {
    fn as_str(&self) -> &str {
        match self {
            Claim::Prefix(p) => p,
            Claim::Name(n) => n,
        }
    }

    fn overlaps(&self, other: &Claim) -> bool {
        match (self, other) {
            (Claim::Prefix(a), Claim::Prefix(b)) => prefix_claims(a, b) || prefix_claims(b, a),
            (Claim::Prefix(p), Claim::Name(n)) | (Claim::Name(n), Claim::Prefix(p)) => {
                prefix_claims(p, n)
            }
            (Claim::Name(a), Claim::Name(b)) => a == b,
        }
    }

    fn covers(&self, name: &str) -> bool {
        match self {
            Claim::Prefix(p) => prefix_claims(p, name),
            Claim::Name(n) => n == name,
        }
    }
}

/// A collector together with its validated registration data.
pub struct RegisteredCollector {
    descriptor: CollectorDescriptor,
    up_metric: String,
    claims: Vec<Claim>,
    collector: BoxedCollector,
}

impl RegisteredCollector {
    /// The descriptor captured at registration.
    pub fn descriptor(&self) -> &CollectorDescriptor {
        &self.descriptor
    }

    /// The collector's identity.
    pub fn identity(&self) -> &str {
        &self.descriptor.identity
    }

    /// Name of the synthetic `<identity>_up` gauge.
    pub fn up_metric(&self) -> &str {
        &self.up_metric
    }

    /// The collector itself.
    pub fn collector(&self) -> &dyn Collector {
        self.collector.as_ref()
    }

    /// Whether this collector is allowed to emit `name`.
    ///
    /// The up signal is reserved for the orchestrator.
    pub fn may_emit(&self, name: &str) -> bool {
        name != self.up_metric && self.claims.iter().any(|c| c.covers(name))
    }
}

impl std::fmt::Debug for RegisteredCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredCollector")
            .field("descriptor", &self.descriptor)
            .field("claims", &self.claims)
            .finish_non_exhaustive()
    }
}

/// Holds the process's collectors.
///
/// Composition is static: collectors are registered at startup and the
/// registry is then shared read-only with the scrape orchestrator. There is
/// no unregistration.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Vec<RegisteredCollector>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collector.
    ///
    /// Fails with [`ConflictError`] when the identity is taken or when any
    /// name this collector claims overlaps a name claimed by an earlier
    /// collector. Validation completes before anything is stored, so a failed
    /// registration leaves the registry unchanged.
    pub fn register<C>(&mut self, collector: C) -> Result<(), ConflictError>
    where
        C: Collector + 'static,
    {
        self.register_boxed(Box::new(collector))
    }

    /// Register an already boxed collector.
    pub fn register_boxed(&mut self, collector: BoxedCollector) -> Result<(), ConflictError> {
        let descriptor = collector.descriptor();
        let described = collector.describe();
        let claims = self.validate(&descriptor, &described)?;

        info!(
            collector = %descriptor.identity,
            prefixes = ?descriptor.produces,
            metrics = described.len(),
            "Registered collector"
        );

        self.entries.push(RegisteredCollector {
            up_metric: descriptor.up_metric(),
            descriptor,
            claims,
            collector,
        });
        Ok(())
    }

    fn validate(
        &self,
        descriptor: &CollectorDescriptor,
        described: &[MetricDesc],
    ) -> Result<Vec<Claim>, ConflictError> {
        let identity = &descriptor.identity;
        let invalid = |name: &str, reason: &str| ConflictError::InvalidName {
            identity: identity.clone(),
            name: name.to_string(),
            reason: reason.to_string(),
        };

        // The identity is also the value of the `collector` label.
        if !is_valid_label_name(identity) {
            return Err(invalid(identity, "identity is not a valid label name"));
        }

        if self.entries.iter().any(|e| e.identity() == identity) {
            return Err(ConflictError::DuplicateIdentity {
                identity: identity.clone(),
            });
        }

        let up_metric = descriptor.up_metric();
        let mut claims = Vec::with_capacity(descriptor.produces.len() + 1);

        for prefix in &descriptor.produces {
            if !is_valid_metric_name(prefix) {
                return Err(invalid(prefix, "prefix is not a valid metric name"));
            }
            claims.push(Claim::Prefix(prefix.clone()));
        }

        for desc in described {
            if !is_valid_metric_name(&desc.name) {
                return Err(invalid(&desc.name, "not a valid metric name"));
            }
            if desc.name == up_metric {
                return Err(invalid(&desc.name, "reserved for the collector up signal"));
            }
            if descriptor.produces.is_empty() {
                let claim = Claim::Name(desc.name.clone());
                if !claims.contains(&claim) {
                    claims.push(claim);
                }
            } else if !descriptor.covers(&desc.name) {
                return Err(ConflictError::Undeclared {
                    identity: identity.clone(),
                    metric: desc.name.clone(),
                });
            }
        }

        let up_claim = Claim::Name(up_metric);
        for existing in &self.entries {
            for claim in claims.iter().chain(std::iter::once(&up_claim)) {
                let taken = existing
                    .claims
                    .iter()
                    .chain(std::iter::once(&Claim::Name(existing.up_metric.clone())))
                    .find(|c| c.overlaps(claim))
                    .cloned();

                if let Some(existing_claim) = taken {
                    debug!(
                        collector = %identity,
                        claim = %claim.as_str(),
                        existing = %existing.identity(),
                        "Rejecting collector with overlapping claim"
                    );
                    return Err(ConflictError::Overlap {
                        identity: identity.clone(),
                        claim: claim.as_str().to_string(),
                        existing: existing.identity().to_string(),
                        existing_claim: existing_claim.as_str().to_string(),
                    });
                }
            }
        }

        Ok(claims)
    }

    /// All registered collectors in registration order.
    pub fn all(&self) -> impl ExactSizeIterator<Item = &RegisteredCollector> + '_ {
        self.entries.iter()
    }

    /// Identities in registration order.
    pub fn identities(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.identity()).collect()
    }

    /// Number of registered collectors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no collector is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollectionError;
    use async_trait::async_trait;
    use sonic_exporter_common::MetricSample;

    struct Named {
        descriptor: CollectorDescriptor,
        metrics: Vec<&'static str>,
    }

    impl Named {
        fn new(identity: &str, produces: &[&str], metrics: &[&'static str]) -> Self {
            Self {
                descriptor: CollectorDescriptor::new(identity, produces.iter().copied()),
                metrics: metrics.to_vec(),
            }
        }
    }

    #[async_trait]
    impl Collector for Named {
        fn descriptor(&self) -> CollectorDescriptor {
            self.descriptor.clone()
        }

        fn describe(&self) -> Vec<MetricDesc> {
            self.metrics
                .iter()
                .map(|m| MetricDesc::gauge(*m, "test"))
                .collect()
        }

        async fn collect(&self) -> Result<Vec<MetricSample>, CollectionError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_register_in_order() {
        let mut registry = Registry::new();
        registry
            .register(Named::new("iface", &["iface"], &["iface_rx_bytes"]))
            .unwrap();
        registry
            .register(Named::new("hw", &["hw"], &["hw_temp_celsius"]))
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.identities(), vec!["iface", "hw"]);
        let ups: Vec<_> = registry.all().map(|e| e.up_metric().to_string()).collect();
        assert_eq!(ups, vec!["iface_up", "hw_up"]);
    }

    #[test]
    fn test_duplicate_identity_rejected() {
        let mut registry = Registry::new();
        registry.register(Named::new("hw", &["hw"], &[])).unwrap();

        let err = registry
            .register(Named::new("hw", &["hw2"], &[]))
            .unwrap_err();
        assert!(matches!(err, ConflictError::DuplicateIdentity { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_overlapping_prefix_rejected() {
        let mut registry = Registry::new();
        registry
            .register(Named::new("sonic", &["sonic"], &["sonic_interface_x"]))
            .unwrap();

        let err = registry
            .register(Named::new("hw", &["sonic_hw"], &["sonic_hw_fan_status"]))
            .unwrap_err();
        match err {
            ConflictError::Overlap {
                identity,
                existing,
                ..
            } => {
                assert_eq!(identity, "hw");
                assert_eq!(existing, "sonic");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_overlapping_described_names_rejected() {
        let mut registry = Registry::new();
        registry
            .register(Named::new("a", &[], &["shared_metric", "a_only"]))
            .unwrap();

        let err = registry
            .register(Named::new("b", &[], &["b_only", "shared_metric"]))
            .unwrap_err();
        assert!(matches!(err, ConflictError::Overlap { .. }));

        // Nothing from the rejected collector was kept.
        assert_eq!(registry.identities(), vec!["a"]);
        registry
            .register(Named::new("b", &[], &["b_only"]))
            .unwrap();
    }

    #[test]
    fn test_prefix_boundary_is_not_conflict() {
        let mut registry = Registry::new();
        registry.register(Named::new("hw", &["sonic_hw"], &[])).unwrap();
        registry
            .register(Named::new("hwsku", &["sonic_hwsku"], &[]))
            .unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_up_signal_collision_rejected() {
        let mut registry = Registry::new();
        registry.register(Named::new("a", &["frr"], &[])).unwrap();

        // "frr_up" falls under the "frr" prefix of collector a.
        let err = registry.register(Named::new("frr", &[], &[])).unwrap_err();
        assert!(matches!(err, ConflictError::Overlap { .. }));
    }

    #[test]
    fn test_undeclared_metric_rejected() {
        let mut registry = Registry::new();
        let err = registry
            .register(Named::new("hw", &["sonic_hw"], &["node_load1"]))
            .unwrap_err();
        assert_eq!(
            err,
            ConflictError::Undeclared {
                identity: "hw".to_string(),
                metric: "node_load1".to_string(),
            }
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_invalid_names_rejected() {
        let mut registry = Registry::new();
        assert!(matches!(
            registry.register(Named::new("bad-id", &[], &[])),
            Err(ConflictError::InvalidName { .. })
        ));
        assert!(matches!(
            registry.register(Named::new("a:b", &[], &[])),
            Err(ConflictError::InvalidName { .. })
        ));
        assert!(matches!(
            registry.register(Named::new("__internal", &[], &[])),
            Err(ConflictError::InvalidName { .. })
        ));
        assert!(matches!(
            registry.register(Named::new("ok", &["bad prefix"], &[])),
            Err(ConflictError::InvalidName { .. })
        ));
        assert!(matches!(
            registry.register(Named::new("ok", &["ok"], &["ok_up"])),
            Err(ConflictError::InvalidName { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_may_emit() {
        let mut registry = Registry::new();
        registry
            .register(Named::new("iface", &[], &["iface_rx_bytes"]))
            .unwrap();
        registry
            .register(Named::new("frr", &["frr"], &[]))
            .unwrap();

        let entries: Vec<_> = registry.all().collect();
        assert!(entries[0].may_emit("iface_rx_bytes"));
        assert!(!entries[0].may_emit("iface_tx_bytes"));
        assert!(!entries[0].may_emit("iface_up"));
        assert!(entries[1].may_emit("frr_bgp_peer_state"));
        assert!(!entries[1].may_emit("frr_up"));
    }
}
