//! Sub-exporter composition.
//!
//! Some data sources bundle several named sub-collectors (the FRR daemon has
//! one per protocol family, the host has one per kernel subsystem). A
//! [`SubExporter`] holds such a bundle behind a single registry entry and
//! fans out to every member on each collection.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::future::join_all;
use sonic_exporter_common::{MetricDesc, MetricSample, prefix_claims};
use tracing::{debug, warn};

use crate::collector::{BoxedCollector, Collector, CollectorDescriptor};
use crate::error::CollectionError;
use crate::scrape::invoke;

/// A named bundle of sub-collectors exposed as one collector.
///
/// The parent identity is also the only prefix the bundle claims; every
/// sub-collector must emit names under it. Members are addressed by key, are
/// iterated in key order and are only added or removed before the bundle is
/// registered.
pub struct SubExporter {
    identity: String,
    collectors: BTreeMap<String, BoxedCollector>,
}

impl SubExporter {
    /// Create an empty bundle.
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            collectors: BTreeMap::new(),
        }
    }

    /// Add a sub-collector, returning the one previously stored under `key`.
    pub fn insert<C>(&mut self, key: impl Into<String>, collector: C) -> Option<BoxedCollector>
    where
        C: Collector + 'static,
    {
        self.insert_boxed(key, Box::new(collector))
    }

    /// Add an already boxed sub-collector.
    pub fn insert_boxed(
        &mut self,
        key: impl Into<String>,
        collector: BoxedCollector,
    ) -> Option<BoxedCollector> {
        let key = key.into();
        let previous = self.collectors.insert(key.clone(), collector);
        if previous.is_some() {
            debug!(exporter = %self.identity, collector = %key, "Replaced sub-collector");
        }
        previous
    }

    /// Builder form of [`SubExporter::insert`].
    pub fn with<C>(mut self, key: impl Into<String>, collector: C) -> Self
    where
        C: Collector + 'static,
    {
        self.insert(key, collector);
        self
    }

    /// Remove a sub-collector.
    pub fn remove(&mut self, key: &str) -> Option<BoxedCollector> {
        self.collectors.remove(key)
    }

    /// Keep only the sub-collectors whose key is listed.
    pub fn retain_enabled<S: AsRef<str>>(&mut self, enabled: &[S]) {
        self.collectors
            .retain(|key, _| enabled.iter().any(|e| e.as_ref() == key));
    }

    /// Whether a sub-collector is stored under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.collectors.contains_key(key)
    }

    /// Sub-collector keys in iteration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.collectors.keys().map(String::as_str)
    }

    /// Number of sub-collectors.
    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    /// Whether the bundle is empty.
    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// The parent identity.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    fn collector_up(&self) -> MetricDesc {
        MetricDesc::gauge(
            format!("{}_collector_up", self.identity),
            format!("Whether the {} sub-collector succeeded.", self.identity),
        )
    }

    fn collector_duration(&self) -> MetricDesc {
        MetricDesc::gauge(
            format!("{}_collector_duration_seconds", self.identity),
            format!(
                "Time spent in each {} sub-collector, in seconds.",
                self.identity
            ),
        )
    }
}

impl std::fmt::Debug for SubExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubExporter")
            .field("identity", &self.identity)
            .field("collectors", &self.collectors.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl Collector for SubExporter {
    fn descriptor(&self) -> CollectorDescriptor {
        CollectorDescriptor::prefixed(self.identity.clone())
    }

    /// Member descriptions are merged after the two signals; members cannot
    /// redefine the signal names.
    fn describe(&self) -> Vec<MetricDesc> {
        let mut descs = vec![self.collector_up(), self.collector_duration()];
        for collector in self.collectors.values() {
            for desc in collector.describe() {
                if !descs.iter().any(|d| d.name == desc.name) {
                    descs.push(desc);
                }
            }
        }
        descs
    }

    /// Collect every sub-collector concurrently.
    ///
    /// Never fails: a failing member only flips its own
    /// `<identity>_collector_up{collector="<key>"}` to 0.
    async fn collect(&self) -> Result<Vec<MetricSample>, CollectionError> {
        let results = join_all(
            self.collectors
                .values()
                .map(|collector| invoke(collector.as_ref(), None)),
        )
        .await;

        let up = self.collector_up();
        let duration = self.collector_duration();
        let mut samples = Vec::new();

        for (key, (result, elapsed)) in self.collectors.keys().zip(results) {
            let success = match result {
                Ok(collected) => {
                    for sample in collected {
                        if sample.name == up.name || sample.name == duration.name {
                            warn!(
                                exporter = %self.identity,
                                collector = %key,
                                metric = %sample.name,
                                "Dropping sample that uses a reserved sub-collector signal name"
                            );
                        } else if prefix_claims(&self.identity, &sample.name) {
                            samples.push(sample);
                        } else {
                            warn!(
                                exporter = %self.identity,
                                collector = %key,
                                metric = %sample.name,
                                "Dropping sample outside the exporter prefix"
                            );
                        }
                    }
                    true
                }
                Err(e) => {
                    warn!(
                        exporter = %self.identity,
                        collector = %key,
                        error = %e,
                        "Sub-collector failed"
                    );
                    false
                }
            };

            samples.push(up.sample_with(
                [("collector", key.as_str())],
                if success { 1.0 } else { 0.0 },
            ));
            samples.push(
                duration.sample_with([("collector", key.as_str())], elapsed.as_secs_f64()),
            );
        }

        Ok(samples)
    }
}
