//! Critical Resource Monitoring (CRM) utilisation.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use sonic_exporter_common::{MetricDesc, MetricSample};
use sonic_exporter_framework::{CollectionError, Collector, CollectorDescriptor};
use tracing::debug;

use crate::cache::SampleCache;
use crate::db::{Database, Fields, SonicDb};

const CRM_STATS: &str = "CRM:STATS";

/// Reads the `crm_stats_<resource>_{used,available}` fields of `CRM:STATS`.
pub struct CrmCollector {
    db: Arc<dyn SonicDb>,
    cache: SampleCache,
}

impl CrmCollector {
    pub fn new(db: Arc<dyn SonicDb>, cache: SampleCache) -> Self {
        Self { db, cache }
    }

    fn used() -> MetricDesc {
        MetricDesc::gauge("sonic_crm_stats_used", "Used entries of an ASIC resource.")
    }

    fn available() -> MetricDesc {
        MetricDesc::gauge(
            "sonic_crm_stats_available",
            "Available entries of an ASIC resource.",
        )
    }

    async fn read(&self) -> Result<Vec<MetricSample>, CollectionError> {
        let stats = self.db.hgetall(Database::Counters, CRM_STATS).await?;
        if stats.is_empty() {
            return Err(CollectionError::unavailable(format!(
                "{} is empty",
                CRM_STATS
            )));
        }
        Ok(crm_samples(&stats))
    }
}

fn crm_samples(stats: &Fields) -> Vec<MetricSample> {
    // resource -> (used, available)
    let mut resources: BTreeMap<&str, (Option<f64>, Option<f64>)> = BTreeMap::new();

    for (field, raw) in stats {
        let Some(rest) = field.strip_prefix("crm_stats_") else {
            continue;
        };
        let Ok(value) = raw.trim().parse::<f64>() else {
            debug!(field = %field, value = %raw, "Skipping non-numeric CRM field");
            continue;
        };
        if let Some(resource) = rest.strip_suffix("_used") {
            resources.entry(resource).or_default().0 = Some(value);
        } else if let Some(resource) = rest.strip_suffix("_available") {
            resources.entry(resource).or_default().1 = Some(value);
        }
    }

    let (used, available) = (CrmCollector::used(), CrmCollector::available());
    let mut samples = Vec::new();
    for (resource, (u, a)) in resources {
        if let Some(u) = u {
            samples.push(used.sample_with([("resource", resource)], u));
        }
        if let Some(a) = a {
            samples.push(available.sample_with([("resource", resource)], a));
        }
    }
    samples
}

#[async_trait]
impl Collector for CrmCollector {
    fn descriptor(&self) -> CollectorDescriptor {
        CollectorDescriptor::prefixed("sonic_crm")
    }

    fn describe(&self) -> Vec<MetricDesc> {
        vec![Self::used(), Self::available()]
    }

    async fn collect(&self) -> Result<Vec<MetricSample>, CollectionError> {
        self.cache.get_or_refresh(|| self.read()).await
    }
}
