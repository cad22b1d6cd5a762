//! Current system time.

use async_trait::async_trait;
use chrono::Utc;
use sonic_exporter_common::{MetricDesc, MetricSample};
use sonic_exporter_framework::{CollectionError, Collector, CollectorDescriptor};

/// Exposes the wall-clock time as seconds since the epoch.
#[derive(Debug, Default)]
pub struct TimeCollector;

impl TimeCollector {
    pub fn new() -> Self {
        Self
    }

    fn desc() -> MetricDesc {
        MetricDesc::gauge(
            "node_time_seconds",
            "System time in seconds since epoch (1970).",
        )
    }
}

#[async_trait]
impl Collector for TimeCollector {
    fn descriptor(&self) -> CollectorDescriptor {
        CollectorDescriptor::prefixed("node_time")
    }

    fn describe(&self) -> Vec<MetricDesc> {
        vec![Self::desc()]
    }

    async fn collect(&self) -> Result<Vec<MetricSample>, CollectionError> {
        let now = Utc::now();
        let secs = now.timestamp() as f64 + f64::from(now.timestamp_subsec_nanos()) / 1e9;
        Ok(vec![Self::desc().sample(secs)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collect_time() {
        let samples = TimeCollector::new().collect().await.unwrap();
        assert_eq!(samples.len(), 1);
        // 2020-01-01T00:00:00Z
        assert!(samples[0].value > 1_577_836_800.0);
    }
}
