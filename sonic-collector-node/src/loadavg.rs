//! System load averages.

use async_trait::async_trait;
use sonic_exporter_common::{MetricDesc, MetricSample};
use sonic_exporter_framework::{CollectionError, Collector, CollectorDescriptor};
use sysinfo::System;

fn descs() -> [MetricDesc; 3] {
    [
        MetricDesc::gauge("node_load1", "1m load average."),
        MetricDesc::gauge("node_load5", "5m load average."),
        MetricDesc::gauge("node_load15", "15m load average."),
    ]
}

/// Exposes the 1, 5 and 15 minute load averages.
#[derive(Debug, Default)]
pub struct LoadavgCollector;

impl LoadavgCollector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Collector for LoadavgCollector {
    fn descriptor(&self) -> CollectorDescriptor {
        CollectorDescriptor::new("loadavg", ["node_load1", "node_load5", "node_load15"])
    }

    fn describe(&self) -> Vec<MetricDesc> {
        descs().to_vec()
    }

    async fn collect(&self) -> Result<Vec<MetricSample>, CollectionError> {
        let load = System::load_average();
        let [one, five, fifteen] = descs();
        Ok(vec![
            one.sample(load.one),
            five.sample(load.five),
            fifteen.sample(load.fifteen),
        ])
    }
}
