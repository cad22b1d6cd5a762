//! Per-CPU time spent in each mode.

use async_trait::async_trait;
use sonic_exporter_common::{MetricDesc, MetricSample};
use sonic_exporter_framework::{CollectionError, Collector, CollectorDescriptor};

use crate::linux::{self, CpuSeconds};

fn desc() -> MetricDesc {
    MetricDesc::counter(
        "node_cpu_seconds_total",
        "Seconds the CPUs spent in each mode.",
    )
}

/// Converts per-CPU mode times into `node_cpu_seconds_total` samples.
pub fn cpu_samples(cpus: &[CpuSeconds]) -> Vec<MetricSample> {
    let desc = desc();
    cpus.iter()
        .flat_map(|cpu| {
            let index = cpu.cpu.to_string();
            cpu.modes()
                .into_iter()
                .map(|(mode, secs)| {
                    desc.sample_with([("cpu", index.as_str()), ("mode", mode)], secs)
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Reads CPU times from `/proc/stat`.
#[derive(Debug, Default)]
pub struct CpuCollector;

impl CpuCollector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Collector for CpuCollector {
    fn descriptor(&self) -> CollectorDescriptor {
        CollectorDescriptor::prefixed("node_cpu")
    }

    fn describe(&self) -> Vec<MetricDesc> {
        vec![desc()]
    }

    async fn collect(&self) -> Result<Vec<MetricSample>, CollectionError> {
        let (cpus, _) = linux::kernel_stats()?;
        Ok(cpu_samples(&cpus))
    }
}
