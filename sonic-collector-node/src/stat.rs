//! Kernel activity counters from `/proc/stat`.

use async_trait::async_trait;
use sonic_exporter_common::{MetricDesc, MetricSample};
use sonic_exporter_framework::{CollectionError, Collector, CollectorDescriptor};

use crate::linux::{self, KernelCounters};

const BOOT_TIME: &str = "node_boot_time_seconds";
const CONTEXT_SWITCHES: &str = "node_context_switches_total";
const FORKS: &str = "node_forks_total";
const PROCS_RUNNING: &str = "node_procs_running";
const PROCS_BLOCKED: &str = "node_procs_blocked";

fn descs() -> Vec<MetricDesc> {
    vec![
        MetricDesc::gauge(BOOT_TIME, "Node boot time, in unixtime."),
        MetricDesc::counter(CONTEXT_SWITCHES, "Total number of context switches."),
        MetricDesc::counter(FORKS, "Total number of forks."),
        MetricDesc::gauge(PROCS_RUNNING, "Number of processes in runnable state."),
        MetricDesc::gauge(
            PROCS_BLOCKED,
            "Number of processes blocked waiting for I/O to complete.",
        ),
    ]
}

/// Converts kernel counters into samples, skipping fields the kernel omitted.
pub fn stat_samples(counters: &KernelCounters) -> Vec<MetricSample> {
    let values = [
        Some(counters.boot_time as f64),
        Some(counters.context_switches as f64),
        Some(counters.forks as f64),
        counters.procs_running.map(f64::from),
        counters.procs_blocked.map(f64::from),
    ];
    descs()
        .into_iter()
        .zip(values)
        .filter_map(|(desc, value)| value.map(|v| desc.sample(v)))
        .collect()
}

/// Reads boot time, context switches, forks and process states.
#[derive(Debug, Default)]
pub struct StatCollector;

impl StatCollector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Collector for StatCollector {
    fn descriptor(&self) -> CollectorDescriptor {
        CollectorDescriptor::new(
            "stat",
            [BOOT_TIME, CONTEXT_SWITCHES, FORKS, PROCS_RUNNING, PROCS_BLOCKED],
        )
    }

    fn describe(&self) -> Vec<MetricDesc> {
        descs()
    }

    async fn collect(&self) -> Result<Vec<MetricSample>, CollectionError> {
        let (_, counters) = linux::kernel_stats()?;
        Ok(stat_samples(&counters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_samples() {
        let counters = KernelCounters {
            boot_time: 1_700_000_000,
            context_switches: 123_456,
            forks: 789,
            procs_running: Some(3),
            procs_blocked: None,
        };

        let samples = stat_samples(&counters);
        let summary: Vec<_> = samples
            .iter()
            .map(|s| (s.name.as_str(), s.value))
            .collect();
        assert_eq!(
            summary,
            vec![
                (BOOT_TIME, 1_700_000_000.0),
                (CONTEXT_SWITCHES, 123_456.0),
                (FORKS, 789.0),
                (PROCS_RUNNING, 3.0),
            ]
        );
    }
}
