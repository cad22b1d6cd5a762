//! Block device I/O statistics.

use async_trait::async_trait;
use sonic_exporter_common::{MetricDesc, MetricSample};
use sonic_exporter_framework::{CollectionError, Collector, CollectorDescriptor};

use crate::config::DiskstatsConfig;
use crate::linux::{self, DiskCounters};

/// `/proc/diskstats` counts sectors of 512 bytes regardless of the device.
const SECTOR_SIZE: f64 = 512.0;

type Extract = fn(&DiskCounters) -> f64;

const FAMILIES: &[(&str, &str, bool, Extract)] = &[
    (
        "node_disk_reads_completed_total",
        "The total number of reads completed successfully.",
        true,
        |d| d.reads as f64,
    ),
    (
        "node_disk_read_bytes_total",
        "The total number of bytes read successfully.",
        true,
        |d| d.sectors_read as f64 * SECTOR_SIZE,
    ),
    (
        "node_disk_read_time_seconds_total",
        "The total number of seconds spent by all reads.",
        true,
        |d| d.read_ms as f64 / 1000.0,
    ),
    (
        "node_disk_writes_completed_total",
        "The total number of writes completed successfully.",
        true,
        |d| d.writes as f64,
    ),
    (
        "node_disk_written_bytes_total",
        "The total number of bytes written successfully.",
        true,
        |d| d.sectors_written as f64 * SECTOR_SIZE,
    ),
    (
        "node_disk_write_time_seconds_total",
        "This is the total number of seconds spent by all writes.",
        true,
        |d| d.write_ms as f64 / 1000.0,
    ),
    (
        "node_disk_io_now",
        "The number of I/Os currently in progress.",
        false,
        |d| d.in_progress as f64,
    ),
    (
        "node_disk_io_time_seconds_total",
        "Total seconds spent doing I/Os.",
        true,
        |d| d.io_ms as f64 / 1000.0,
    ),
];

fn desc(name: &str, help: &str, counter: bool) -> MetricDesc {
    if counter {
        MetricDesc::counter(name, help)
    } else {
        MetricDesc::gauge(name, help)
    }
}

/// Reads `/proc/diskstats`, skipping devices whose name starts with an
/// excluded prefix.
pub struct DiskstatsCollector {
    device_exclude: Vec<String>,
}

impl DiskstatsCollector {
    pub fn new(config: &DiskstatsConfig) -> Self {
        Self {
            device_exclude: config.device_exclude.clone(),
        }
    }

    fn excluded(&self, device: &str) -> bool {
        self.device_exclude.iter().any(|p| device.starts_with(p))
    }

    /// Samples grouped by family, devices in input order.
    pub fn samples(&self, disks: &[DiskCounters]) -> Vec<MetricSample> {
        let disks: Vec<_> = disks.iter().filter(|d| !self.excluded(&d.device)).collect();

        FAMILIES
            .iter()
            .flat_map(|(name, help, counter, extract)| {
                let desc = desc(name, help, *counter);
                disks
                    .iter()
                    .map(|d| desc.sample_with([("device", d.device.as_str())], extract(d)))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

#[async_trait]
impl Collector for DiskstatsCollector {
    fn descriptor(&self) -> CollectorDescriptor {
        CollectorDescriptor::prefixed("node_disk")
    }

    fn describe(&self) -> Vec<MetricDesc> {
        FAMILIES
            .iter()
            .map(|(name, help, counter, _)| desc(name, help, *counter))
            .collect()
    }

    async fn collect(&self) -> Result<Vec<MetricSample>, CollectionError> {
        let disks = linux::disk_stats()?;
        Ok(self.samples(&disks))
    }
}
