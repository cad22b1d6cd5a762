//! Host kernel collectors.
//!
//! Exposes the switch's own operating system metrics under the `node`
//! sub-exporter, with names compatible with the Prometheus node exporter:
//!
//! ```text
//! node_load1
//! node_cpu_seconds_total{cpu="0",mode="idle"}
//! node_memory_MemAvailable_bytes
//! node_disk_read_bytes_total{device="sda"}
//! node_filesystem_avail_bytes{device="/dev/sda1",fstype="ext4",mountpoint="/"}
//! node_collector_up{collector="cpu"}
//! ```
//!
//! Portable readings go through `sysinfo`; per-CPU times, kernel counters
//! and disk statistics come from procfs and are only available on Linux.

pub mod config;
pub mod cpu;
pub mod diskstats;
pub mod error;
pub mod filesystem;
pub mod linux;
pub mod loadavg;
pub mod meminfo;
pub mod stat;
pub mod time;

use sonic_exporter_framework::{BoxedCollector, SubExporter};
use tracing::info;

pub use config::NodeConfig;
pub use cpu::CpuCollector;
pub use diskstats::DiskstatsCollector;
pub use error::NodeError;
pub use filesystem::FilesystemCollector;
pub use loadavg::LoadavgCollector;
pub use meminfo::MeminfoCollector;
pub use stat::StatCollector;
pub use time::TimeCollector;

/// Identity of the node sub-exporter.
pub const IDENTITY: &str = "node";

/// Build the `node` sub-exporter with the configured collectors.
pub fn build(config: &NodeConfig) -> Result<SubExporter, NodeError> {
    let mut exporter = SubExporter::new(IDENTITY);

    for name in &config.collectors {
        let collector: BoxedCollector = match name.as_str() {
            "loadavg" => Box::new(LoadavgCollector::new()),
            "cpu" => Box::new(CpuCollector::new()),
            "diskstats" => Box::new(DiskstatsCollector::new(&config.diskstats)),
            "filesystem" => Box::new(FilesystemCollector::new(&config.filesystem)?),
            "meminfo" => Box::new(MeminfoCollector::new()),
            "time" => Box::new(TimeCollector::new()),
            "stat" => Box::new(StatCollector::new()),
            other => return Err(NodeError::UnknownCollector(other.to_string())),
        };
        exporter.insert_boxed(name.clone(), collector);
    }

    info!(
        collectors = ?exporter.keys().collect::<Vec<_>>(),
        "Node collectors ready"
    );
    Ok(exporter)
}
