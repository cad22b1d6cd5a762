//! Mounted filesystem capacity.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use sonic_exporter_common::{MetricDesc, MetricSample};
use sonic_exporter_framework::{CollectionError, Collector, CollectorDescriptor};
use sysinfo::Disks;
use tracing::trace;

use crate::config::FilesystemConfig;
use crate::error::NodeError;

/// One mounted filesystem.
#[derive(Debug, Clone, PartialEq)]
pub struct Mount {
    pub device: String,
    pub mountpoint: String,
    pub fstype: String,
    pub size: u64,
    pub avail: u64,
}

/// Mount point and filesystem type exclusions.
#[derive(Debug, Clone)]
pub struct MountFilter {
    mount_points: Vec<glob::Pattern>,
    fs_types: Vec<String>,
}

impl MountFilter {
    pub fn new(config: &FilesystemConfig) -> Result<Self, NodeError> {
        let mount_points = config
            .mount_points_exclude
            .iter()
            .map(|p| {
                glob::Pattern::new(p).map_err(|source| NodeError::InvalidPattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            mount_points,
            fs_types: config.fs_types_exclude.clone(),
        })
    }

    pub fn excludes(&self, mount: &Mount) -> bool {
        self.fs_types.iter().any(|t| *t == mount.fstype)
            || self.mount_points.iter().any(|p| p.matches(&mount.mountpoint))
    }
}

fn size() -> MetricDesc {
    MetricDesc::gauge("node_filesystem_size_bytes", "Filesystem size in bytes.")
}

fn avail() -> MetricDesc {
    MetricDesc::gauge(
        "node_filesystem_avail_bytes",
        "Filesystem space available to non-root users in bytes.",
    )
}

/// Samples for every mount the filter keeps. The same mount point listed
/// twice (bind mounts, stacked mounts) is reported once.
pub fn filesystem_samples(mounts: &[Mount], filter: &MountFilter) -> Vec<MetricSample> {
    let mut seen = std::collections::HashSet::new();
    let kept: Vec<_> = mounts
        .iter()
        .filter(|m| {
            if filter.excludes(m) {
                trace!(mountpoint = %m.mountpoint, fstype = %m.fstype, "Excluding filesystem");
                return false;
            }
            seen.insert(m.mountpoint.as_str())
        })
        .collect();

    let labels = |m: &Mount| {
        [
            ("device", m.device.clone()),
            ("mountpoint", m.mountpoint.clone()),
            ("fstype", m.fstype.clone()),
        ]
    };

    let (size, avail) = (size(), avail());
    let mut samples = Vec::with_capacity(kept.len() * 2);
    samples.extend(kept.iter().map(|m| size.sample_with(labels(m), m.size as f64)));
    samples.extend(kept.iter().map(|m| avail.sample_with(labels(m), m.avail as f64)));
    samples
}

/// Reads mounted filesystems through `sysinfo`.
///
/// Filesystem stats can block on unresponsive mounts, so reads happen on the
/// blocking thread pool.
pub struct FilesystemCollector {
    disks: Arc<Mutex<Disks>>,
    filter: MountFilter,
}

impl FilesystemCollector {
    pub fn new(config: &FilesystemConfig) -> Result<Self, NodeError> {
        Ok(Self {
            disks: Arc::new(Mutex::new(Disks::new_with_refreshed_list())),
            filter: MountFilter::new(config)?,
        })
    }
}

#[async_trait]
impl Collector for FilesystemCollector {
    fn descriptor(&self) -> CollectorDescriptor {
        CollectorDescriptor::prefixed("node_filesystem")
    }

    fn describe(&self) -> Vec<MetricDesc> {
        vec![size(), avail()]
    }

    async fn collect(&self) -> Result<Vec<MetricSample>, CollectionError> {
        let disks = self.disks.clone();
        let mounts = tokio::task::spawn_blocking(move || {
            let mut disks = disks.lock();
            disks.refresh(true);
            disks
                .list()
                .iter()
                .map(|d| Mount {
                    device: d.name().to_string_lossy().to_string(),
                    mountpoint: d.mount_point().to_string_lossy().to_string(),
                    fstype: d.file_system().to_string_lossy().to_string(),
                    size: d.total_space(),
                    avail: d.available_space(),
                })
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| CollectionError::unavailable(format!("filesystem read aborted: {}", e)))?;

        Ok(filesystem_samples(&mounts, &self.filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mount(mountpoint: &str, fstype: &str) -> Mount {
        Mount {
            device: "/dev/sda1".to_string(),
            mountpoint: mountpoint.to_string(),
            fstype: fstype.to_string(),
            size: 1000,
            avail: 400,
        }
    }

    #[test]
    fn test_filter_and_dedup() {
        let filter = MountFilter::new(&FilesystemConfig::default()).unwrap();
        let mounts = vec![
            mount("/", "ext4"),
            mount("/host", "ext4"),
            mount("/", "ext4"),
            mount("/run/user/1000", "ext4"),
            mount("/dev/shm", "tmpfs"),
            mount("/proc", "proc"),
        ];

        let samples = filesystem_samples(&mounts, &filter);
        let summary: Vec<_> = samples
            .iter()
            .map(|s| (s.name.as_str(), s.labels["mountpoint"].as_str(), s.value))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("node_filesystem_size_bytes", "/", 1000.0),
                ("node_filesystem_size_bytes", "/host", 1000.0),
                ("node_filesystem_avail_bytes", "/", 400.0),
                ("node_filesystem_avail_bytes", "/host", 400.0),
            ]
        );
        assert_eq!(samples[0].labels["fstype"], "ext4");
        assert_eq!(samples[0].labels["device"], "/dev/sda1");
    }

    #[test]
    fn test_invalid_pattern() {
        let config = FilesystemConfig {
            mount_points_exclude: vec!["[".to_string()],
            fs_types_exclude: Vec::new(),
        };
        assert!(matches!(
            MountFilter::new(&config),
            Err(NodeError::InvalidPattern { .. })
        ));
    }
}
