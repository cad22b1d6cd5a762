//! Configuration for the node collectors.

use serde::{Deserialize, Serialize};

/// Names of every node collector, in default order.
pub const COLLECTORS: &[&str] = &[
    "loadavg",
    "cpu",
    "diskstats",
    "filesystem",
    "meminfo",
    "time",
    "stat",
];

/// `node` section of the exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Register the node collectors (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Enabled collectors.
    #[serde(default = "default_collectors")]
    pub collectors: Vec<String>,

    /// Filesystem collector settings.
    #[serde(default)]
    pub filesystem: FilesystemConfig,

    /// Disk statistics collector settings.
    #[serde(default)]
    pub diskstats: DiskstatsConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            collectors: default_collectors(),
            filesystem: FilesystemConfig::default(),
            diskstats: DiskstatsConfig::default(),
        }
    }
}

/// Mount point filtering for the filesystem collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesystemConfig {
    /// Glob patterns of mount points to skip.
    #[serde(default = "default_mount_points_exclude")]
    pub mount_points_exclude: Vec<String>,

    /// Filesystem types to skip.
    #[serde(default = "default_fs_types_exclude")]
    pub fs_types_exclude: Vec<String>,
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            mount_points_exclude: default_mount_points_exclude(),
            fs_types_exclude: default_fs_types_exclude(),
        }
    }
}

/// Device filtering for the diskstats collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskstatsConfig {
    /// Device name prefixes to skip.
    #[serde(default = "default_device_exclude")]
    pub device_exclude: Vec<String>,
}

impl Default for DiskstatsConfig {
    fn default() -> Self {
        Self {
            device_exclude: default_device_exclude(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_collectors() -> Vec<String> {
    COLLECTORS.iter().map(|s| s.to_string()).collect()
}

fn default_mount_points_exclude() -> Vec<String> {
    ["/dev", "/dev/**", "/proc", "/proc/**", "/sys", "/sys/**", "/run/**"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_fs_types_exclude() -> Vec<String> {
    [
        "tmpfs",
        "devtmpfs",
        "devfs",
        "sysfs",
        "proc",
        "cgroup",
        "cgroup2",
        "securityfs",
        "debugfs",
        "configfs",
        "fusectl",
        "hugetlbfs",
        "mqueue",
        "pstore",
        "binfmt_misc",
        "autofs",
        "overlay",
        "squashfs",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_device_exclude() -> Vec<String> {
    ["loop", "ram", "dm-"].iter().map(|s| s.to_string()).collect()
}

impl NodeConfig {
    /// Validate the section. Returns a human-readable reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(unknown) = self
            .collectors
            .iter()
            .find(|c| !COLLECTORS.contains(&c.as_str()))
        {
            return Err(format!(
                "node.collectors: unknown collector '{}' (expected one of {})",
                unknown,
                COLLECTORS.join(", ")
            ));
        }
        for pattern in &self.filesystem.mount_points_exclude {
            if let Err(e) = glob::Pattern::new(pattern) {
                return Err(format!(
                    "node.filesystem.mount_points_exclude: invalid pattern '{}': {}",
                    pattern, e
                ));
            }
        }
        Ok(())
    }
}
