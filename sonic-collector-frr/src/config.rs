//! Configuration for the FRR collectors.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Names of every FRR collector, in default order.
pub const COLLECTORS: &[&str] = &["bgp", "bgp6", "bgp_l2vpn", "status", "route"];

/// `frr` section of the exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrrConfig {
    /// Register the FRR collectors (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory holding the daemons' `.vty` sockets.
    #[serde(default = "default_socket_dir")]
    pub socket_dir: PathBuf,

    /// Per-command timeout in seconds (default: 20).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Enabled collectors.
    #[serde(default = "default_collectors")]
    pub collectors: Vec<String>,

    /// Daemons checked by the status collector.
    #[serde(default = "default_status_daemons")]
    pub status_daemons: Vec<String>,
}

impl Default for FrrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            socket_dir: default_socket_dir(),
            timeout_secs: default_timeout(),
            collectors: default_collectors(),
            status_daemons: default_status_daemons(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_socket_dir() -> PathBuf {
    PathBuf::from("/var/run/frr")
}

fn default_timeout() -> u64 {
    20
}

fn default_collectors() -> Vec<String> {
    COLLECTORS.iter().map(|s| s.to_string()).collect()
}

fn default_status_daemons() -> Vec<String> {
    ["zebra", "bgpd", "staticd"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl FrrConfig {
    /// Validate the section. Returns a human-readable reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_secs == 0 {
            return Err("frr.timeout_secs must be > 0".to_string());
        }
        if let Some(unknown) = self
            .collectors
            .iter()
            .find(|c| !COLLECTORS.contains(&c.as_str()))
        {
            return Err(format!(
                "frr.collectors: unknown collector '{}' (expected one of {})",
                unknown,
                COLLECTORS.join(", ")
            ));
        }
        if self.status_daemons.iter().any(|d| d.is_empty() || d.contains('/')) {
            return Err("frr.status_daemons: daemon names must be plain file names".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: FrrConfig = json5::from_str("{}").unwrap();
        assert!(config.enabled);
        assert_eq!(config.socket_dir, PathBuf::from("/var/run/frr"));
        assert_eq!(config.timeout_secs, 20);
        assert_eq!(
            config.collectors,
            vec!["bgp", "bgp6", "bgp_l2vpn", "status", "route"]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_errors() {
        let config: FrrConfig = json5::from_str(r#"{ collectors: ["ospf"] }"#).unwrap();
        assert!(config.validate().unwrap_err().contains("ospf"));

        let config: FrrConfig = json5::from_str(r#"{ status_daemons: ["../etc"] }"#).unwrap();
        assert!(config.validate().is_err());

        let config: FrrConfig = json5::from_str("{ timeout_secs: 0 }").unwrap();
        assert!(config.validate().is_err());
    }
}
