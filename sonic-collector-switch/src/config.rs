//! Configuration for the switch collectors.

use serde::{Deserialize, Serialize};

/// Names of every switch collector, in default order.
pub const COLLECTORS: &[&str] = &["interface", "hw", "crm", "queue"];

/// `switch` section of the exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchConfig {
    /// Register the switch collectors (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Redis server holding the SONiC databases.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Per-request timeout in seconds (default: 5).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// How long a successful read is reused, in seconds (default: 15, 0 disables).
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Enabled collectors.
    #[serde(default = "default_collectors")]
    pub collectors: Vec<String>,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redis_url: default_redis_url(),
            timeout_secs: default_timeout(),
            cache_ttl_secs: default_cache_ttl(),
            collectors: default_collectors(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_redis_url() -> String {
    "redis+unix:///var/run/redis/redis.sock".to_string()
}

fn default_timeout() -> u64 {
    5
}

fn default_cache_ttl() -> u64 {
    15
}

fn default_collectors() -> Vec<String> {
    COLLECTORS.iter().map(|s| s.to_string()).collect()
}

impl SwitchConfig {
    /// Validate the section. Returns a human-readable reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_secs == 0 {
            return Err("switch.timeout_secs must be > 0".to_string());
        }
        if let Some(unknown) = self
            .collectors
            .iter()
            .find(|c| !COLLECTORS.contains(&c.as_str()))
        {
            return Err(format!(
                "switch.collectors: unknown collector '{}' (expected one of {})",
                unknown,
                COLLECTORS.join(", ")
            ));
        }
        Ok(())
    }
}
