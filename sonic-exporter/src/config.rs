//! Configuration for the SONiC exporter.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sonic_collector_frr::FrrConfig;
use sonic_collector_node::NodeConfig;
use sonic_collector_switch::SwitchConfig;
use sonic_exporter_common::{LoggingConfig, load_config, parse_config};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] sonic_exporter_common::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// HTTP endpoint settings.
    #[serde(default)]
    pub web: WebConfig,

    /// Scrape orchestration settings.
    #[serde(default)]
    pub scrape: ScrapeConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// SONiC Redis collectors.
    #[serde(default)]
    pub switch: SwitchConfig,

    /// Host kernel collectors.
    #[serde(default)]
    pub node: NodeConfig,

    /// FRR routing daemon collectors.
    #[serde(default)]
    pub frr: FrrConfig,
}

/// HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Address to listen on (default: "0.0.0.0:9101").
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Path for the metrics endpoint (default: "/metrics").
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,

    /// Concurrent scrapes allowed before answering 503 (0 = unlimited).
    #[serde(default)]
    pub max_requests_in_flight: usize,

    /// Serve HTTPS instead of plain HTTP.
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

fn default_listen_address() -> String {
    "0.0.0.0:9101".to_string()
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            metrics_path: default_metrics_path(),
            max_requests_in_flight: 0,
            tls: None,
        }
    }
}

impl WebConfig {
    /// The `host:port` bind target, accepting the `:port` shorthand for all
    /// interfaces.
    ///
    /// Only the shape is checked here; hostnames are resolved when binding.
    /// IPv6 literals must be bracketed.
    pub fn bind_address(&self) -> Result<String, ConfigError> {
        let invalid = || {
            ConfigError::Validation(format!(
                "Invalid listen address: {}",
                self.listen_address
            ))
        };

        let address = match self.listen_address.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{}", port),
            None => self.listen_address.clone(),
        };
        let (host, port) = address.rsplit_once(':').ok_or_else(invalid)?;
        port.parse::<u16>().map_err(|_| invalid())?;

        let bare = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        if bare.is_empty() || bare.contains(char::is_whitespace) {
            return Err(invalid());
        }
        if bare.contains(':') && bare.len() == host.len() {
            return Err(invalid());
        }

        Ok(address)
    }
}

/// Server certificate and key, PEM encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    pub cert_file: PathBuf,
    pub key_file: PathBuf,

    /// CA bundle used to verify client certificates. When set, clients
    /// must present a certificate.
    #[serde(default)]
    pub client_ca_file: Option<PathBuf>,
}

/// Scrape orchestration configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Upper bound on a single collector's run. Unset leaves timeouts to
    /// the collectors themselves.
    #[serde(default)]
    pub collector_timeout_secs: Option<u64>,
}

impl ScrapeConfig {
    pub fn collector_timeout(&self) -> Option<Duration> {
        self.collector_timeout_secs.map(Duration::from_secs)
    }
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: ExporterConfig = load_config(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = parse_config(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.web.bind_address()?;

        if !self.web.metrics_path.starts_with('/') {
            return Err(ConfigError::Validation(
                "Metrics path must start with /".to_string(),
            ));
        }
        if self.web.metrics_path == "/" || self.web.metrics_path == "/health" {
            return Err(ConfigError::Validation(format!(
                "Metrics path {} collides with a built-in route",
                self.web.metrics_path
            )));
        }

        if self.scrape.collector_timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "collector_timeout_secs must be > 0".to_string(),
            ));
        }

        self.switch
            .validate()
            .and_then(|_| self.node.validate())
            .and_then(|_| self.frr.validate())
            .map_err(ConfigError::Validation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonic_exporter_common::LogFormat;

    #[test]
    fn test_parse_minimal_config() {
        let config = ExporterConfig::parse("{}").unwrap();

        assert_eq!(config.web.listen_address, "0.0.0.0:9101");
        assert_eq!(config.web.metrics_path, "/metrics");
        assert_eq!(config.web.max_requests_in_flight, 0);
        assert!(config.web.tls.is_none());
        assert_eq!(config.scrape.collector_timeout(), None);
        assert!(config.switch.enabled);
        assert!(config.node.enabled);
        assert!(config.frr.enabled);
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            web: {
                listen_address: "127.0.0.1:9102",
                metrics_path: "/sonic/metrics",
                max_requests_in_flight: 4,
                tls: {
                    cert_file: "/etc/sonic/exporter.crt",
                    key_file: "/etc/sonic/exporter.key",
                    client_ca_file: "/etc/sonic/ca.crt",
                },
            },
            scrape: { collector_timeout_secs: 30 },
            logging: { level: "debug", format: "json" },
            switch: { redis_url: "redis://127.0.0.1:6379", collectors: ["interface"] },
            node: { enabled: false },
            frr: { socket_dir: "/run/frr", collectors: ["bgp", "status"] },
        }"#;

        let config = ExporterConfig::parse(json).unwrap();

        assert_eq!(config.web.bind_address().unwrap(), "127.0.0.1:9102");
        assert_eq!(config.web.metrics_path, "/sonic/metrics");
        assert_eq!(config.web.max_requests_in_flight, 4);
        let tls = config.web.tls.unwrap();
        assert_eq!(tls.key_file, PathBuf::from("/etc/sonic/exporter.key"));
        assert_eq!(tls.client_ca_file, Some(PathBuf::from("/etc/sonic/ca.crt")));
        assert_eq!(
            config.scrape.collector_timeout(),
            Some(Duration::from_secs(30))
        );
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.switch.collectors, vec!["interface"]);
        assert!(!config.node.enabled);
        assert_eq!(config.frr.socket_dir, PathBuf::from("/run/frr"));
    }

    #[test]
    fn test_port_shorthand() {
        let web = WebConfig {
            listen_address: ":9101".to_string(),
            ..Default::default()
        };
        assert_eq!(web.bind_address().unwrap(), "0.0.0.0:9101");
    }

    #[test]
    fn test_hostname_listen_address() {
        let config =
            ExporterConfig::parse(r#"{ web: { listen_address: "localhost:9101" } }"#).unwrap();
        assert_eq!(config.web.bind_address().unwrap(), "localhost:9101");

        let config =
            ExporterConfig::parse(r#"{ web: { listen_address: "[::1]:9101" } }"#).unwrap();
        assert_eq!(config.web.bind_address().unwrap(), "[::1]:9101");
    }

    #[test]
    fn test_validate_invalid_listen() {
        let result = ExporterConfig::parse(r#"{ web: { listen_address: "not-an-address" } }"#);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid listen address")
        );

        for address in ["localhost", "localhost:http", ":70000", ":", "::1:9101", " :9101"] {
            let web = WebConfig {
                listen_address: address.to_string(),
                ..Default::default()
            };
            assert!(web.bind_address().is_err(), "{}", address);
        }
    }

    #[test]
    fn test_validate_invalid_path() {
        let result = ExporterConfig::parse(r#"{ web: { metrics_path: "metrics" } }"#);
        assert!(result.unwrap_err().to_string().contains("must start with /"));

        assert!(ExporterConfig::parse(r#"{ web: { metrics_path: "/" } }"#).is_err());
        assert!(ExporterConfig::parse(r#"{ web: { metrics_path: "/health" } }"#).is_err());
    }

    #[test]
    fn test_validate_zero_timeout() {
        assert!(ExporterConfig::parse(r#"{ scrape: { collector_timeout_secs: 0 } }"#).is_err());
    }

    #[test]
    fn test_validate_section_error() {
        let result = ExporterConfig::parse(r#"{ frr: { collectors: ["ospf"] } }"#);
        let message = result.unwrap_err().to_string();
        assert!(message.contains("frr.collectors"), "{}", message);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sonic-exporter.json5");
        std::fs::write(&path, "{ web: { listen_address: \":9200\" } }").unwrap();

        let config = ExporterConfig::load_from_file(&path).unwrap();
        assert_eq!(config.web.bind_address().unwrap(), "0.0.0.0:9200");

        assert!(matches!(
            ExporterConfig::load_from_file(dir.path().join("missing.json5")),
            Err(ConfigError::Load(_))
        ));
    }
}
