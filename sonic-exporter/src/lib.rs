//! Prometheus exporter for SONiC network switches.
//!
//! Every scrape of the metrics endpoint runs all registered collectors and
//! answers with their combined output. A collector that fails is reported
//! through its `<identity>_up` gauge and never fails the scrape.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  SONiC Redis │────>│              │     │              │
//! │  host kernel │────>│   Registry   │────>│ HTTP Server  │
//! │  FRR VTY     │────>│   Scraper    │     │  (/metrics)  │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! sonic-exporter --config /etc/sonic/sonic-exporter.json5
//! ```
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod config;
pub mod http;

use sonic_exporter_framework::{FrameworkError, Registry};
use tracing::info;

pub use config::{ConfigError, ExporterConfig};
pub use http::{HttpServer, ServeError, create_router};

/// Build the registry from the enabled collector sections.
///
/// Sections register in a fixed order (`sonic`, `node`, `frr`), which is
/// also the order of their output in every scrape.
pub fn build_registry(config: &ExporterConfig) -> Result<Registry, FrameworkError> {
    let mut registry = Registry::new();

    if config.switch.enabled {
        let switch = sonic_collector_switch::build(&config.switch)
            .map_err(|e| FrameworkError::construction(sonic_collector_switch::IDENTITY, e))?;
        registry.register(switch)?;
    }

    if config.node.enabled {
        let node = sonic_collector_node::build(&config.node)
            .map_err(|e| FrameworkError::construction(sonic_collector_node::IDENTITY, e))?;
        registry.register(node)?;
    }

    if config.frr.enabled {
        let frr = sonic_collector_frr::build(&config.frr)
            .map_err(|e| FrameworkError::construction(sonic_collector_frr::IDENTITY, e))?;
        registry.register(frr)?;
    }

    info!(collectors = ?registry.identities(), "Registry ready");
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_default_registry() {
        let registry = build_registry(&ExporterConfig::default()).unwrap();
        assert_eq!(registry.identities(), vec!["sonic", "node", "frr"]);
    }

    #[test]
    fn test_disabled_sections() {
        let config = ExporterConfig::parse(
            "{ switch: { enabled: false }, frr: { enabled: false } }",
        )
        .unwrap();
        let registry = build_registry(&config).unwrap();
        assert_eq!(registry.identities(), vec!["node"]);
    }

    #[test]
    fn test_bad_redis_url_is_fatal() {
        let mut config = ExporterConfig::default();
        config.switch.redis_url = "not a url".to_string();

        let err = build_registry(&config).unwrap_err();
        assert!(matches!(
            err,
            FrameworkError::Construction { ref collector, .. } if collector == "sonic"
        ));
    }
}
