//! SONiC switch collectors.
//!
//! Reads interface counters, platform hardware state, CRM utilisation and
//! queue counters from the SONiC Redis databases and exposes them under the
//! `sonic` sub-exporter:
//!
//! ```text
//! sonic_interface_receive_bytes_total{device="Ethernet0"}
//! sonic_hw_temperature_celsius{sensor="ASIC"}
//! sonic_crm_stats_used{resource="ipv4_route"}
//! sonic_queue_dropped_packets_total{device="Ethernet0",queue="3",queue_type="unicast"}
//! sonic_collector_up{collector="interface"}
//! ```

pub mod cache;
pub mod config;
pub mod crm;
pub mod db;
pub mod error;
pub mod hw;
pub mod interface;
pub mod queue;

use std::sync::Arc;
use std::time::Duration;

use sonic_exporter_framework::{BoxedCollector, SubExporter};
use tracing::info;

pub use cache::SampleCache;
pub use config::SwitchConfig;
pub use crm::CrmCollector;
pub use db::{Database, Fields, MemoryDb, RedisDb, SonicDb};
pub use error::{DbError, SwitchError};
pub use hw::HwCollector;
pub use interface::InterfaceCollector;
pub use queue::QueueCollector;

/// Identity of the switch sub-exporter.
pub const IDENTITY: &str = "sonic";

/// Build the `sonic` sub-exporter against the configured Redis server.
pub fn build(config: &SwitchConfig) -> Result<SubExporter, SwitchError> {
    let db = RedisDb::open(&config.redis_url, Duration::from_secs(config.timeout_secs))?;
    build_with_db(Arc::new(db), config)
}

/// Build the `sonic` sub-exporter over any database backend.
pub fn build_with_db(
    db: Arc<dyn SonicDb>,
    config: &SwitchConfig,
) -> Result<SubExporter, SwitchError> {
    let ttl = Duration::from_secs(config.cache_ttl_secs);
    let mut exporter = SubExporter::new(IDENTITY);

    for name in &config.collectors {
        let cache = SampleCache::new(ttl);
        let collector: BoxedCollector = match name.as_str() {
            "interface" => Box::new(InterfaceCollector::new(db.clone(), cache)),
            "hw" => Box::new(HwCollector::new(db.clone(), cache)),
            "crm" => Box::new(CrmCollector::new(db.clone(), cache)),
            "queue" => Box::new(QueueCollector::new(db.clone(), cache)),
            other => return Err(SwitchError::UnknownCollector(other.to_string())),
        };
        exporter.insert_boxed(name.clone(), collector);
    }

    info!(
        collectors = ?exporter.keys().collect::<Vec<_>>(),
        cache_ttl_secs = config.cache_ttl_secs,
        "Switch collectors ready"
    );
    Ok(exporter)
}

/// Numeric hash field, if present and parseable.
pub(crate) fn number(fields: &Fields, field: &str) -> Option<f64> {
    fields.get(field)?.trim().parse().ok()
}

/// `"true"` / `"false"` as 1 / 0.
pub(crate) fn flag(value: &str) -> Option<f64> {
    match value.trim() {
        v if v.eq_ignore_ascii_case("true") => Some(1.0),
        v if v.eq_ignore_ascii_case("false") => Some(0.0),
        _ => None,
    }
}

/// `"up"` / `"down"` as 1 / 0.
pub(crate) fn up_down(value: &str) -> Option<f64> {
    match value.trim() {
        "up" => Some(1.0),
        "down" => Some(0.0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_helpers() {
        let fields: Fields = [("a".to_string(), " 12 ".to_string())].into();
        assert_eq!(number(&fields, "a"), Some(12.0));
        assert_eq!(number(&fields, "b"), None);
        assert_eq!(flag("True"), Some(1.0));
        assert_eq!(flag("false"), Some(0.0));
        assert_eq!(flag("N/A"), None);
        assert_eq!(up_down("down"), Some(0.0));
    }

    #[test]
    fn test_build_filters_collectors() {
        let config = SwitchConfig {
            collectors: vec!["crm".to_string(), "hw".to_string()],
            ..Default::default()
        };
        let exporter = build_with_db(Arc::new(MemoryDb::new()), &config).unwrap();
        assert_eq!(exporter.identity(), "sonic");
        assert_eq!(exporter.keys().collect::<Vec<_>>(), vec!["crm", "hw"]);
    }

    #[test]
    fn test_build_rejects_unknown_collector() {
        let config = SwitchConfig {
            collectors: vec!["acl".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            build_with_db(Arc::new(MemoryDb::new()), &config),
            Err(SwitchError::UnknownCollector(name)) if name == "acl"
        ));
    }

    #[test]
    fn test_build_rejects_bad_url() {
        let config = SwitchConfig {
            redis_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(build(&config), Err(SwitchError::InvalidUrl { .. })));
    }
}
