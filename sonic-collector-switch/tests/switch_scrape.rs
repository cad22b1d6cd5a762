//! End-to-end scrape of the switch collectors over an in-memory database.

use std::sync::Arc;

use sonic_collector_switch::{Database, MemoryDb, SwitchConfig, build_with_db};
use sonic_exporter_framework::{Registry, Scraper};

fn seeded() -> Arc<MemoryDb> {
    let db = Arc::new(MemoryDb::new());
    db.set(
        Database::Counters,
        "COUNTERS_PORT_NAME_MAP",
        [("Ethernet0", "oid:0x1"), ("Ethernet4", "oid:0x2")],
    );
    db.set(
        Database::Counters,
        "COUNTERS:oid:0x1",
        [("SAI_PORT_STAT_IF_IN_OCTETS", "100")],
    );
    db.set(
        Database::Counters,
        "COUNTERS:oid:0x2",
        [("SAI_PORT_STAT_IF_IN_OCTETS", "200")],
    );
    db.set(
        Database::State,
        "TEMPERATURE_INFO|ASIC",
        [("temperature", "45")],
    );
    db.set(
        Database::Counters,
        "CRM:STATS",
        [("crm_stats_ipv4_route_used", "7")],
    );
    db
}

fn scraper(db: Arc<MemoryDb>, cache_ttl_secs: u64) -> Scraper {
    let config = SwitchConfig {
        cache_ttl_secs,
        collectors: vec!["interface".into(), "hw".into(), "crm".into()],
        ..Default::default()
    };
    let mut registry = Registry::new();
    registry.register(build_with_db(db, &config).unwrap()).unwrap();
    Scraper::new(Arc::new(registry))
}

#[tokio::test]
async fn test_scrape_exposes_switch_metrics() {
    let body = scraper(seeded(), 0).render().await;

    assert!(body.contains("# TYPE sonic_interface_receive_bytes_total counter"));
    assert!(body.contains("sonic_interface_receive_bytes_total{device=\"Ethernet0\"} 100"));
    assert!(body.contains("sonic_interface_receive_bytes_total{device=\"Ethernet4\"} 200"));
    assert!(body.contains("sonic_hw_temperature_celsius{sensor=\"ASIC\"} 45"));
    assert!(body.contains("sonic_crm_stats_used{resource=\"ipv4_route\"} 7"));
    assert!(body.contains("sonic_collector_up{collector=\"interface\"} 1"));
    assert!(body.contains("sonic_collector_up{collector=\"hw\"} 1"));
    assert!(body.contains("sonic_collector_up{collector=\"crm\"} 1"));
    assert!(body.contains("sonic_up 1"));
}

#[tokio::test]
async fn test_database_outage_isolated_per_collector() {
    let db = seeded();
    let scraper = scraper(db.clone(), 0);
    db.set_unavailable(true);

    let body = scraper.render().await;

    assert!(!body.contains("sonic_interface_receive_bytes_total{"));
    assert!(body.contains("sonic_collector_up{collector=\"interface\"} 0"));
    assert!(body.contains("sonic_collector_up{collector=\"hw\"} 0"));
    assert!(body.contains("sonic_collector_up{collector=\"crm\"} 0"));
    // The bundle itself still ran.
    assert!(body.contains("sonic_up 1"));
}

#[tokio::test]
async fn test_cached_read_survives_outage() {
    let db = seeded();
    let scraper = scraper(db.clone(), 60);

    let first = scraper.render().await;
    db.set_unavailable(true);
    let second = scraper.render().await;

    assert!(second.contains("sonic_crm_stats_used{resource=\"ipv4_route\"} 7"));
    assert!(second.contains("sonic_collector_up{collector=\"crm\"} 1"));
    let strip = |body: &str| {
        body.lines()
            .filter(|l| !l.starts_with("sonic_collector_duration_seconds"))
            .map(str::to_string)
            .collect::<Vec<_>>()
    };
    assert_eq!(strip(&first), strip(&second));
}
