//! Front-panel port counters and status.

use std::sync::Arc;

use async_trait::async_trait;
use sonic_exporter_common::{MetricDesc, MetricSample};
use sonic_exporter_framework::{CollectionError, Collector, CollectorDescriptor};

use crate::cache::SampleCache;
use crate::db::{Database, Fields, SonicDb};
use crate::{number, up_down};

const PORT_NAME_MAP: &str = "COUNTERS_PORT_NAME_MAP";

/// SAI counters summed into each exposed counter.
const COUNTERS: &[(&str, &str, &[&str])] = &[
    (
        "sonic_interface_receive_bytes_total",
        "Bytes received on the interface.",
        &["SAI_PORT_STAT_IF_IN_OCTETS"],
    ),
    (
        "sonic_interface_transmit_bytes_total",
        "Bytes transmitted on the interface.",
        &["SAI_PORT_STAT_IF_OUT_OCTETS"],
    ),
    (
        "sonic_interface_receive_packets_total",
        "Packets received on the interface.",
        &[
            "SAI_PORT_STAT_IF_IN_UCAST_PKTS",
            "SAI_PORT_STAT_IF_IN_NON_UCAST_PKTS",
        ],
    ),
    (
        "sonic_interface_transmit_packets_total",
        "Packets transmitted on the interface.",
        &[
            "SAI_PORT_STAT_IF_OUT_UCAST_PKTS",
            "SAI_PORT_STAT_IF_OUT_NON_UCAST_PKTS",
        ],
    ),
    (
        "sonic_interface_receive_errors_total",
        "Receive errors on the interface.",
        &["SAI_PORT_STAT_IF_IN_ERRORS"],
    ),
    (
        "sonic_interface_transmit_errors_total",
        "Transmit errors on the interface.",
        &["SAI_PORT_STAT_IF_OUT_ERRORS"],
    ),
    (
        "sonic_interface_receive_dropped_total",
        "Received packets discarded on the interface.",
        &["SAI_PORT_STAT_IF_IN_DISCARDS"],
    ),
    (
        "sonic_interface_transmit_dropped_total",
        "Transmitted packets discarded on the interface.",
        &["SAI_PORT_STAT_IF_OUT_DISCARDS"],
    ),
];

/// Reads per-port SAI counters from COUNTERS_DB and port state from APPL_DB.
pub struct InterfaceCollector {
    db: Arc<dyn SonicDb>,
    cache: SampleCache,
}

impl InterfaceCollector {
    pub fn new(db: Arc<dyn SonicDb>, cache: SampleCache) -> Self {
        Self { db, cache }
    }

    fn oper_status() -> MetricDesc {
        MetricDesc::gauge(
            "sonic_interface_operational_status",
            "Operational status of the interface (1 up, 0 down).",
        )
    }

    fn admin_status() -> MetricDesc {
        MetricDesc::gauge(
            "sonic_interface_admin_status",
            "Administrative status of the interface (1 up, 0 down).",
        )
    }

    fn speed() -> MetricDesc {
        MetricDesc::gauge(
            "sonic_interface_speed_bits",
            "Configured speed of the interface in bits per second.",
        )
    }

    async fn read(&self) -> Result<Vec<MetricSample>, CollectionError> {
        let ports = self.db.hgetall(Database::Counters, PORT_NAME_MAP).await?;
        if ports.is_empty() {
            return Err(CollectionError::unavailable(format!(
                "{} is empty",
                PORT_NAME_MAP
            )));
        }

        let mut samples = Vec::new();
        for (port, oid) in &ports {
            let counters = self
                .db
                .hgetall(Database::Counters, &format!("COUNTERS:{}", oid))
                .await?;
            samples.extend(counter_samples(port, &counters));

            let state = self
                .db
                .hgetall(Database::Appl, &format!("PORT_TABLE:{}", port))
                .await?;
            samples.extend(state_samples(port, &state));
        }
        Ok(samples)
    }
}

fn counter_samples(port: &str, counters: &Fields) -> Vec<MetricSample> {
    COUNTERS
        .iter()
        .filter_map(|(name, help, fields)| {
            let values: Vec<f64> = fields.iter().filter_map(|f| number(counters, f)).collect();
            if values.is_empty() {
                return None;
            }
            Some(
                MetricDesc::counter(*name, *help)
                    .sample_with([("device", port)], values.iter().sum()),
            )
        })
        .collect()
}

fn state_samples(port: &str, state: &Fields) -> Vec<MetricSample> {
    let mut samples = Vec::new();
    if let Some(up) = state.get("oper_status").and_then(|s| up_down(s)) {
        samples.push(InterfaceCollector::oper_status().sample_with([("device", port)], up));
    }
    if let Some(up) = state.get("admin_status").and_then(|s| up_down(s)) {
        samples.push(InterfaceCollector::admin_status().sample_with([("device", port)], up));
    }
    // PORT_TABLE speed is in Mb/s.
    if let Some(mbps) = number(state, "speed") {
        samples.push(InterfaceCollector::speed().sample_with([("device", port)], mbps * 1e6));
    }
    samples
}

#[async_trait]
impl Collector for InterfaceCollector {
    fn descriptor(&self) -> CollectorDescriptor {
        CollectorDescriptor::prefixed("sonic_interface")
    }

    fn describe(&self) -> Vec<MetricDesc> {
        let mut descs: Vec<_> = COUNTERS
            .iter()
            .map(|(name, help, _)| MetricDesc::counter(*name, *help))
            .collect();
        descs.push(Self::oper_status());
        descs.push(Self::admin_status());
        descs.push(Self::speed());
        descs
    }

    async fn collect(&self) -> Result<Vec<MetricSample>, CollectionError> {
        self.cache.get_or_refresh(|| self.read()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;
    use std::time::Duration;

    fn seeded() -> Arc<MemoryDb> {
        let db = Arc::new(MemoryDb::new());
        db.set(
            Database::Counters,
            PORT_NAME_MAP,
            [("Ethernet0", "oid:0x1000000000002")],
        );
        db.set(
            Database::Counters,
            "COUNTERS:oid:0x1000000000002",
            [
                ("SAI_PORT_STAT_IF_IN_OCTETS", "1000"),
                ("SAI_PORT_STAT_IF_OUT_OCTETS", "2000"),
                ("SAI_PORT_STAT_IF_IN_UCAST_PKTS", "10"),
                ("SAI_PORT_STAT_IF_IN_NON_UCAST_PKTS", "5"),
                ("SAI_PORT_STAT_IF_IN_ERRORS", "1"),
            ],
        );
        db.set(
            Database::Appl,
            "PORT_TABLE:Ethernet0",
            [
                ("oper_status", "up"),
                ("admin_status", "up"),
                ("speed", "100000"),
            ],
        );
        db
    }

    fn value(samples: &[MetricSample], name: &str) -> Option<f64> {
        samples.iter().find(|s| s.name == name).map(|s| s.value)
    }

    #[tokio::test]
    async fn test_collect_port() {
        let collector = InterfaceCollector::new(seeded(), SampleCache::new(Duration::ZERO));
        let samples = collector.collect().await.unwrap();

        assert_eq!(value(&samples, "sonic_interface_receive_bytes_total"), Some(1000.0));
        assert_eq!(value(&samples, "sonic_interface_transmit_bytes_total"), Some(2000.0));
        assert_eq!(value(&samples, "sonic_interface_receive_packets_total"), Some(15.0));
        assert_eq!(value(&samples, "sonic_interface_receive_errors_total"), Some(1.0));
        // Counters absent from the hash are not exposed.
        assert_eq!(value(&samples, "sonic_interface_transmit_packets_total"), None);

        assert_eq!(value(&samples, "sonic_interface_operational_status"), Some(1.0));
        assert_eq!(value(&samples, "sonic_interface_speed_bits"), Some(100e9));
        assert!(
            samples
                .iter()
                .all(|s| s.labels.get("device").map(String::as_str) == Some("Ethernet0"))
        );
    }

    #[tokio::test]
    async fn test_empty_port_map_fails() {
        let collector = InterfaceCollector::new(
            Arc::new(MemoryDb::new()),
            SampleCache::new(Duration::ZERO),
        );
        assert!(collector.collect().await.is_err());
    }

    #[test]
    fn test_described_names_are_prefixed() {
        let collector = InterfaceCollector::new(
            Arc::new(MemoryDb::new()),
            SampleCache::new(Duration::ZERO),
        );
        let descriptor = collector.descriptor();
        assert!(collector.describe().iter().all(|d| descriptor.covers(&d.name)));
    }
}
