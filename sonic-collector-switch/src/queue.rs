//! Egress queue counters.

use std::sync::Arc;

use async_trait::async_trait;
use sonic_exporter_common::{MetricDesc, MetricSample};
use sonic_exporter_framework::{CollectionError, Collector, CollectorDescriptor};
use tracing::debug;

use crate::cache::SampleCache;
use crate::db::{Database, SonicDb};
use crate::number;

const QUEUE_NAME_MAP: &str = "COUNTERS_QUEUE_NAME_MAP";
const QUEUE_TYPE_MAP: &str = "COUNTERS_QUEUE_TYPE_MAP";

const COUNTERS: &[(&str, &str, &str)] = &[
    (
        "SAI_QUEUE_STAT_PACKETS",
        "sonic_queue_transmitted_packets_total",
        "Packets transmitted from the queue.",
    ),
    (
        "SAI_QUEUE_STAT_BYTES",
        "sonic_queue_transmitted_bytes_total",
        "Bytes transmitted from the queue.",
    ),
    (
        "SAI_QUEUE_STAT_DROPPED_PACKETS",
        "sonic_queue_dropped_packets_total",
        "Packets dropped by the queue.",
    ),
    (
        "SAI_QUEUE_STAT_DROPPED_BYTES",
        "sonic_queue_dropped_bytes_total",
        "Bytes dropped by the queue.",
    ),
];

/// Reads per-queue SAI counters from COUNTERS_DB.
pub struct QueueCollector {
    db: Arc<dyn SonicDb>,
    cache: SampleCache,
}

impl QueueCollector {
    pub fn new(db: Arc<dyn SonicDb>, cache: SampleCache) -> Self {
        Self { db, cache }
    }

    async fn read(&self) -> Result<Vec<MetricSample>, CollectionError> {
        let queues = self.db.hgetall(Database::Counters, QUEUE_NAME_MAP).await?;
        if queues.is_empty() {
            return Err(CollectionError::unavailable(format!(
                "{} is empty",
                QUEUE_NAME_MAP
            )));
        }
        let types = self.db.hgetall(Database::Counters, QUEUE_TYPE_MAP).await?;

        let mut samples = Vec::new();
        for (name, oid) in &queues {
            // Entries are keyed "<port>:<index>".
            let Some((device, queue)) = name.rsplit_once(':') else {
                debug!(queue = %name, "Skipping malformed queue name");
                continue;
            };
            let queue_type = types
                .get(oid)
                .map(|t| queue_type(t))
                .unwrap_or("unknown");

            let counters = self
                .db
                .hgetall(Database::Counters, &format!("COUNTERS:{}", oid))
                .await?;

            for (field, metric, help) in COUNTERS {
                if let Some(value) = number(&counters, field) {
                    samples.push(MetricDesc::counter(*metric, *help).sample_with(
                        [("device", device), ("queue", queue), ("queue_type", queue_type)],
                        value,
                    ));
                }
            }
        }
        Ok(samples)
    }
}

fn queue_type(sai: &str) -> &'static str {
    match sai {
        "SAI_QUEUE_TYPE_UNICAST" => "unicast",
        "SAI_QUEUE_TYPE_MULTICAST" => "multicast",
        "SAI_QUEUE_TYPE_ALL" => "all",
        _ => "unknown",
    }
}

#[async_trait]
impl Collector for QueueCollector {
    fn descriptor(&self) -> CollectorDescriptor {
        CollectorDescriptor::prefixed("sonic_queue")
    }

    fn describe(&self) -> Vec<MetricDesc> {
        COUNTERS
            .iter()
            .map(|(_, metric, help)| MetricDesc::counter(*metric, *help))
            .collect()
    }

    async fn collect(&self) -> Result<Vec<MetricSample>, CollectionError> {
        self.cache.get_or_refresh(|| self.read()).await
    }
}
