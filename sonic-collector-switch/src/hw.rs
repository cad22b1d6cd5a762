//! Platform hardware: power supplies, fans and temperature sensors.

use std::sync::Arc;

use async_trait::async_trait;
use sonic_exporter_common::{MetricDesc, MetricSample};
use sonic_exporter_framework::{CollectionError, Collector, CollectorDescriptor};

use crate::cache::SampleCache;
use crate::db::{Database, Fields, SonicDb};
use crate::{flag, number};

/// A STATE_DB field exposed as a gauge.
struct Field {
    field: &'static str,
    name: &'static str,
    help: &'static str,
    boolean: bool,
}

/// One STATE_DB table and the label its key suffix becomes.
struct Table {
    prefix: &'static str,
    label: &'static str,
    fields: &'static [Field],
}

const TABLES: &[Table] = &[
    Table {
        prefix: "PSU_INFO",
        label: "slot",
        fields: &[
            Field {
                field: "presence",
                name: "sonic_hw_psu_present",
                help: "Whether the power supply is present.",
                boolean: true,
            },
            Field {
                field: "status",
                name: "sonic_hw_psu_status",
                help: "Whether the power supply is operating normally.",
                boolean: true,
            },
            Field {
                field: "input_voltage",
                name: "sonic_hw_psu_input_voltage_volts",
                help: "Power supply input voltage.",
                boolean: false,
            },
            Field {
                field: "power",
                name: "sonic_hw_psu_output_power_watts",
                help: "Power supply output power.",
                boolean: false,
            },
        ],
    },
    Table {
        prefix: "FAN_INFO",
        label: "fan",
        fields: &[
            Field {
                field: "presence",
                name: "sonic_hw_fan_present",
                help: "Whether the fan is present.",
                boolean: true,
            },
            Field {
                field: "status",
                name: "sonic_hw_fan_status",
                help: "Whether the fan is operating normally.",
                boolean: true,
            },
            Field {
                field: "speed",
                name: "sonic_hw_fan_speed_percent",
                help: "Fan speed as a percentage of its maximum.",
                boolean: false,
            },
        ],
    },
    Table {
        prefix: "TEMPERATURE_INFO",
        label: "sensor",
        fields: &[
            Field {
                field: "temperature",
                name: "sonic_hw_temperature_celsius",
                help: "Sensor temperature.",
                boolean: false,
            },
            Field {
                field: "high_threshold",
                name: "sonic_hw_temperature_high_threshold_celsius",
                help: "Sensor high temperature threshold.",
                boolean: false,
            },
        ],
    },
];

/// Reads PSU, fan and temperature state from STATE_DB.
pub struct HwCollector {
    db: Arc<dyn SonicDb>,
    cache: SampleCache,
}

impl HwCollector {
    pub fn new(db: Arc<dyn SonicDb>, cache: SampleCache) -> Self {
        Self { db, cache }
    }

    async fn read(&self) -> Result<Vec<MetricSample>, CollectionError> {
        let mut samples = Vec::new();
        for table in TABLES {
            let mut keys = self
                .db
                .keys(Database::State, &format!("{}|*", table.prefix))
                .await?;
            keys.sort();

            for key in keys {
                let Some((_, device)) = key.split_once('|') else {
                    continue;
                };
                let fields = self.db.hgetall(Database::State, &key).await?;
                samples.extend(table_samples(table, device, &fields));
            }
        }
        Ok(samples)
    }
}

fn table_samples(table: &Table, device: &str, fields: &Fields) -> Vec<MetricSample> {
    table
        .fields
        .iter()
        .filter_map(|f| {
            let value = if f.boolean {
                fields.get(f.field).and_then(|v| flag(v))
            } else {
                number(fields, f.field)
            }?;
            Some(MetricDesc::gauge(f.name, f.help).sample_with([(table.label, device)], value))
        })
        .collect()
}

#[async_trait]
impl Collector for HwCollector {
    fn descriptor(&self) -> CollectorDescriptor {
        CollectorDescriptor::prefixed("sonic_hw")
    }

    fn describe(&self) -> Vec<MetricDesc> {
        TABLES
            .iter()
            .flat_map(|t| t.fields.iter())
            .map(|f| MetricDesc::gauge(f.name, f.help))
            .collect()
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

    #[tokio::test]
    async fn test_collect_platform() {
        let db = Arc::new(MemoryDb::new());
        db.set(
            Database::State,
            "PSU_INFO|PSU 1",
            [
                ("presence", "true"),
                ("status", "false"),
                ("input_voltage", "229.5"),
                ("power", "N/A"),
            ],
        );
        db.set(
            Database::State,
            "FAN_INFO|fan3",
            [("presence", "true"), ("speed", "42")],
        );
        db.set(
            Database::State,
            "TEMPERATURE_INFO|ASIC",
            [("temperature", "45.0"), ("high_threshold", "100.0")],
        );

        let collector = HwCollector::new(db, SampleCache::new(Duration::ZERO));
        let samples = collector.collect().await.unwrap();
        let summary: Vec<_> = samples
            .iter()
            .map(|s| (s.name.as_str(), s.labels.values().next().cloned(), s.value))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("sonic_hw_psu_present", Some("PSU 1".to_string()), 1.0),
                ("sonic_hw_psu_status", Some("PSU 1".to_string()), 0.0),
                ("sonic_hw_psu_input_voltage_volts", Some("PSU 1".to_string()), 229.5),
                ("sonic_hw_fan_present", Some("fan3".to_string()), 1.0),
                ("sonic_hw_fan_speed_percent", Some("fan3".to_string()), 42.0),
                ("sonic_hw_temperature_celsius", Some("ASIC".to_string()), 45.0),
                (
                    "sonic_hw_temperature_high_threshold_celsius",
                    Some("ASIC".to_string()),
                    100.0
                ),
            ]
        );
    }

    #[tokio::test]
    async fn test_database_failure() {
        let db = Arc::new(MemoryDb::new());
        db.set_unavailable(true);
        let collector = HwCollector::new(db, SampleCache::new(Duration::ZERO));
        assert!(matches!(
            collector.collect().await,
            Err(CollectionError::Source(_))
        ));
    }
}
