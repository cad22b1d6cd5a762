//! Memory and swap usage.

use async_trait::async_trait;
use parking_lot::Mutex;
use sonic_exporter_common::{MetricDesc, MetricSample};
use sonic_exporter_framework::{CollectionError, Collector, CollectorDescriptor};
use sysinfo::System;

/// Memory figures in bytes, named after their `/proc/meminfo` fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Memory {
    pub total: u64,
    pub free: u64,
    pub available: u64,
    pub swap_total: u64,
    pub swap_free: u64,
}

impl Memory {
    fn fields(&self) -> [(&'static str, u64); 5] {
        [
            ("MemTotal", self.total),
            ("MemFree", self.free),
            ("MemAvailable", self.available),
            ("SwapTotal", self.swap_total),
            ("SwapFree", self.swap_free),
        ]
    }

    /// One `node_memory_<Field>_bytes` gauge per field.
    pub fn samples(&self) -> Vec<MetricSample> {
        self.fields()
            .into_iter()
            .map(|(field, value)| desc(field).sample(value as f64))
            .collect()
    }
}

fn desc(field: &str) -> MetricDesc {
    MetricDesc::gauge(
        format!("node_memory_{}_bytes", field),
        format!("Memory information field {}_bytes.", field),
    )
}

/// Reads memory usage through `sysinfo`.
pub struct MeminfoCollector {
    system: Mutex<System>,
}

impl MeminfoCollector {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    fn read(&self) -> Memory {
        let mut system = self.system.lock();
        system.refresh_memory();
        Memory {
            total: system.total_memory(),
            free: system.free_memory(),
            available: system.available_memory(),
            swap_total: system.total_swap(),
            swap_free: system.free_swap(),
        }
    }
}

impl Default for MeminfoCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Collector for MeminfoCollector {
    fn descriptor(&self) -> CollectorDescriptor {
        CollectorDescriptor::prefixed("node_memory")
    }

    fn describe(&self) -> Vec<MetricDesc> {
        Memory::default()
            .fields()
            .into_iter()
            .map(|(field, _)| desc(field))
            .collect()
    }

    async fn collect(&self) -> Result<Vec<MetricSample>, CollectionError> {
        let memory = self.read();
        if memory.total == 0 {
            return Err(CollectionError::unavailable("total memory reported as zero"));
        }
        Ok(memory.samples())
    }
}
