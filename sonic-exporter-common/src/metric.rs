//! Metric data model shared by collectors and the exposition encoder.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label set of a sample. Keys are unique and kept sorted.
pub type Labels = BTreeMap<String, String>;

/// Exposition metric type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// Monotonically increasing value.
    Counter,
    /// Value that can go up or down.
    Gauge,
}

impl MetricType {
    /// Name used in `# TYPE` lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Static description of a metric family a collector may emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDesc {
    /// Full metric name.
    pub name: String,
    /// Metric type.
    pub metric_type: MetricType,
    /// Help text for the `# HELP` line.
    pub help: String,
}

impl MetricDesc {
    /// Describe a counter.
    pub fn counter(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metric_type: MetricType::Counter,
            help: help.into(),
        }
    }

    /// Describe a gauge.
    pub fn gauge(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metric_type: MetricType::Gauge,
            help: help.into(),
        }
    }

    /// Build an unlabelled sample of this family.
    pub fn sample(&self, value: f64) -> MetricSample {
        MetricSample {
            name: self.name.clone(),
            metric_type: self.metric_type,
            labels: Labels::new(),
            value,
            help: self.help.clone(),
        }
    }

    /// Build a labelled sample of this family.
    pub fn sample_with<I, K, V>(&self, labels: I, value: f64) -> MetricSample
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.sample(value).with_labels(labels)
    }
}

/// A single metric sample produced by a collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Full metric name.
    pub name: String,
    /// Metric type.
    pub metric_type: MetricType,
    /// Sample labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: Labels,
    /// Sample value.
    pub value: f64,
    /// Help text.
    pub help: String,
}

impl MetricSample {
    /// Create a gauge sample.
    pub fn gauge(name: impl Into<String>, help: impl Into<String>, value: f64) -> Self {
        MetricDesc::gauge(name, help).sample(value)
    }

    /// Create a counter sample.
    pub fn counter(name: impl Into<String>, help: impl Into<String>, value: f64) -> Self {
        MetricDesc::counter(name, help).sample(value)
    }

    /// Add a label, replacing any previous value for the same key.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Add multiple labels.
    pub fn with_labels<I, K, V>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.labels
            .extend(labels.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }
}

/// Check a metric name against `[a-zA-Z_:][a-zA-Z0-9_:]*`.
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// Check a label name against `[a-zA-Z_][a-zA-Z0-9_]*`, rejecting reserved `__` names.
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    !name.starts_with("__") && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Whether `prefix` claims `name`.
///
/// A prefix claims itself and every name continuing it after an underscore,
/// so `sonic_hw` claims `sonic_hw_fan_status` but not `sonic_hwsku`.
pub fn prefix_claims(prefix: &str, name: &str) -> bool {
    match name.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with('_'),
        None => false,
    }
}
