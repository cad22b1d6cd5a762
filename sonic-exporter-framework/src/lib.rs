//! sonic-exporter collector framework
//!
//! The aggregation core of the exporter: many independently written
//! collectors, of varying reliability and latency, combined into one coherent
//! scrape response.
//!
//! # Overview
//!
//! This framework provides:
//! - [`Collector`] trait implemented by every data source
//! - [`Registry`] holding collectors, with registration-time conflict detection
//! - [`Scraper`] running one isolated collection pass per scrape request
//! - [`SubExporter`] bundling named sub-collectors behind one registry entry
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sonic_exporter_framework::{Registry, Scraper, SubExporter};
//!
//! let mut registry = Registry::new();
//! registry.register(TemperatureCollector::new(sensors))?;
//! registry.register(SubExporter::new("frr").with("bgp", bgp).with("route", route))?;
//!
//! let scraper = Scraper::new(Arc::new(registry));
//! let body = scraper.render().await;
//! ```

mod collector;
mod composer;
mod error;
mod registry;
mod scrape;

pub use collector::{BoxedCollector, Collector, CollectorDescriptor};
pub use composer::SubExporter;
pub use error::{CollectionError, ConflictError, FrameworkError, Result};
pub use registry::{RegisteredCollector, Registry};
pub use scrape::{CollectorOutcome, Scrape, ScrapeReport, Scraper};

// Re-export commonly used types from sonic-exporter-common
pub use sonic_exporter_common::{Labels, MetricDesc, MetricSample, MetricType};

/// Re-exported so collector crates implement [`Collector`] with the same macro.
pub use async_trait::async_trait;
