//! Scrape orchestration: one collection pass over every registered collector.

use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::future::join_all;
use sonic_exporter_common::{
    Labels, MetricDesc, MetricSample, MetricType, encode_text, is_valid_label_name,
    is_valid_metric_name,
};
use tracing::{debug, warn};

use crate::collector::Collector;
use crate::error::{CollectionError, panic_message};
use crate::registry::{RegisteredCollector, Registry};

/// Outcome of one collector within a scrape.
#[derive(Debug, Clone)]
pub struct CollectorOutcome {
    /// Collector identity.
    pub identity: String,
    /// Whether `collect()` succeeded.
    pub success: bool,
    /// Samples kept in the response (excluding the up signal).
    pub samples: usize,
    /// Samples dropped for violating the name invariants.
    pub dropped: usize,
    /// Time spent in `collect()`.
    pub duration: Duration,
    /// Failure reason, if any.
    pub error: Option<String>,
}

/// Summary of a scrape.
#[derive(Debug, Clone, Default)]
pub struct ScrapeReport {
    /// Per-collector outcomes in registration order.
    pub outcomes: Vec<CollectorOutcome>,
    /// Wall-clock duration of the whole scrape.
    pub duration: Duration,
}

impl ScrapeReport {
    /// Number of collectors that failed.
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.success).count()
    }
}

/// Result of a scrape: the samples to expose plus a report.
#[derive(Debug, Clone, Default)]
pub struct Scrape {
    /// Samples in registration order, then each collector's emission order.
    pub samples: Vec<MetricSample>,
    /// What happened during the scrape.
    pub report: ScrapeReport,
}

impl Scrape {
    /// Serialize the samples into the text exposition format.
    pub fn encode(&self) -> String {
        encode_text(&self.samples)
    }
}

/// Runs collection passes against a shared, read-only registry.
///
/// Each call to [`Scraper::scrape`] is an independent pass with its own
/// state, so concurrent scrapes never observe each other.
#[derive(Debug, Clone)]
pub struct Scraper {
    registry: Arc<Registry>,
    collector_timeout: Option<Duration>,
}

impl Scraper {
    /// Create a scraper over a frozen registry.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            collector_timeout: None,
        }
    }

    /// Bound every `collect()` call. `None` leaves timeouts to the collectors.
    pub fn with_collector_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.collector_timeout = timeout;
        self
    }

    /// The registry being scraped.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Invoke every collector once and assemble the response samples.
    ///
    /// Collectors run concurrently. A failing collector contributes only its
    /// `<identity>_up 0` sample; it never aborts the others.
    pub async fn scrape(&self) -> Scrape {
        let started = Instant::now();

        let results = join_all(
            self.registry
                .all()
                .map(|entry| invoke(entry.collector(), self.collector_timeout)),
        )
        .await;

        let mut assembler = Assembler::default();
        let mut report = ScrapeReport::default();

        for (entry, (result, duration)) in self.registry.all().zip(results) {
            report.outcomes.push(assembler.add(entry, result, duration));
        }

        report.duration = started.elapsed();
        debug!(
            collectors = report.outcomes.len(),
            failed = report.failed(),
            samples = assembler.samples.len(),
            duration_ms = report.duration.as_millis() as u64,
            "Scrape complete"
        );

        Scrape {
            samples: assembler.samples,
            report,
        }
    }

    /// Scrape and serialize in one step.
    pub async fn render(&self) -> String {
        self.scrape().await.encode()
    }
}

/// Call `collect()` with panic containment and an optional timeout.
pub(crate) async fn invoke(
    collector: &dyn Collector,
    timeout: Option<Duration>,
) -> (Result<Vec<MetricSample>, CollectionError>, Duration) {
    let started = Instant::now();
    let guarded = AssertUnwindSafe(collector.collect()).catch_unwind();

    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, guarded).await {
            Ok(outcome) => outcome,
            Err(_) => Ok(Err(CollectionError::Timeout(limit))),
        },
        None => guarded.await,
    };

    let result =
        result.unwrap_or_else(|payload| Err(CollectionError::Panicked(panic_message(payload))));
    (result, started.elapsed())
}

/// Accumulates one scrape's samples while enforcing the name invariants.
#[derive(Default)]
struct Assembler {
    samples: Vec<MetricSample>,
    series: HashSet<(String, Labels)>,
    types: HashMap<String, MetricType>,
}

impl Assembler {
    fn add(
        &mut self,
        entry: &RegisteredCollector,
        result: Result<Vec<MetricSample>, CollectionError>,
        duration: Duration,
    ) -> CollectorOutcome {
        let identity = entry.identity();
        let up = MetricDesc::gauge(
            entry.up_metric(),
            format!("Whether the {} collector succeeded.", identity),
        );

        let (success, samples, dropped, error) = match result {
            Ok(samples) => {
                let mut kept = 0;
                let mut dropped = 0;
                for sample in samples {
                    if self.accept(entry, &sample) {
                        self.samples.push(sample);
                        kept += 1;
                    } else {
                        dropped += 1;
                    }
                }
                (true, kept, dropped, None)
            }
            Err(e) => {
                warn!(
                    collector = %identity,
                    error = %e,
                    duration_ms = duration.as_millis() as u64,
                    "Collector failed"
                );
                (false, 0, 0, Some(e.to_string()))
            }
        };

        self.samples.push(up.sample(if success { 1.0 } else { 0.0 }));

        CollectorOutcome {
            identity: identity.to_string(),
            success,
            samples,
            dropped,
            duration,
            error,
        }
    }

    fn accept(&mut self, entry: &RegisteredCollector, sample: &MetricSample) -> bool {
        let identity = entry.identity();

        if !is_valid_metric_name(&sample.name) {
            warn!(
                collector = %identity,
                metric = %sample.name,
                "Dropping sample with invalid metric name"
            );
            return false;
        }
        if let Some(label) = sample.labels.keys().find(|k| !is_valid_label_name(k)) {
            warn!(
                collector = %identity,
                metric = %sample.name,
                label = %label,
                "Dropping sample with invalid label name"
            );
            return false;
        }

        if !entry.may_emit(&sample.name) {
            warn!(
                collector = %identity,
                metric = %sample.name,
                "Dropping sample outside the collector's declared names"
            );
            return false;
        }

        match self.types.get(&sample.name) {
            Some(existing) if *existing != sample.metric_type => {
                warn!(
                    collector = %identity,
                    metric = %sample.name,
                    expected = %existing,
                    actual = %sample.metric_type,
                    "Dropping sample with inconsistent type"
                );
                return false;
            }
            Some(_) => {}
            None => {
                self.types.insert(sample.name.clone(), sample.metric_type);
            }
        }

        if !self
            .series
            .insert((sample.name.clone(), sample.labels.clone()))
        {
            warn!(
                collector = %identity,
                metric = %sample.name,
                labels = ?sample.labels,
                "Dropping duplicate series"
            );
            return false;
        }

        true
    }
}
