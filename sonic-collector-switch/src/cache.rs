//! Short-lived cache of a collector's last successful read.
//!
//! SONiC refreshes its counters every few seconds, so scrapes arriving in
//! quick succession reuse the previous read instead of walking the
//! databases again.

use std::future::Future;
use std::time::Duration;

use sonic_exporter_common::MetricSample;
use sonic_exporter_framework::CollectionError;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Samples from the last successful read, valid for `ttl`.
pub struct SampleCache {
    ttl: Duration,
    slot: Mutex<Option<(Instant, Vec<MetricSample>)>>,
}

impl SampleCache {
    /// A zero `ttl` disables caching.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Return the cached samples, or run `refresh` and cache its result.
    ///
    /// Concurrent callers wait for a single refresh. Failures are not cached.
    pub async fn get_or_refresh<F, Fut>(
        &self,
        refresh: F,
    ) -> Result<Vec<MetricSample>, CollectionError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<MetricSample>, CollectionError>>,
    {
        if self.ttl.is_zero() {
            return refresh().await;
        }

        let mut slot = self.slot.lock().await;
        if let Some((fetched, samples)) = slot.as_ref() {
            if fetched.elapsed() < self.ttl {
                return Ok(samples.clone());
            }
        }

        let samples = refresh().await?;
        *slot = Some((Instant::now(), samples.clone()));
        Ok(samples)
    }
}
