//! FRR daemon liveness.

use async_trait::async_trait;
use futures::future::join_all;
use sonic_exporter_common::{MetricDesc, MetricSample};
use sonic_exporter_framework::{CollectionError, Collector, CollectorDescriptor};
use tracing::debug;

use crate::vty::VtyClient;

fn desc() -> MetricDesc {
    MetricDesc::gauge(
        "frr_service_status_up",
        "Whether the FRR daemon answers on its VTY socket (1 up, 0 down).",
    )
}

/// Checks each configured daemon with `show version`.
///
/// A daemon that does not answer is reported as 0; the collector itself
/// only fails when no daemon is configured.
pub struct StatusCollector {
    vty: VtyClient,
    daemons: Vec<String>,
}

impl StatusCollector {
    pub fn new(vty: VtyClient, daemons: Vec<String>) -> Self {
        Self { vty, daemons }
    }
}

#[async_trait]
impl Collector for StatusCollector {
    fn descriptor(&self) -> CollectorDescriptor {
        CollectorDescriptor::prefixed("frr_service")
    }

    fn describe(&self) -> Vec<MetricDesc> {
        vec![desc()]
    }

    async fn collect(&self) -> Result<Vec<MetricSample>, CollectionError> {
        if self.daemons.is_empty() {
            return Err(CollectionError::unavailable("no daemons configured"));
        }

        let replies = join_all(
            self.daemons
                .iter()
                .map(|daemon| self.vty.execute(daemon, "show version")),
        )
        .await;

        let desc = desc();
        Ok(self
            .daemons
            .iter()
            .zip(replies)
            .map(|(daemon, reply)| {
                let up = match reply {
                    Ok(_) => 1.0,
                    Err(e) => {
                        debug!(daemon = %daemon, error = %e, "FRR daemon not answering");
                        0.0
                    }
                };
                desc.sample_with([("service", daemon.as_str())], up)
            })
            .collect())
    }
}
