//! Zebra RIB and FIB route counts.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use sonic_exporter_common::{MetricDesc, MetricSample};
use sonic_exporter_framework::{CollectionError, Collector, CollectorDescriptor};

use crate::vty::VtyClient;

#[derive(Debug, Default, Deserialize)]
struct Summary {
    #[serde(default)]
    routes: Vec<RouteType>,
}

#[derive(Debug, Default, Deserialize)]
struct RouteType {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    rib: u64,
    #[serde(default)]
    fib: u64,
}

fn rib() -> MetricDesc {
    MetricDesc::gauge(
        "frr_route_total",
        "Number of routes in the RIB, per route type.",
    )
}

fn fib() -> MetricDesc {
    MetricDesc::gauge(
        "frr_route_fib_total",
        "Number of routes installed in the FIB, per route type.",
    )
}

/// Parse `show <ip|ipv6> route vrf all summary json` into samples.
pub fn parse_route_summary(
    afi: &str,
    output: &str,
) -> Result<Vec<MetricSample>, CollectionError> {
    let vrfs: BTreeMap<String, Summary> = serde_json::from_str(output)
        .map_err(|e| CollectionError::parse(format!("{} route summary: {}", afi, e)))?;

    let (rib, fib) = (rib(), fib());
    let mut samples = Vec::new();
    for (vrf, summary) in &vrfs {
        for route in &summary.routes {
            let labels = [
                ("vrf", vrf.as_str()),
                ("afi", afi),
                ("type", route.kind.as_str()),
            ];
            samples.push(rib.sample_with(labels, route.rib as f64));
            samples.push(fib.sample_with(labels, route.fib as f64));
        }
    }
    Ok(samples)
}

/// Reads IPv4 and IPv6 route summaries from `zebra`.
pub struct RouteCollector {
    vty: VtyClient,
}

impl RouteCollector {
    pub fn new(vty: VtyClient) -> Self {
        Self { vty }
    }
}

#[async_trait]
impl Collector for RouteCollector {
    fn descriptor(&self) -> CollectorDescriptor {
        CollectorDescriptor::prefixed("frr_route")
    }

    fn describe(&self) -> Vec<MetricDesc> {
        vec![rib(), fib()]
    }

    async fn collect(&self) -> Result<Vec<MetricSample>, CollectionError> {
        let mut samples = Vec::new();
        for (afi, command) in [
            ("ipv4", "show ip route vrf all summary json"),
            ("ipv6", "show ipv6 route vrf all summary json"),
        ] {
            let output = self.vty.execute("zebra", command).await?;
            samples.extend(parse_route_summary(afi, &output)?);
        }
        Ok(samples)
    }
}
