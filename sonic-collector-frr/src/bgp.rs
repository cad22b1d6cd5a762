//! BGP unicast peer and RIB summaries.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use sonic_exporter_common::{MetricDesc, MetricSample};
use sonic_exporter_framework::{CollectionError, Collector, CollectorDescriptor};
use tracing::debug;

use crate::vty::VtyClient;

/// Address family of a BGP summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Afi {
    Ipv4,
    Ipv6,
}

impl Afi {
    pub fn as_str(&self) -> &'static str {
        match self {
            Afi::Ipv4 => "ipv4",
            Afi::Ipv6 => "ipv6",
        }
    }

    fn command(&self) -> String {
        format!("show bgp vrf all {} unicast summary json", self.as_str())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    #[serde(default)]
    rib_count: u64,
    #[serde(default)]
    peer_count: u64,
    #[serde(default)]
    peers: BTreeMap<String, Peer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Peer {
    #[serde(default)]
    remote_as: Value,
    #[serde(default)]
    state: String,
    #[serde(default)]
    peer_uptime_msec: u64,
    #[serde(default)]
    msg_rcvd: u64,
    #[serde(default)]
    msg_sent: u64,
    #[serde(default)]
    pfx_rcd: Option<u64>,
    #[serde(default)]
    pfx_snt: Option<u64>,
}

struct Families {
    peer_state: MetricDesc,
    peer_uptime: MetricDesc,
    received: MetricDesc,
    sent: MetricDesc,
    prefixes_received: MetricDesc,
    prefixes_advertised: MetricDesc,
    rib_count: MetricDesc,
    peers_count: MetricDesc,
}

impl Families {
    fn new() -> Self {
        Self {
            peer_state: MetricDesc::gauge(
                "frr_bgp_peer_state",
                "State of the BGP peer (1 = Established, 0 = any other state).",
            ),
            peer_uptime: MetricDesc::gauge(
                "frr_bgp_peer_uptime_seconds",
                "How long the BGP session has been established, in seconds.",
            ),
            received: MetricDesc::counter(
                "frr_bgp_peer_message_received_total",
                "Number of BGP messages received from the peer.",
            ),
            sent: MetricDesc::counter(
                "frr_bgp_peer_message_sent_total",
                "Number of BGP messages sent to the peer.",
            ),
            prefixes_received: MetricDesc::gauge(
                "frr_bgp_peer_prefixes_received_count_total",
                "Number of prefixes received from the peer.",
            ),
            prefixes_advertised: MetricDesc::gauge(
                "frr_bgp_peer_prefixes_advertised_count_total",
                "Number of prefixes advertised to the peer.",
            ),
            rib_count: MetricDesc::gauge(
                "frr_bgp_rib_count_total",
                "Number of routes in the BGP RIB.",
            ),
            peers_count: MetricDesc::gauge(
                "frr_bgp_peers_count_total",
                "Number of configured BGP peers.",
            ),
        }
    }

    fn all(self) -> Vec<MetricDesc> {
        vec![
            self.peer_state,
            self.peer_uptime,
            self.received,
            self.sent,
            self.prefixes_received,
            self.prefixes_advertised,
            self.rib_count,
            self.peers_count,
        ]
    }
}

/// `remoteAs` is numeric, or a string such as "external" for unnumbered peers.
fn as_label(value: &Value) -> String {
    match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => String::new(),
    }
}

/// Parse `show bgp vrf all <afi> unicast summary json` into samples.
pub fn parse_summary(afi: Afi, output: &str) -> Result<Vec<MetricSample>, CollectionError> {
    // vrf -> "<afi>Unicast" -> summary
    let vrfs: BTreeMap<String, BTreeMap<String, Value>> = serde_json::from_str(output)
        .map_err(|e| CollectionError::parse(format!("bgp {} summary: {}", afi.as_str(), e)))?;

    let f = Families::new();
    let mut samples = Vec::new();

    for (vrf, families) in &vrfs {
        for (family, raw) in families {
            if !family.ends_with("Unicast") {
                continue;
            }
            let summary: Summary = match Summary::deserialize(raw) {
                Ok(summary) => summary,
                Err(e) => {
                    debug!(
                        vrf = %vrf,
                        family = %family,
                        error = %e,
                        "Skipping unreadable BGP summary"
                    );
                    continue;
                }
            };

            let vrf_labels = [("vrf", vrf.as_str()), ("afi", afi.as_str())];
            samples.push(f.rib_count.sample_with(vrf_labels, summary.rib_count as f64));
            samples.push(f.peers_count.sample_with(vrf_labels, summary.peer_count as f64));

            for (address, peer) in &summary.peers {
                let peer_as = as_label(&peer.remote_as);
                let labels = [
                    ("vrf", vrf.as_str()),
                    ("afi", afi.as_str()),
                    ("peer", address.as_str()),
                    ("peer_as", peer_as.as_str()),
                ];
                let established = peer.state == "Established";

                samples.push(
                    f.peer_state
                        .sample_with(labels, if established { 1.0 } else { 0.0 }),
                );
                samples.push(
                    f.peer_uptime
                        .sample_with(labels, peer.peer_uptime_msec as f64 / 1000.0),
                );
                samples.push(f.received.sample_with(labels, peer.msg_rcvd as f64));
                samples.push(f.sent.sample_with(labels, peer.msg_sent as f64));
                if let Some(pfx) = peer.pfx_rcd {
                    samples.push(f.prefixes_received.sample_with(labels, pfx as f64));
                }
                if let Some(pfx) = peer.pfx_snt {
                    samples.push(f.prefixes_advertised.sample_with(labels, pfx as f64));
                }
            }
        }
    }

    Ok(samples)
}

/// Reads the unicast BGP summary of one address family from `bgpd`.
pub struct BgpCollector {
    vty: VtyClient,
    afi: Afi,
}

impl BgpCollector {
    pub fn new(vty: VtyClient, afi: Afi) -> Self {
        Self { vty, afi }
    }
}

#[async_trait]
impl Collector for BgpCollector {
    fn descriptor(&self) -> CollectorDescriptor {
        CollectorDescriptor::prefixed("frr_bgp")
    }

    fn describe(&self) -> Vec<MetricDesc> {
        Families::new().all()
    }

    async fn collect(&self) -> Result<Vec<MetricSample>, CollectionError> {
        let output = self.vty.execute("bgpd", &self.afi.command()).await?;
        parse_summary(self.afi, &output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUMMARY: &str = r#"{
      "default": {
        "ipv4Unicast": {
          "routerId": "10.1.0.1",
          "as": 65100,
          "vrfId": 0,
          "vrfName": "default",
          "ribCount": 12,
          "peerCount": 2,
          "peers": {
            "10.0.0.57": {
              "remoteAs": 64600,
              "msgRcvd": 1500,
              "msgSent": 1400,
              "peerUptimeMsec": 3600000,
              "pfxRcd": 7,
              "pfxSnt": 5,
              "state": "Established"
            },
            "10.0.0.59": {
              "remoteAs": 64600,
              "msgRcvd": 3,
              "msgSent": 4,
              "peerUptimeMsec": 0,
              "state": "Active"
            }
          }
        }
      },
      "Vrf_red": {}
    }"#;

    fn find<'a>(samples: &'a [MetricSample], name: &str, peer: &str) -> Option<&'a MetricSample> {
        samples.iter().find(|s| {
            s.name == name && s.labels.get("peer").map(String::as_str) == Some(peer)
        })
    }

    #[test]
    fn test_parse_summary() {
        let samples = parse_summary(Afi::Ipv4, SUMMARY).unwrap();

        let up = find(&samples, "frr_bgp_peer_state", "10.0.0.57").unwrap();
        assert_eq!(up.value, 1.0);
        assert_eq!(up.labels["vrf"], "default");
        assert_eq!(up.labels["afi"], "ipv4");
        assert_eq!(up.labels["peer_as"], "64600");

        assert_eq!(
            find(&samples, "frr_bgp_peer_state", "10.0.0.59").unwrap().value,
            0.0
        );
        assert_eq!(
            find(&samples, "frr_bgp_peer_uptime_seconds", "10.0.0.57")
                .unwrap()
                .value,
            3600.0
        );
        assert_eq!(
            find(&samples, "frr_bgp_peer_prefixes_received_count_total", "10.0.0.57")
                .unwrap()
                .value,
            7.0
        );
        // No prefix counts for a peer that never came up.
        assert!(
            find(&samples, "frr_bgp_peer_prefixes_received_count_total", "10.0.0.59").is_none()
        );

        let rib = samples
            .iter()
            .find(|s| s.name == "frr_bgp_rib_count_total")
            .unwrap();
        assert_eq!(rib.value, 12.0);
        assert_eq!(
            samples
                .iter()
                .filter(|s| s.name == "frr_bgp_peers_count_total")
                .count(),
            1
        );
    }

    #[test]
    fn test_string_remote_as() {
        let output = r#"{"default":{"ipv6Unicast":{"ribCount":1,"peerCount":1,
            "peers":{"Ethernet0":{"remoteAs":"external","state":"Established"}}}}}"#;
        let samples = parse_summary(Afi::Ipv6, output).unwrap();
        let state = find(&samples, "frr_bgp_peer_state", "Ethernet0").unwrap();
        assert_eq!(state.labels["peer_as"], "external");
        assert_eq!(state.labels["afi"], "ipv6");
    }

    #[test]
    fn test_malformed_output() {
        assert!(matches!(
            parse_summary(Afi::Ipv4, "% BGP instance not found"),
            Err(CollectionError::Parse(_))
        ));
    }

    #[test]
    fn test_empty_output() {
        assert!(parse_summary(Afi::Ipv4, "{}").unwrap().is_empty());
    }
}
