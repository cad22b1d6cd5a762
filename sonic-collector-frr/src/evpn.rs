//! L2VPN EVPN VNI counts.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use sonic_exporter_common::{MetricDesc, MetricSample};
use sonic_exporter_framework::{CollectionError, Collector, CollectorDescriptor};

use crate::vty::VtyClient;

const COMMAND: &str = "show evpn vni json";

/// (JSON field, metric, help)
const COUNTS: &[(&str, &str, &str)] = &[
    (
        "numMacs",
        "frr_bgp_l2vpn_evpn_mac_count_total",
        "Number of known MAC addresses in the VNI.",
    ),
    (
        "numArpNd",
        "frr_bgp_l2vpn_evpn_arp_nd_count_total",
        "Number of ARP / ND entries in the VNI.",
    ),
    (
        "numRemoteVteps",
        "frr_bgp_l2vpn_evpn_remote_vtep_count_total",
        "Number of remote VTEPs in the VNI.",
    ),
];

fn text(vni: &Value, field: &str) -> String {
    match vni.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Parse `show evpn vni json` into samples. Counts reported as "n/a" (L3
/// VNIs have no remote VTEPs) are skipped.
pub fn parse_vnis(output: &str) -> Result<Vec<MetricSample>, CollectionError> {
    let vnis: BTreeMap<String, Value> = serde_json::from_str(output)
        .map_err(|e| CollectionError::parse(format!("evpn vni: {}", e)))?;

    let mut samples = Vec::new();
    for (key, vni) in &vnis {
        let number = match vni.get("vni") {
            Some(v) if !v.is_null() => text(vni, "vni"),
            _ => key.clone(),
        };
        let labels = [
            ("vni", number),
            ("type", text(vni, "type")),
            ("vxlan_if", text(vni, "vxlanIf")),
            ("tenant_vrf", text(vni, "tenantVrf")),
        ];

        for (field, metric, help) in COUNTS {
            if let Some(count) = vni.get(*field).and_then(Value::as_f64) {
                samples.push(MetricDesc::gauge(*metric, *help).sample_with(labels.clone(), count));
            }
        }
    }
    Ok(samples)
}

/// Reads EVPN VNI counts from `zebra`.
pub struct EvpnCollector {
    vty: VtyClient,
}

impl EvpnCollector {
    pub fn new(vty: VtyClient) -> Self {
        Self { vty }
    }
}

#[async_trait]
impl Collector for EvpnCollector {
    fn descriptor(&self) -> CollectorDescriptor {
        CollectorDescriptor::prefixed("frr_bgp_l2vpn")
    }

    fn describe(&self) -> Vec<MetricDesc> {
        COUNTS
            .iter()
            .map(|(_, metric, help)| MetricDesc::gauge(*metric, *help))
            .collect()
    }

    async fn collect(&self) -> Result<Vec<MetricSample>, CollectionError> {
        let output = self.vty.execute("zebra", COMMAND).await?;
        parse_vnis(&output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vnis() {
        let output = r#"{
          "1000": {
            "vni": 1000,
            "type": "L2",
            "vxlanIf": "vtep-1000",
            "numMacs": 12,
            "numArpNd": 4,
            "numRemoteVteps": 2,
            "tenantVrf": "Vrf01"
          },
          "5000": {
            "vni": 5000,
            "type": "L3",
            "vxlanIf": "vtep-5000",
            "numMacs": 1,
            "numArpNd": 1,
            "numRemoteVteps": "n/a",
            "tenantVrf": "Vrf01"
          }
        }"#;

        let samples = parse_vnis(output).unwrap();
        assert_eq!(samples.len(), 5);

        let macs = &samples[0];
        assert_eq!(macs.name, "frr_bgp_l2vpn_evpn_mac_count_total");
        assert_eq!(macs.value, 12.0);
        assert_eq!(macs.labels["vni"], "1000");
        assert_eq!(macs.labels["type"], "L2");
        assert_eq!(macs.labels["vxlan_if"], "vtep-1000");
        assert_eq!(macs.labels["tenant_vrf"], "Vrf01");

        assert!(
            samples
                .iter()
                .filter(|s| s.labels["vni"] == "5000")
                .all(|s| s.name != "frr_bgp_l2vpn_evpn_remote_vtep_count_total")
        );
    }

    #[test]
    fn test_no_vnis() {
        assert!(parse_vnis("{}").unwrap().is_empty());
        assert!(parse_vnis("").is_err());
    }
}
