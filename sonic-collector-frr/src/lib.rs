//! FRR routing daemon collectors.
//!
//! Talks to the FRR daemons over their VTY unix sockets and exposes BGP,
//! EVPN, route and daemon status metrics under the `frr` sub-exporter:
//!
//! ```text
//! frr_bgp_peer_state{afi="ipv4",peer="10.0.0.57",peer_as="64600",vrf="default"}
//! frr_bgp_l2vpn_evpn_mac_count_total{tenant_vrf="Vrf01",type="L2",vni="1000",vxlan_if="vtep-1000"}
//! frr_route_total{afi="ipv4",type="ebgp",vrf="default"}
//! frr_service_status_up{service="bgpd"}
//! frr_collector_up{collector="bgp"}
//! ```

pub mod bgp;
pub mod config;
pub mod error;
pub mod evpn;
pub mod route;
pub mod status;
pub mod vty;

use std::time::Duration;

use sonic_exporter_framework::{BoxedCollector, SubExporter};
use tracing::info;

pub use bgp::{Afi, BgpCollector};
pub use config::FrrConfig;
pub use error::{FrrError, VtyError};
pub use evpn::EvpnCollector;
pub use route::RouteCollector;
pub use status::StatusCollector;
pub use vty::VtyClient;

/// Identity of the FRR sub-exporter.
pub const IDENTITY: &str = "frr";

/// Build the `frr` sub-exporter with the configured collectors.
pub fn build(config: &FrrConfig) -> Result<SubExporter, FrrError> {
    let vty = VtyClient::new(&config.socket_dir, Duration::from_secs(config.timeout_secs));
    let mut exporter = SubExporter::new(IDENTITY);

    for name in &config.collectors {
        let collector: BoxedCollector = match name.as_str() {
            "bgp" => Box::new(BgpCollector::new(vty.clone(), Afi::Ipv4)),
            "bgp6" => Box::new(BgpCollector::new(vty.clone(), Afi::Ipv6)),
            "bgp_l2vpn" => Box::new(EvpnCollector::new(vty.clone())),
            "status" => Box::new(StatusCollector::new(
                vty.clone(),
                config.status_daemons.clone(),
            )),
            "route" => Box::new(RouteCollector::new(vty.clone())),
            other => return Err(FrrError::UnknownCollector(other.to_string())),
        };
        exporter.insert_boxed(name.clone(), collector);
    }

    info!(
        collectors = ?exporter.keys().collect::<Vec<_>>(),
        socket_dir = %config.socket_dir.display(),
        "FRR collectors ready"
    );
    Ok(exporter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonic_exporter_framework::Collector;

    #[test]
    fn test_build_all() {
        let exporter = build(&FrrConfig::default()).unwrap();
        assert_eq!(
            exporter.keys().collect::<Vec<_>>(),
            vec!["bgp", "bgp6", "bgp_l2vpn", "route", "status"]
        );
        let descriptor = exporter.descriptor();
        assert!(exporter.describe().iter().all(|d| descriptor.covers(&d.name)));
    }

    #[test]
    fn test_build_unknown() {
        let config = FrrConfig {
            collectors: vec!["ospf".to_string()],
            ..Default::default()
        };
        assert!(matches!(build(&config), Err(FrrError::UnknownCollector(_))));
    }
}
