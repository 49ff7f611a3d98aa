// Interface-to-network resolution by matching network gateways against the
// container's IPv4 routing table (/proc/<pid>/net/route).

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use procfs::net::RouteEntry;
use tracing::{debug, error, warn};

use super::ProcFs;

/// A container interface attached to a named runtime network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkMapping {
    pub iface: String,
    pub network: String,
}

impl NetworkMapping {
    /// Host networking: counters read through this mapping describe the whole host.
    pub fn host() -> Self {
        Self {
            iface: "eth0".into(),
            network: "bridge".into(),
        }
    }
}

/// Parse a gateway given as a bare IPv4 address or in CIDR form into a big-endian u32.
pub fn parse_gateway(gateway: &str) -> Option<u32> {
    let addr = match gateway.split_once('/') {
        Some((ip, prefix)) => {
            let prefix: u8 = prefix.parse().ok()?;
            if prefix > 32 {
                return None;
            }
            ip
        }
        None => gateway,
    };
    addr.parse::<Ipv4Addr>().ok().map(u32::from)
}

/// Match every non-default route against every gateway; sorted by network name.
fn match_routes(routes: &[RouteEntry], gateways: &BTreeMap<&str, u32>) -> Vec<NetworkMapping> {
    let mut networks = Vec::new();
    for route in routes {
        if route.destination.is_unspecified() {
            continue;
        }
        let dest = u32::from(route.destination);
        let mask = u32::from(route.mask);
        for (&network, &gw) in gateways {
            if gw & mask == dest {
                networks.push(NetworkMapping {
                    iface: route.iface.clone(),
                    network: network.to_string(),
                });
            }
        }
    }
    networks.sort_by(|a, b| a.network.cmp(&b.network));
    networks
}

/// Resolve the interfaces of `pid`'s network namespace to runtime network names.
///
/// `gateways` maps network name to gateway as reported by the runtime; `None` means
/// the runtime does not report network settings. Host-networked containers get the
/// single [`NetworkMapping::host`] entry. An unreadable routing table yields no mappings.
pub fn find_container_networks(
    procfs: &ProcFs,
    container_id: &str,
    pid: u32,
    gateways: Option<&BTreeMap<String, String>>,
) -> Vec<NetworkMapping> {
    let Some(gateways) = gateways else {
        debug!(container_id, "no network settings available, defaulting to host network");
        return vec![NetworkMapping::host()];
    };
    if gateways
        .iter()
        .any(|(name, gw)| name == "host" || gw.is_empty())
    {
        debug!(
            container_id,
            "empty network gateway, container is in host network mode, its network metrics are for the whole host"
        );
        return vec![NetworkMapping::host()];
    }

    let mut parsed = BTreeMap::new();
    for (name, gw) in gateways {
        match parse_gateway(gw) {
            Some(ip) => {
                parsed.insert(name.as_str(), ip);
            }
            None => warn!(container_id, gateway = %gw, network = %name, "invalid gateway, skipping"),
        }
    }

    let routes = match procfs.process(pid).and_then(|p| p.route()) {
        Ok(routes) => routes,
        Err(e) => {
            debug!(container_id, pid, error = %e, "unable to read route table");
            return Vec::new();
        }
    };
    if routes.is_empty() {
        error!(container_id, pid, "empty route table, unable to get container networks");
        return Vec::new();
    }
    match_routes(&routes, &parsed)
}
