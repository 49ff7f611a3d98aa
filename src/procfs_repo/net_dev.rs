// Per-container interface counters from /proc/<pid>/net/dev

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use procfs::net::DeviceStatus;
use tracing::debug;

use super::{NetworkMapping, ProcFs};
use crate::models::NetworkStat;

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("invalid format for {}", .0.display())]
    InvalidFormat(PathBuf),
}

/// Sum counters of every interface in `ifaces`.
fn sum_interfaces(devices: &HashMap<String, DeviceStatus>, ifaces: &HashSet<&str>) -> NetworkStat {
    let mut stat = NetworkStat::default();
    for (name, dev) in devices {
        if !ifaces.contains(name.as_str()) {
            continue;
        }
        stat += NetworkStat {
            bytes_rcvd: dev.recv_bytes,
            packets_rcvd: dev.recv_packets,
            bytes_sent: dev.sent_bytes,
            packets_sent: dev.sent_packets,
        };
    }
    stat
}

/// Read counters for the interfaces in `networks` from `pid`'s network namespace.
///
/// A missing, unreadable or unparsable table means the namespace is gone and
/// yields zeroes. A table without any interface row (truncated before or right
/// after the two header lines) is an error.
pub fn collect_network_stats(
    procfs: &ProcFs,
    container_id: &str,
    pid: u32,
    networks: &[NetworkMapping],
) -> Result<NetworkStat, NetworkError> {
    let devices = match procfs.process(pid).and_then(|p| p.dev_status()) {
        Ok(devices) => devices,
        Err(e) => {
            debug!(container_id, pid, error = %e, "unable to read interface counters");
            return Ok(NetworkStat::default());
        }
    };
    // every namespace has at least a loopback row
    if devices.is_empty() {
        return Err(NetworkError::InvalidFormat(
            procfs.pid_path(pid).join("net").join("dev"),
        ));
    }

    let ifaces: HashSet<&str> = networks.iter().map(|n| n.iface.as_str()).collect();
    Ok(sum_interfaces(&devices, &ifaces))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NET_DEV: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
  eth0:    1296      16    0    0    0     0          0         0      800       8    0    0    0     0       0          0
  eth1:     100       2    0    0    0     0          0         0       50       1    0    0    0     0       0          0
    lo:    9999      99    0    0    0     0          0         0     9999      99    0    0    0     0       0          0
";

    fn write_net_dev(content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let net = dir.path().join("12").join("net");
        std::fs::create_dir_all(&net).unwrap();
        std::fs::write(net.join("dev"), content).unwrap();
        dir
    }

    fn mapping(iface: &str, network: &str) -> NetworkMapping {
        NetworkMapping {
            iface: iface.into(),
            network: network.into(),
        }
    }

    #[test]
    fn sums_mapped_interfaces_only() {
        let dir = write_net_dev(NET_DEV);
        let procfs = ProcFs::new(dir.path());
        let stat = collect_network_stats(
            &procfs,
            "c1",
            12,
            &[mapping("eth0", "bridge"), mapping("eth1", "backend"), mapping("eth9", "x")],
        )
        .unwrap();
        assert_eq!(
            stat,
            NetworkStat {
                bytes_rcvd: 1396,
                packets_rcvd: 18,
                bytes_sent: 850,
                packets_sent: 9,
            }
        );
    }

    #[test]
    fn interface_mapped_to_two_networks_counts_once() {
        let dir = write_net_dev(NET_DEV);
        let procfs = ProcFs::new(dir.path());
        let stat = collect_network_stats(
            &procfs,
            "c1",
            12,
            &[mapping("eth0", "a"), mapping("eth0", "b")],
        )
        .unwrap();
        assert_eq!(stat.bytes_rcvd, 1296);
    }

    #[test]
    fn missing_process_or_file_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        let procfs = ProcFs::new(dir.path());
        let stat = collect_network_stats(&procfs, "c1", 12, &[mapping("eth0", "bridge")]).unwrap();
        assert_eq!(stat, NetworkStat::default());

        std::fs::create_dir_all(dir.path().join("12")).unwrap();
        let stat = collect_network_stats(&procfs, "c1", 12, &[mapping("eth0", "bridge")]).unwrap();
        assert_eq!(stat, NetworkStat::default());
    }

    #[test]
    fn truncated_file_is_an_error() {
        let dir = write_net_dev("Inter-|   Receive\n");
        let procfs = ProcFs::new(dir.path());
        let err = collect_network_stats(&procfs, "c1", 12, &[]).unwrap_err();
        assert!(err.to_string().contains("invalid format"));
    }
}
