//! Discovery sweep against simulated hosts: reachable relays on loopback
//! ports among unreachable candidates.
//!
//! Run with: cargo test --test integration_discovery

use lockbox_core::config::RelayConfig;
use lockbox_core::discovery::scan_candidates;
use lockbox_core::relay::supervisor::RelaySupervisor;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

fn loopback_config() -> RelayConfig {
    RelayConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
    }
}

/// Loopback addresses with nothing listening, standing in for absent hosts.
fn closed_addrs(count: usize) -> Vec<SocketAddr> {
    let listeners: Vec<std::net::TcpListener> = (0..count)
        .map(|_| std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap())
        .collect();
    listeners
        .iter()
        .map(|listener| listener.local_addr().unwrap())
        .collect()
}

#[tokio::test]
async fn test_scan_finds_exactly_the_reachable_hosts() {
    // Three live relays on ephemeral loopback ports.
    let supervisors: Vec<RelaySupervisor> =
        (0..3).map(|_| RelaySupervisor::new()).collect();
    let mut candidates: Vec<SocketAddr> = supervisors
        .iter()
        .map(|supervisor| supervisor.start(&loopback_config()).unwrap())
        .collect();
    let live: Vec<SocketAddr> = candidates.clone();

    // Plus a batch of closed ports standing in for absent hosts.
    candidates.extend(closed_addrs(40));

    let records = scan_candidates(candidates).await;

    // Exactly the reachable hosts, no errors for the absent ones.
    assert_eq!(records.len(), live.len());
    for record in &records {
        assert_eq!(record.ip, "127.0.0.1");
        // All live listeners answer /whoami with this host's name.
        assert!(!record.device_name.is_empty());
        assert_ne!(record.device_name, record.ip);
    }

    for supervisor in &supervisors {
        supervisor.stop().await;
    }
}

#[tokio::test]
async fn test_scan_with_no_reachable_hosts_is_empty() {
    assert!(scan_candidates(closed_addrs(30)).await.is_empty());
}
