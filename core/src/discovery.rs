// Subnet sweep for reachable relay mailboxes
//
// Probes every host of the local /24 on the relay port, identifies the ones
// that answer via GET /whoami, and reports them as PeerRecords. Probe
// failures are indistinguishable from absent hosts and never surface.

use futures::stream::{self, StreamExt};
use hyper::{body, Client, Uri};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Upper bound on in-flight probes.
const PROBE_POOL: usize = 50;
/// TCP connect deadline per candidate host.
const CONNECT_TIMEOUT: Duration = Duration::from_millis(300);
/// Deadline for the /whoami identification request.
const WHOAMI_TIMEOUT: Duration = Duration::from_millis(500);

/// A host that accepted the probe. `device_name` falls back to the bare IP
/// when identification fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRecord {
    pub ip: String,
    pub device_name: String,
}

/// Local outbound IPv4 address, read from the source endpoint of a
/// connectionless socket aimed at a non-routable destination. Falls back to
/// loopback when the lookup fails.
pub fn local_ipv4() -> Ipv4Addr {
    fn outbound() -> Option<Ipv4Addr> {
        let socket = UdpSocket::bind(("0.0.0.0", 0)).ok()?;
        socket.connect(("10.255.255.255", 1)).ok()?;
        match socket.local_addr().ok()? {
            SocketAddr::V4(addr) => Some(*addr.ip()),
            SocketAddr::V6(_) => None,
        }
    }
    outbound().unwrap_or(Ipv4Addr::LOCALHOST)
}

/// Sweep the local /24 for relays listening on `port`.
///
/// Blocks until all 254 probes have resolved or timed out; there is no early
/// return and no cancellation once started.
pub async fn scan(port: u16) -> Vec<PeerRecord> {
    let [a, b, c, _] = local_ipv4().octets();
    let candidates = (1..=254u8)
        .map(|d| SocketAddr::from((Ipv4Addr::new(a, b, c, d), port)))
        .collect();
    scan_candidates(candidates).await
}

/// Probe an explicit candidate list with a bounded worker pool. `scan`
/// builds the /24 sweep on top of this; tests aim it at loopback listeners.
///
/// Each probe's result comes back through its own future — there is no
/// shared results collection. Records are sorted by address so output is
/// deterministic regardless of completion order.
pub async fn scan_candidates(candidates: Vec<SocketAddr>) -> Vec<PeerRecord> {
    let mut records: Vec<PeerRecord> = stream::iter(candidates)
        .map(probe)
        .buffer_unordered(PROBE_POOL)
        .filter_map(|record| async move { record })
        .collect()
        .await;
    records.sort_by_key(|record| {
        record
            .ip
            .parse::<Ipv4Addr>()
            .map(|ip| ip.octets())
            .unwrap_or([u8::MAX; 4])
    });
    records
}

async fn probe(addr: SocketAddr) -> Option<PeerRecord> {
    match timeout(CONNECT_TIMEOUT, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => {}
        // Refused, unreachable, or timed out: same as no host at all.
        _ => return None,
    }
    debug!("host {} accepted the probe", addr);

    let ip = addr.ip().to_string();
    let device_name = whoami(addr).await.unwrap_or_else(|| ip.clone());
    Some(PeerRecord { ip, device_name })
}

/// Application-level identification; None on any timeout or malformed
/// response, leaving the caller to fall back to the bare IP.
async fn whoami(addr: SocketAddr) -> Option<String> {
    let uri: Uri = format!("http://{}/whoami", addr).parse().ok()?;
    let response = timeout(WHOAMI_TIMEOUT, Client::new().get(uri))
        .await
        .ok()?
        .ok()?;
    if !response.status().is_success() {
        return None;
    }
    let bytes = timeout(WHOAMI_TIMEOUT, body::to_bytes(response.into_body()))
        .await
        .ok()?
        .ok()?;
    let value: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    value
        .get("device_name")
        .and_then(|name| name.as_str())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_ipv4_is_v4() {
        // Whatever interface the host has, the fallback keeps this total.
        let ip = local_ipv4();
        assert!(!ip.is_multicast());
    }

    #[tokio::test]
    async fn test_scan_candidates_empty_list() {
        assert!(scan_candidates(Vec::new()).await.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_candidates_are_silent() {
        // Bind-then-drop yields loopback ports with nothing listening; the
        // sweep must complete without surfacing a single error.
        let candidates: Vec<SocketAddr> = {
            let listeners: Vec<std::net::TcpListener> = (0..20)
                .map(|_| std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap())
                .collect();
            listeners
                .iter()
                .map(|listener| listener.local_addr().unwrap())
                .collect()
        };
        assert!(scan_candidates(candidates).await.is_empty());
    }
}
