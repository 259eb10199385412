//! End-to-end relay exchange: supervisor-managed server, client push/pull,
//! and the raw HTTP surface of the mailbox.
//!
//! Run with: cargo test --test integration_relay

use hyper::{Body, Client, Method, Request, StatusCode};
use lockbox_core::config::RelayConfig;
use lockbox_core::relay::client::{pull_message, push_message, RelayClientError};
use lockbox_core::relay::supervisor::RelaySupervisor;
use lockbox_core::CryptoError;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

fn loopback_config() -> RelayConfig {
    RelayConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
    }
}

fn start_relay(supervisor: &RelaySupervisor) -> SocketAddr {
    supervisor
        .start(&loopback_config())
        .expect("relay binds an ephemeral loopback port")
}

async fn raw_receive(addr: SocketAddr, body: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("http://{}/receive", addr))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = Client::new().request(request).await.unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn test_push_pull_roundtrip() {
    let supervisor = RelaySupervisor::new();
    let addr = start_relay(&supervisor);

    let status = push_message("hello", "482913", "127.0.0.1", addr.port())
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    let plaintext = pull_message("482913", addr.port()).await.unwrap();
    assert_eq!(plaintext, "hello");

    // Reads never drain the slot.
    let again = pull_message("482913", addr.port()).await.unwrap();
    assert_eq!(again, "hello");

    supervisor.stop().await;
}

#[tokio::test]
async fn test_pull_with_wrong_otp_fails_integrity() {
    let supervisor = RelaySupervisor::new();
    let addr = start_relay(&supervisor);

    push_message("hello", "482913", "127.0.0.1", addr.port())
        .await
        .unwrap();

    let result = pull_message("482914", addr.port()).await;
    assert!(matches!(
        result,
        Err(RelayClientError::Crypto(CryptoError::Integrity))
    ));

    supervisor.stop().await;
}

#[tokio::test]
async fn test_pull_from_empty_mailbox_is_not_found() {
    let supervisor = RelaySupervisor::new();
    let addr = start_relay(&supervisor);

    let result = pull_message("482913", addr.port()).await;
    assert!(matches!(result, Err(RelayClientError::NotFound)));

    supervisor.stop().await;
}

#[tokio::test]
async fn test_second_push_overwrites_first() {
    let supervisor = RelaySupervisor::new();
    let addr = start_relay(&supervisor);

    push_message("first message", "111111", "127.0.0.1", addr.port())
        .await
        .unwrap();
    push_message("second message", "222222", "127.0.0.1", addr.port())
        .await
        .unwrap();

    // Only the second envelope survives; the first OTP no longer matches.
    let plaintext = pull_message("222222", addr.port()).await.unwrap();
    assert_eq!(plaintext, "second message");
    assert!(matches!(
        pull_message("111111", addr.port()).await,
        Err(RelayClientError::Crypto(CryptoError::Integrity))
    ));

    supervisor.stop().await;
}

#[tokio::test]
async fn test_receive_missing_field_leaves_mailbox_unchanged() {
    let supervisor = RelaySupervisor::new();
    let addr = start_relay(&supervisor);

    let (status, body) = raw_receive(addr, r#"{"encrypted_msg": ""}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["error"], "Missing encrypted_msg");

    // The rejected request stored nothing.
    assert!(matches!(
        pull_message("482913", addr.port()).await,
        Err(RelayClientError::NotFound)
    ));

    let (status, _) = raw_receive(addr, r#"{"something_else": "x"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    supervisor.stop().await;
}

#[tokio::test]
async fn test_push_status_propagates_to_caller() {
    // push_message reports the peer's status code without interpreting it,
    // so a peer that rejects the envelope shows up as the raw 400.
    let supervisor = RelaySupervisor::new();
    let addr = start_relay(&supervisor);

    let (status, _) = raw_receive(addr, "{}").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let status = push_message("hello", "482913", "127.0.0.1", addr.port())
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    supervisor.stop().await;
}

#[tokio::test]
async fn test_server_stops_serving_after_shutdown() {
    let supervisor = RelaySupervisor::new();
    let addr = start_relay(&supervisor);

    push_message("hello", "482913", "127.0.0.1", addr.port())
        .await
        .unwrap();
    supervisor.stop().await;

    let result = push_message("hello", "482913", "127.0.0.1", addr.port()).await;
    assert!(matches!(result, Err(RelayClientError::Network(_))));
}
