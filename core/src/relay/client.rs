// Relay client — push an envelope to a peer's mailbox, pull from the local
// one
//
// Both operations are single-attempt: the first connection failure or
// timeout surfaces immediately, and nothing is rolled back.

use hyper::{Body, Client, Method, Request, StatusCode, Uri};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::debug;

use crate::crypto::{self, CryptoError};

/// Overall deadline for one push or pull request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum RelayClientError {
    /// Peer or local relay unreachable, or the request timed out.
    #[error("relay unreachable: {0}")]
    Network(String),
    /// The local mailbox has nothing stored.
    #[error("no message stored in the local mailbox")]
    NotFound,
    /// Envelope decryption failed (wrong OTP, corrupted envelope).
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    /// The relay answered outside the protocol.
    #[error("unexpected relay response: {0}")]
    BadResponse(String),
}

#[derive(Serialize)]
struct ReceiveBody<'a> {
    encrypted_msg: &'a str,
}

/// Encrypt `message` under `otp` and POST it to the peer's mailbox.
/// Returns the peer's HTTP status code; interpreting a non-200 is left to
/// the caller.
pub async fn push_message(
    message: &str,
    otp: &str,
    peer_ip: &str,
    port: u16,
) -> Result<StatusCode, RelayClientError> {
    let envelope = crypto::encrypt_message(message, otp)?;
    let body = serde_json::to_string(&ReceiveBody {
        encrypted_msg: &envelope,
    })
    .expect("a single string field always serializes");

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("http://{}:{}/receive", peer_ip, port))
        .header("content-type", "application/json")
        .body(Body::from(body))
        .map_err(|err| RelayClientError::Network(err.to_string()))?;

    let response = timeout(REQUEST_TIMEOUT, Client::new().request(request))
        .await
        .map_err(|_| RelayClientError::Network("push request timed out".into()))?
        .map_err(|err| RelayClientError::Network(err.to_string()))?;

    debug!("peer {} answered {}", peer_ip, response.status());
    Ok(response.status())
}

/// Pull the pending envelope from the local mailbox and decrypt it.
pub async fn pull_message(otp: &str, port: u16) -> Result<String, RelayClientError> {
    let uri: Uri = format!("http://127.0.0.1:{}/get_message", port)
        .parse()
        .map_err(|_| RelayClientError::Network("invalid local relay address".into()))?;

    let response = timeout(REQUEST_TIMEOUT, Client::new().get(uri))
        .await
        .map_err(|_| RelayClientError::Network("pull request timed out".into()))?
        .map_err(|err| RelayClientError::Network(err.to_string()))?;

    if response.status() == StatusCode::NOT_FOUND {
        return Err(RelayClientError::NotFound);
    }
    if !response.status().is_success() {
        return Err(RelayClientError::BadResponse(format!(
            "status {}",
            response.status()
        )));
    }

    let bytes = timeout(REQUEST_TIMEOUT, hyper::body::to_bytes(response.into_body()))
        .await
        .map_err(|_| RelayClientError::Network("pull response timed out".into()))?
        .map_err(|err| RelayClientError::Network(err.to_string()))?;
    let value: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|err| RelayClientError::BadResponse(err.to_string()))?;

    let envelope = value
        .get("encrypted_msg")
        .and_then(|msg| msg.as_str())
        .filter(|msg| !msg.is_empty())
        .ok_or(RelayClientError::NotFound)?;

    Ok(crypto::decrypt_message(envelope, otp)?)
}
