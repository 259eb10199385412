// OTP delivery over an SMS gateway
//
// Single-attempt POST to the configured gateway. Delivery counts as
// successful only when the HTTP status is 200/201 AND the response body
// carries a success flag, either at the top level or nested under `data`.

use hyper::{Body, Client, Method, Request, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::debug;

use crate::config::SmsGatewayConfig;

const GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum SmsError {
    #[error("SMS gateway is not configured")]
    NotConfigured,
    #[error("SMS gateway unreachable: {0}")]
    Network(String),
    /// Gateway answered but did not confirm delivery.
    #[error("SMS gateway rejected the message: {0}")]
    Rejected(String),
}

#[derive(Serialize)]
struct SendSmsBody<'a> {
    recipients: [&'a str; 1],
    message: &'a str,
}

/// Deliver an OTP to `phone`. No retry: the first failure surfaces.
pub async fn send_otp(
    config: &SmsGatewayConfig,
    phone: &str,
    otp: &str,
) -> Result<(), SmsError> {
    let uri = format!(
        "{}/gateway/devices/{}/send-sms",
        config.base_url.trim_end_matches('/'),
        config.device_id
    );
    let body = serde_json::to_string(&SendSmsBody {
        recipients: [phone],
        message: otp,
    })
    .expect("two string fields always serialize");

    let request = Request::builder()
        .method(Method::POST)
        .uri(&uri)
        .header("content-type", "application/json")
        .header("x-api-key", &config.api_key)
        .body(Body::from(body))
        .map_err(|err| SmsError::Network(err.to_string()))?;

    let response = timeout(GATEWAY_TIMEOUT, Client::new().request(request))
        .await
        .map_err(|_| SmsError::Network("gateway request timed out".into()))?
        .map_err(|err| SmsError::Network(err.to_string()))?;

    let status = response.status();
    let bytes = timeout(GATEWAY_TIMEOUT, hyper::body::to_bytes(response.into_body()))
        .await
        .map_err(|_| SmsError::Network("gateway response timed out".into()))?
        .map_err(|err| SmsError::Network(err.to_string()))?;
    let value: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    debug!("gateway answered {} for {}", status, phone);

    if status != StatusCode::OK && status != StatusCode::CREATED {
        return Err(SmsError::Rejected(format!("status {}", status)));
    }
    if reports_success(&value) {
        Ok(())
    } else {
        let detail = gateway_message(&value)
            .unwrap_or_else(|| "gateway did not report success".to_string());
        Err(SmsError::Rejected(detail))
    }
}

fn reports_success(value: &Value) -> bool {
    fn flag(value: &Value) -> bool {
        value.get("status").and_then(Value::as_str) == Some("success")
            || value.get("success").and_then(Value::as_bool) == Some(true)
    }
    flag(value) || value.get("data").map(flag).unwrap_or(false)
}

fn gateway_message(value: &Value) -> Option<String> {
    value
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_flag_at_top_level() {
        assert!(reports_success(&json!({"status": "success"})));
        assert!(reports_success(&json!({"success": true})));
    }

    #[test]
    fn test_success_flag_under_data() {
        assert!(reports_success(&json!({"data": {"status": "success"}})));
        assert!(reports_success(&json!({"data": {"success": true}})));
    }

    #[test]
    fn test_missing_or_negative_flag() {
        assert!(!reports_success(&json!({})));
        assert!(!reports_success(&Value::Null));
        assert!(!reports_success(&json!({"status": "failed"})));
        assert!(!reports_success(&json!({"success": false})));
        assert!(!reports_success(&json!({"data": {"status": "failed"}})));
    }

    #[test]
    fn test_gateway_message_extraction() {
        assert_eq!(
            gateway_message(&json!({"message": "quota exceeded"})).as_deref(),
            Some("quota exceeded")
        );
        assert!(gateway_message(&json!({})).is_none());
    }
}
