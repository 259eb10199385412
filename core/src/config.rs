// Environment-derived configuration
//
// The relay server reads its bind address from LOCKBOX_HOST / LOCKBOX_PORT;
// the SMS gateway client reads its endpoint and credentials from
// LOCKBOX_SMS_URL / LOCKBOX_SMS_DEVICE / LOCKBOX_SMS_API_KEY.

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tracing::warn;

use crate::DEFAULT_PORT;

pub const ENV_HOST: &str = "LOCKBOX_HOST";
pub const ENV_PORT: &str = "LOCKBOX_PORT";
pub const ENV_SMS_URL: &str = "LOCKBOX_SMS_URL";
pub const ENV_SMS_DEVICE: &str = "LOCKBOX_SMS_DEVICE";
pub const ENV_SMS_API_KEY: &str = "LOCKBOX_SMS_API_KEY";

/// Bind address for the relay mailbox server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
        }
    }
}

impl RelayConfig {
    /// Defaults overridden by LOCKBOX_HOST / LOCKBOX_PORT when present.
    /// Unparseable values are ignored with a warning rather than failing
    /// server startup.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = env::var(ENV_HOST) {
            match raw.parse() {
                Ok(host) => config.host = host,
                Err(_) => warn!("ignoring invalid {}: {:?}", ENV_HOST, raw),
            }
        }
        if let Ok(raw) = env::var(ENV_PORT) {
            match raw.parse() {
                Ok(port) => config.port = port,
                Err(_) => warn!("ignoring invalid {}: {:?}", ENV_PORT, raw),
            }
        }
        config
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Endpoint and credentials of the out-of-band OTP delivery gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsGatewayConfig {
    pub base_url: String,
    pub device_id: String,
    pub api_key: String,
}

impl SmsGatewayConfig {
    pub fn new(
        base_url: impl Into<String>,
        device_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            device_id: device_id.into(),
            api_key: api_key.into(),
        }
    }

    /// None unless all three gateway variables are present and non-empty.
    pub fn from_env() -> Option<Self> {
        let non_empty = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());
        Some(Self {
            base_url: non_empty(ENV_SMS_URL)?,
            device_id: non_empty(ENV_SMS_DEVICE)?,
            api_key: non_empty(ENV_SMS_API_KEY)?,
        })
    }
}
