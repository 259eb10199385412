// LockBox core — OTP-keyed message exchange over an ad-hoc LAN relay
//
// A sender encrypts a short text message under a one-time password, pushes
// the sealed envelope into a peer's single-slot mailbox over HTTP, and the
// receiver pulls and decrypts it with the OTP delivered out of band.

pub mod config;
pub mod crypto;
pub mod discovery;
pub mod otp;
pub mod relay;
pub mod sms;

pub use config::{RelayConfig, SmsGatewayConfig};
pub use crypto::{decrypt_message, encrypt_message, CryptoError, Envelope};
pub use discovery::{scan, PeerRecord};
pub use relay::client::{pull_message, push_message, RelayClientError};
pub use relay::server::Mailbox;
pub use relay::supervisor::{RelaySupervisor, SupervisorError};

/// AES-256 key length in bytes.
pub const KEY_SIZE: usize = 32;
/// GCM nonce length carried on the wire.
pub const NONCE_SIZE: usize = 16;
/// GCM authentication tag length carried on the wire.
pub const TAG_SIZE: usize = 16;
/// Default port the relay mailbox binds and peers are probed on.
pub const DEFAULT_PORT: u16 = 5000;
