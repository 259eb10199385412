// Envelope encryption keyed by a short one-time password
//
// Wire format: base64(nonce[16] ‖ tag[16] ‖ ciphertext), no separators, no
// version byte. The OTP string is the entire key material — see
// `OtpPassthrough` for the (deliberately unstretched) derivation.

mod envelope;

pub use envelope::{
    decrypt_message, encrypt_message, open, seal, CryptoError, Envelope, Key, KeyDerivation,
    OtpPassthrough,
};
