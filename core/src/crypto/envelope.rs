// AES-256-GCM envelope sealing/opening
//
// Flow:
// 1. Derive a 32-byte key from the OTP (pass-through: pad/truncate, no KDF)
// 2. Generate a fresh random 16-byte nonce
// 3. Encrypt-detached: ciphertext + 16-byte tag
// 4. Output: base64(nonce ‖ tag ‖ ciphertext)
//
// Opening reverses the framing and verifies the tag before any plaintext is
// released.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::AeadInPlace;
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, KeyInit};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{KEY_SIZE, NONCE_SIZE, TAG_SIZE};

/// AES-256-GCM parameterized with the 16-byte nonce the wire format carries.
/// GCM handles non-96-bit nonces through GHASH, so peers using the same
/// framing interoperate regardless of implementation.
type MailboxCipher = AesGcm<Aes256, U16>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Tag verification failed — wrong OTP, or a corrupted/tampered envelope.
    /// No plaintext is ever returned alongside this error.
    #[error("integrity check failed: wrong OTP or corrupted envelope")]
    Integrity,
    /// The envelope could not be decoded: bad base64, shorter than the
    /// nonce+tag framing, or non-text plaintext.
    #[error("malformed envelope")]
    MalformedEnvelope,
    /// The cipher rejected the encryption request.
    #[error("encryption failure")]
    Encrypt,
}

/// 32 bytes of symmetric key material, wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Key([u8; KEY_SIZE]);

impl Key {
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

/// Seam between the OTP string and the cipher key.
///
/// The shipped `OtpPassthrough` keeps the wire format stable; a stretched
/// derivation can replace it without touching the envelope layout or the
/// AEAD call.
pub trait KeyDerivation {
    fn derive_key(&self, otp: &str) -> Key;
}

/// Pass-through derivation: the UTF-8 bytes of the OTP, truncated to 32
/// bytes or right-padded with ASCII spaces.
///
/// No entropy stretching happens here. The effective strength of an envelope
/// is bounded by the OTP's six characters, not by the 256-bit key size.
pub struct OtpPassthrough;

impl KeyDerivation for OtpPassthrough {
    fn derive_key(&self, otp: &str) -> Key {
        let mut key = [b' '; KEY_SIZE];
        let bytes = otp.as_bytes();
        let len = bytes.len().min(KEY_SIZE);
        key[..len].copy_from_slice(&bytes[..len]);
        Key(key)
    }
}

/// Decoded envelope: the ordered (nonce, tag, ciphertext) triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub nonce: [u8; NONCE_SIZE],
    pub tag: [u8; TAG_SIZE],
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// Wire form: base64(nonce ‖ tag ‖ ciphertext).
    pub fn encode(&self) -> String {
        let mut raw = Vec::with_capacity(NONCE_SIZE + TAG_SIZE + self.ciphertext.len());
        raw.extend_from_slice(&self.nonce);
        raw.extend_from_slice(&self.tag);
        raw.extend_from_slice(&self.ciphertext);
        BASE64.encode(raw)
    }

    /// Rejects anything shorter than the nonce+tag framing.
    pub fn decode(encoded: &str) -> Result<Self, CryptoError> {
        let raw = BASE64
            .decode(encoded)
            .map_err(|_| CryptoError::MalformedEnvelope)?;
        if raw.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::MalformedEnvelope);
        }
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&raw[..NONCE_SIZE]);
        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(&raw[NONCE_SIZE..NONCE_SIZE + TAG_SIZE]);
        Ok(Self {
            nonce,
            tag,
            ciphertext: raw[NONCE_SIZE + TAG_SIZE..].to_vec(),
        })
    }
}

/// Seal plaintext under an OTP with a fresh random nonce.
pub fn seal(plaintext: &[u8], otp: &str) -> Result<Envelope, CryptoError> {
    seal_with(&OtpPassthrough, plaintext, otp)
}

pub fn seal_with<K: KeyDerivation>(
    kdf: &K,
    plaintext: &[u8],
    otp: &str,
) -> Result<Envelope, CryptoError> {
    let key = kdf.derive_key(otp);
    let cipher = MailboxCipher::new(GenericArray::from_slice(key.as_bytes()));

    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let mut ciphertext = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(&nonce), b"", &mut ciphertext)
        .map_err(|_| CryptoError::Encrypt)?;

    let mut tag_bytes = [0u8; TAG_SIZE];
    tag_bytes.copy_from_slice(&tag);

    Ok(Envelope {
        nonce,
        tag: tag_bytes,
        ciphertext,
    })
}

/// Verify the tag and recover the plaintext bytes.
pub fn open(envelope: &Envelope, otp: &str) -> Result<Vec<u8>, CryptoError> {
    open_with(&OtpPassthrough, envelope, otp)
}

pub fn open_with<K: KeyDerivation>(
    kdf: &K,
    envelope: &Envelope,
    otp: &str,
) -> Result<Vec<u8>, CryptoError> {
    let key = kdf.derive_key(otp);
    let cipher = MailboxCipher::new(GenericArray::from_slice(key.as_bytes()));

    let mut plaintext = envelope.ciphertext.clone();
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(&envelope.nonce),
            b"",
            &mut plaintext,
            GenericArray::from_slice(&envelope.tag),
        )
        .map_err(|_| CryptoError::Integrity)?;

    Ok(plaintext)
}

/// Encrypt a text message under an OTP, returning the wire-form envelope.
pub fn encrypt_message(message: &str, otp: &str) -> Result<String, CryptoError> {
    Ok(seal(message.as_bytes(), otp)?.encode())
}

/// Decode, verify, and decrypt a wire-form envelope back into text.
pub fn decrypt_message(encoded: &str, otp: &str) -> Result<String, CryptoError> {
    let envelope = Envelope::decode(encoded)?;
    let plaintext = open(&envelope, otp)?;
    String::from_utf8(plaintext).map_err(|_| CryptoError::MalformedEnvelope)
}
