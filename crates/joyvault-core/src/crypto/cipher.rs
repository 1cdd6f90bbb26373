//! AES-256-GCM encryption of secret payloads.
//!
//! Every call to [`encrypt`] draws a fresh 96-bit nonce from the OS-seeded
//! thread RNG. Nonces are never derived from content or from a counter, so two
//! sessions sharing a master key cannot collide except by random chance.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit},
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use zeroize::{Zeroize, Zeroizing};

use super::CryptoError;
use super::keys::MasterKey;

pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
/// On-chain cap for the encrypted payload, applied to plaintext here and to
/// ciphertext by the vault client.
pub const MAX_SECRET_SIZE: usize = 1024;

/// Ciphertext (with appended GCM tag) and the nonce it was sealed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedSecret {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_LEN],
}

/// Encrypt `plaintext` under `master_key` with a freshly generated nonce.
#[instrument(level = "trace", skip_all, fields(len = plaintext.len()))]
pub fn encrypt(master_key: &MasterKey, plaintext: &[u8]) -> Result<SealedSecret, CryptoError> {
    if plaintext.is_empty() {
        return Err(CryptoError::EmptyPlaintext);
    }
    if plaintext.len() > MAX_SECRET_SIZE {
        return Err(CryptoError::PlaintextTooLarge {
            size: plaintext.len(),
            max: MAX_SECRET_SIZE,
        });
    }

    let mut nonce = [0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut nonce);

    let ciphertext = master_key.with_key(|aes_key| {
        let key: &Key<Aes256Gcm> = aes_key.into();
        let cipher = Aes256Gcm::new(key);
        cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
    })?;

    Ok(SealedSecret { ciphertext, nonce })
}

/// Decrypt and authenticate `ciphertext`.
///
/// Any failure (wrong key, modified ciphertext or nonce, truncation) yields
/// [`CryptoError::DecryptionFailed`] and no plaintext.
#[instrument(level = "trace", skip_all, fields(len = ciphertext.len()))]
pub fn decrypt(
    master_key: &MasterKey,
    ciphertext: &[u8],
    nonce: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if nonce.len() != NONCE_LEN {
        return Err(CryptoError::InvalidNonceLength {
            expected: NONCE_LEN,
            actual: nonce.len(),
        });
    }
    if ciphertext.len() < TAG_LEN {
        return Err(CryptoError::DecryptionFailed);
    }

    master_key.with_key(|aes_key| {
        let key: &Key<Aes256Gcm> = aes_key.into();
        let cipher = Aes256Gcm::new(key);
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map(Zeroizing::new)
            .map_err(|_| {
                warn!("Secret authentication failed - wrong key or tampered ciphertext");
                CryptoError::DecryptionFailed
            })
    })
}

/// The plaintext record stored in each secret: `{"title": .., "content": ..}`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretPayload {
    pub title: String,
    pub content: String,
}

impl SecretPayload {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    /// Compact JSON encoding, the exact bytes that get encrypted.
    pub fn to_bytes(&self) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        serde_json::to_vec(self)
            .map(Zeroizing::new)
            .map_err(|e| CryptoError::MalformedPayload(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        serde_json::from_slice(bytes).map_err(|e| CryptoError::MalformedPayload(e.to_string()))
    }
}

impl std::fmt::Debug for SecretPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretPayload")
            .field("title", &self.title)
            .field("content", &"[REDACTED]")
            .finish()
    }
}

impl Drop for SecretPayload {
    fn drop(&mut self) {
        self.title.zeroize();
        self.content.zeroize();
    }
}

/// Encode and encrypt a `{title, content}` record.
pub fn seal_payload(
    master_key: &MasterKey,
    payload: &SecretPayload,
) -> Result<SealedSecret, CryptoError> {
    if payload.content.trim().is_empty() {
        return Err(CryptoError::EmptyPlaintext);
    }
    let bytes = payload.to_bytes()?;
    encrypt(master_key, &bytes)
}

/// Decrypt and decode a `{title, content}` record.
pub fn open_payload(
    master_key: &MasterKey,
    ciphertext: &[u8],
    nonce: &[u8],
) -> Result<SecretPayload, CryptoError> {
    let plaintext = decrypt(master_key, ciphertext, nonce)?;
    SecretPayload::from_bytes(&plaintext)
}
