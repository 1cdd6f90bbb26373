#![forbid(unsafe_code)]

use std::fmt;

use rand::RngCore;
use ring::digest;
use secrecy::{ExposeSecret, SecretBox};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Length of the symmetric master key in bytes.
pub const KEY_LEN: usize = 32;

/// The 256-bit symmetric key derived from a Life Phrase.
///
/// # Security
///
/// The key is held in a `secrecy::SecretBox`, which:
/// - Keeps the bytes out of `Debug` output
/// - Zeroes the memory when the key is dropped
/// - Only exposes the bytes through scoped access ([`MasterKey::with_key`])
///
/// A `MasterKey` is never serialized, logged, or sent over the network. The
/// only values computed from it that leave the process are the [`VaultSeed`]
/// (a one-way hash used for address derivation) and ciphertexts.
pub struct MasterKey {
    key: SecretBox<[u8; KEY_LEN]>,
}

impl MasterKey {
    /// Wrap raw key bytes. The caller's copy should be zeroized afterwards.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self {
            key: SecretBox::new(Box::new(bytes)),
        }
    }

    /// Generate a random key. Only useful for tests and benchmarks: a real
    /// master key must be re-derivable from the Life Phrase.
    pub fn random() -> Self {
        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        rand::rng().fill_bytes(bytes.as_mut());
        Self::from_bytes(*bytes)
    }

    /// Execute a function with access to the raw key bytes.
    ///
    /// The bytes never escape the callback.
    ///
    /// # Example
    ///
    /// ```
    /// # use joyvault_core::crypto::keys::MasterKey;
    /// # use aes_gcm::{Aes256Gcm, Key, KeyInit};
    /// let master_key = MasterKey::random();
    ///
    /// let cipher = master_key.with_key(|key_bytes| {
    ///     let key: &Key<Aes256Gcm> = key_bytes.into();
    ///     Aes256Gcm::new(key)
    /// });
    /// ```
    pub fn with_key<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&[u8; KEY_LEN]) -> R,
    {
        f(self.key.expose_secret())
    }

    /// SHA-256 of the master key: the only key-dependent input to address
    /// derivation.
    pub fn vault_seed(&self) -> VaultSeed {
        self.with_key(|key| {
            let hash = digest::digest(&digest::SHA256, key);
            let mut seed = [0u8; 32];
            seed.copy_from_slice(hash.as_ref());
            VaultSeed(seed)
        })
    }

    /// Hex encoding of the key, used only to check session presence.
    ///
    /// Never use the fingerprint to decrypt and never persist it beyond the
    /// session that produced it.
    pub fn fingerprint(&self) -> Zeroizing<String> {
        self.with_key(|key| Zeroizing::new(hex::encode(key)))
    }

    /// Constant-time comparison against a previously taken fingerprint.
    pub fn matches_fingerprint(&self, fingerprint: &str) -> bool {
        let ours = self.fingerprint();
        bool::from(ours.as_bytes().ct_eq(fingerprint.as_bytes()))
    }
}

impl Clone for MasterKey {
    fn clone(&self) -> Self {
        self.with_key(|key| Self::from_bytes(*key))
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

/// `SHA-256(master key)`, stored on-chain in the vault account and used as the
/// `"vault"` PDA seed. Not secret: it cannot be inverted to the master key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct VaultSeed([u8; 32]);

impl VaultSeed {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub const fn to_bytes(self) -> [u8; 32] {
        self.0
    }
}

impl fmt::Debug for VaultSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VaultSeed({})", hex::encode(self.0))
    }
}

impl fmt::Display for VaultSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
