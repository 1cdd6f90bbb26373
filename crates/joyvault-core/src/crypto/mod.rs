//! Cryptographic primitives for JoyVault: Life Phrase key derivation, phrase
//! strength validation, secret payload encryption and attempt tracking.

pub mod cipher;
pub mod kdf;
pub mod keys;
pub mod rate_limit;
pub mod strength;

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
///
/// # Security Classification
///
/// Decryption failures are deliberately generic: a wrong key and a tampered
/// ciphertext produce the same [`CryptoError::DecryptionFailed`] so callers
/// cannot use the error as an oracle. They are marked `[INTEGRITY VIOLATION]`.
///
/// Input errors (empty phrase, oversized plaintext) are reported before any
/// key material is touched and are never retried with different parameters.
#[derive(Error, Debug)]
pub enum CryptoError {
    // =========================================================================
    // INTEGRITY VIOLATIONS - Wrong key or tampered ciphertext
    // =========================================================================
    /// AES-GCM authentication failed.
    ///
    /// **[INTEGRITY VIOLATION]** Either the master key is wrong (different Life
    /// Phrase or context) or the ciphertext/nonce were modified.
    #[error("[INTEGRITY VIOLATION] Decryption failed - wrong key or corrupted data")]
    DecryptionFailed,

    /// The decrypted bytes are not a valid `{title, content}` record.
    #[error("Decrypted payload is malformed: {0}")]
    MalformedPayload(String),

    // =========================================================================
    // USER ERRORS - Rejected input
    // =========================================================================
    /// The Life Phrase was empty after trimming whitespace.
    #[error("Life Phrase cannot be empty")]
    EmptyPhrase,

    /// The plaintext to encrypt was empty.
    #[error("Plaintext cannot be empty")]
    EmptyPlaintext,

    /// The plaintext exceeds the on-chain secret size cap.
    #[error("Plaintext is {size} bytes, maximum is {max} bytes")]
    PlaintextTooLarge { size: usize, max: usize },

    /// Too many derivation attempts for this identifier.
    #[error("Too many attempts - retry in {}s", retry_after.as_secs().max(1))]
    RateLimited { retry_after: Duration },

    // =========================================================================
    // PROGRAMMING ERRORS - Invalid parameters or primitive failures
    // =========================================================================
    /// The underlying KDF primitive failed.
    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    /// The pinned scrypt parameters were rejected by the primitive.
    #[error("Invalid scrypt parameters: {0}")]
    InvalidScryptParams(String),

    /// AES-GCM refused to encrypt (only possible for absurd input sizes).
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Nonce had the wrong width.
    #[error("Invalid nonce length: expected {expected}, got {actual}")]
    InvalidNonceLength { expected: usize, actual: usize },
}

// Re-export commonly used types
pub use cipher::{SealedSecret, SecretPayload};
pub use kdf::{DerivedKey, KdfVersion};
pub use keys::{MasterKey, VaultSeed};
pub use rate_limit::{AttemptTracker, Clock, SystemClock};
pub use strength::{StrengthReport, validate_strength};
