//! Life Phrase key derivation.
//!
//! A Life Phrase is stretched with scrypt into a 256-bit [`MasterKey`]. The
//! parameters are pinned per [`KdfVersion`]: the same phrase and context always
//! reproduce the same key under the same version, and there is no fallback to
//! another algorithm when derivation fails. Moving to new parameters is a new
//! version and requires re-encrypting every secret under the new key.
//!
//! | Version     | Algorithm | log2(N) | r | p | Salt                                   |
//! |-------------|-----------|---------|---|---|----------------------------------------|
//! | `scrypt-v1` | scrypt    | 14      | 8 | 1 | `JoyVault-v1-2026` or `JoyVault-v1-2026-<context>` |

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use zeroize::Zeroizing;

use super::CryptoError;
use super::keys::{KEY_LEN, MasterKey, VaultSeed};

/// App-wide salt component shared by every vault.
pub const APP_SALT: &str = "JoyVault-v1-2026";

/// Pinned, versioned key-derivation scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KdfVersion {
    /// scrypt N=2^14, r=8, p=1. Roughly a second per derivation in a browser,
    /// which is the brute-force deterrent.
    #[default]
    ScryptV1,
}

/// scrypt cost parameters for one [`KdfVersion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScryptParams {
    pub log_n: u8,
    pub r: u32,
    pub p: u32,
}

impl KdfVersion {
    pub const fn params(self) -> ScryptParams {
        match self {
            KdfVersion::ScryptV1 => ScryptParams { log_n: 14, r: 8, p: 1 },
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            KdfVersion::ScryptV1 => "scrypt-v1",
        }
    }
}

impl fmt::Display for KdfVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A master key together with the scheme that produced it.
///
/// Recomputable at any time from the same phrase and context; it is never
/// stored, only re-derived.
#[derive(Debug, Clone)]
pub struct DerivedKey {
    master_key: MasterKey,
    version: KdfVersion,
}

impl DerivedKey {
    pub fn master_key(&self) -> &MasterKey {
        &self.master_key
    }

    pub fn into_master_key(self) -> MasterKey {
        self.master_key
    }

    pub fn version(&self) -> KdfVersion {
        self.version
    }

    /// Hex fingerprint of the master key, for session-presence checks only.
    pub fn fingerprint(&self) -> Zeroizing<String> {
        self.master_key.fingerprint()
    }

    pub fn vault_seed(&self) -> VaultSeed {
        self.master_key.vault_seed()
    }
}

/// Build the per-context salt.
///
/// Appending a stable context (typically the wallet address) keeps two users
/// with the same phrase from sharing a key, and rules out precomputed tables
/// across users. An empty context is treated as absent.
pub fn salt_for(context: Option<&str>) -> Vec<u8> {
    match context {
        Some(ctx) if !ctx.is_empty() => format!("{APP_SALT}-{ctx}").into_bytes(),
        _ => APP_SALT.as_bytes().to_vec(),
    }
}

/// Derive the master key for `life_phrase` with the current default version.
pub fn derive(life_phrase: &str, context: Option<&str>) -> Result<DerivedKey, CryptoError> {
    derive_with_version(life_phrase, context, KdfVersion::default())
}

/// Derive the master key for `life_phrase` with an explicit scheme version.
///
/// The phrase bytes are used exactly as given (no trimming or normalization)
/// so a vault created by any client of the same version stays reachable.
#[instrument(level = "debug", skip(life_phrase, context), fields(version = %version, has_context = context.is_some_and(|c| !c.is_empty())))]
pub fn derive_with_version(
    life_phrase: &str,
    context: Option<&str>,
    version: KdfVersion,
) -> Result<DerivedKey, CryptoError> {
    if life_phrase.trim().is_empty() {
        return Err(CryptoError::EmptyPhrase);
    }

    let salt = salt_for(context);
    let ScryptParams { log_n, r, p } = version.params();
    let params = scrypt::Params::new(log_n, r, p, KEY_LEN)
        .map_err(|e| CryptoError::InvalidScryptParams(e.to_string()))?;

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    let start = std::time::Instant::now();
    scrypt::scrypt(life_phrase.as_bytes(), &salt, &params, &mut key[..])
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;
    debug!(elapsed = ?start.elapsed(), "Life Phrase derivation complete");

    Ok(DerivedKey {
        master_key: MasterKey::from_bytes(*key),
        version,
    })
}

/// Run [`derive`] on the blocking pool.
///
/// Dropping the returned future abandons the wait; the derivation itself runs
/// to completion on its worker thread and its result is discarded.
#[cfg(feature = "async")]
pub async fn derive_async(
    life_phrase: Zeroizing<String>,
    context: Option<String>,
) -> Result<DerivedKey, CryptoError> {
    tokio::task::spawn_blocking(move || derive(&life_phrase, context.as_deref()))
        .await
        .map_err(|e| CryptoError::KeyDerivationFailed(format!("derivation task failed: {e}")))?
}
