//! Client configuration.

use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;

use crate::crypto::KdfVersion;
use crate::protocol::{DEVNET_USDC_MINT, PROGRAM_ID, ProgramAddresses};

/// Whether secrets may be rewritten at their existing index.
///
/// Indices are append-only either way; this only governs `update_secret`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecretLifecycle {
    /// Ciphertext and nonce at an existing index may be replaced.
    #[default]
    UpdateInPlace,
    /// Secrets are never modified once written.
    AppendOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ClientConfig {
    #[serde(with = "pubkey_string")]
    pub program_id: Pubkey,
    /// Token mint used to pay for tier upgrades.
    #[serde(with = "pubkey_string")]
    pub payment_mint: Pubkey,
    /// Total submissions per operation when transport errors occur.
    pub max_attempts: u32,
    pub secret_lifecycle: SecretLifecycle,
    pub kdf: KdfVersion,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            program_id: PROGRAM_ID,
            payment_mint: DEVNET_USDC_MINT,
            max_attempts: 3,
            secret_lifecycle: SecretLifecycle::default(),
            kdf: KdfVersion::default(),
        }
    }
}

impl ClientConfig {
    pub fn addresses(&self) -> ProgramAddresses {
        ProgramAddresses::new(self.program_id)
    }
}

/// Serialize a `Pubkey` as its base58 string.
pub mod pubkey_string {
    use std::str::FromStr;

    use serde::{Deserialize, Deserializer, Serializer, de};
    use solana_program::pubkey::Pubkey;

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(key)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let s = String::deserialize(deserializer)?;
        Pubkey::from_str(&s).map_err(|e| de::Error::custom(format!("invalid pubkey '{s}': {e}")))
    }
}
