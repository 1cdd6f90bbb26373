//! Wire contract of the JoyVault on-chain program.
//!
//! Everything here is pure: address derivation, account layouts, instruction
//! encoding and the program's error codes. Nothing in this module performs I/O.

pub mod accounts;
pub mod address;
pub mod errors;
pub mod instruction;
pub mod token;
pub mod types;

use ring::digest;
use solana_program::pubkey::Pubkey;
use thiserror::Error;

/// Deployed program (devnet).
pub const PROGRAM_ID: Pubkey = solana_program::pubkey!("8bqnKmrsbNdZHP8p9sCV1oeeRkzkpQbYvxBeFZ2DiXSB");

/// Payment token mint used on devnet (6 decimals).
pub const DEVNET_USDC_MINT: Pubkey =
    solana_program::pubkey!("Gh9ZwEmdLJ8DscKNTkTqPbNwLNNBjuSzaG9Vp2KGtKJr");

pub const DISCRIMINATOR_LEN: usize = 8;

/// Errors decoding or encoding program data.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The first eight bytes do not identify the expected account type.
    #[error("Account is not a {account}: discriminator {found} does not match {expected}")]
    DiscriminatorMismatch {
        account: &'static str,
        expected: String,
        found: String,
    },

    #[error("{account} data too short: need at least {needed} bytes, got {actual}")]
    TooShort {
        account: &'static str,
        needed: usize,
        actual: usize,
    },

    #[error("Unknown {kind} tag {tag}")]
    UnknownTag { kind: &'static str, tag: u8 },

    #[error("Unknown {kind} '{name}'")]
    UnknownName { kind: &'static str, name: String },

    #[error("Ciphertext is {size} bytes, maximum is {max}")]
    CiphertextTooLarge { size: usize, max: usize },

    /// A vault claims more secrets than its tier can hold.
    #[error("Vault holds {count} secrets but its tier allows {max}")]
    SecretCountExceedsTier { count: u32, max: u32 },

    #[error("Unknown instruction discriminator {0}")]
    UnknownInstruction(String),

    /// Token program data rejected by the SPL token codec.
    #[error("Invalid {context}: {source}")]
    Token {
        context: &'static str,
        #[source]
        source: solana_program::program_error::ProgramError,
    },

    /// Field-level decode failure (bad enum tag, truncated vector, ...).
    #[error("Malformed {context}: {source}")]
    Malformed {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Anchor-style 8-byte discriminator: `sha256("<namespace>:<name>")[..8]`.
///
/// Accounts use the `account` namespace with the struct name, instructions
/// use `global` with the snake_case handler name.
pub fn anchor_discriminator(namespace: &str, name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let preimage = format!("{namespace}:{name}");
    let hash = digest::digest(&digest::SHA256, preimage.as_bytes());
    let mut disc = [0u8; DISCRIMINATOR_LEN];
    disc.copy_from_slice(&hash.as_ref()[..DISCRIMINATOR_LEN]);
    disc
}

// Re-export commonly used types
pub use accounts::{AccountLayout, EncryptedSecret, GlobalConfig, VaultAccount};
pub use address::ProgramAddresses;
pub use errors::ProgramError;
pub use instruction::VaultInstruction;
pub use types::{SecretType, VaultTier};

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_discriminators() {
        // sha256("account:Vault")[..8]
        assert_eq!(
            anchor_discriminator("account", "Vault"),
            hex!("d308e82b02987577")
        );
        assert_ne!(
            anchor_discriminator("account", "Vault"),
            anchor_discriminator("account", "GlobalConfig")
        );
    }

    #[test]
    fn test_program_id() {
        assert_eq!(
            PROGRAM_ID.to_string(),
            "8bqnKmrsbNdZHP8p9sCV1oeeRkzkpQbYvxBeFZ2DiXSB"
        );
    }
}
