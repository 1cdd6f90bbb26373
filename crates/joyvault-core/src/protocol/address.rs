//! Program-derived addresses.
//!
//! Seeds are domain-separated by literal tags. The secret index is always
//! serialized as a 4-byte little-endian `u32`; any other width produces a
//! different address than the program computes.

use solana_program::pubkey::Pubkey;

use super::PROGRAM_ID;
use crate::crypto::VaultSeed;

pub const CONFIG_TAG: &[u8] = b"config";
pub const VAULT_TAG: &[u8] = b"vault";
pub const SECRET_TAG: &[u8] = b"secret";

/// Address derivation bound to one program id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramAddresses {
    program_id: Pubkey,
}

impl Default for ProgramAddresses {
    fn default() -> Self {
        Self::new(PROGRAM_ID)
    }
}

impl ProgramAddresses {
    pub const fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    pub const fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub fn config_address_with_bump(&self) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[CONFIG_TAG], &self.program_id)
    }

    pub fn config_address(&self) -> Pubkey {
        self.config_address_with_bump().0
    }

    pub fn vault_address_with_bump(&self, seed: &VaultSeed) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[VAULT_TAG, seed.as_bytes()], &self.program_id)
    }

    pub fn vault_address(&self, seed: &VaultSeed) -> Pubkey {
        self.vault_address_with_bump(seed).0
    }

    pub fn secret_address_with_bump(&self, vault: &Pubkey, index: u32) -> (Pubkey, u8) {
        Pubkey::find_program_address(
            &[SECRET_TAG, vault.as_ref(), &index.to_le_bytes()],
            &self.program_id,
        )
    }

    pub fn secret_address(&self, vault: &Pubkey, index: u32) -> Pubkey {
        self.secret_address_with_bump(vault, index).0
    }
}
