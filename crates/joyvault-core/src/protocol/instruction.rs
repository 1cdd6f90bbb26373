//! Instruction encoding.
//!
//! Instruction data is the 8-byte handler discriminator followed by the borsh
//! encoding of the handler's arguments. The builders below also fix the
//! account list and its writable/signer flags, which the program checks as
//! strictly as the data.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::instruction::{AccountMeta, Instruction};
use solana_program::pubkey::Pubkey;
use solana_program::system_program;

use super::address::ProgramAddresses;
use super::types::{SecretType, VaultTier};
use super::{CodecError, DISCRIMINATOR_LEN, anchor_discriminator};
use crate::crypto::VaultSeed;
use crate::crypto::cipher::{MAX_SECRET_SIZE, NONCE_LEN};

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct InitializeConfigArgs {
    pub treasury_wallet: Pubkey,
    pub price_per_secret_lamports: u64,
    pub tier_prices: [u64; 4],
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct InitializeVaultArgs {
    pub vault_seed: [u8; 32],
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct AddSecretArgs {
    pub secret_type: SecretType,
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_LEN],
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct UpdateSecretArgs {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_LEN],
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct UpgradeTierArgs {
    pub new_tier: VaultTier,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct RotateWalletArgs {
    pub new_owner: Pubkey,
}

/// The program's instruction set.
///
/// Earlier program versions also had a delete instruction; it was removed
/// when secrets became permanent and is not encodable here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultInstruction {
    InitializeConfig(InitializeConfigArgs),
    InitializeVault(InitializeVaultArgs),
    AddSecret(AddSecretArgs),
    UpdateSecret(UpdateSecretArgs),
    UpgradeTier(UpgradeTierArgs),
    RotateWallet(RotateWalletArgs),
}

impl VaultInstruction {
    const NAMES: [&'static str; 6] = [
        "initialize_config",
        "initialize_vault",
        "add_secret",
        "update_secret",
        "upgrade_tier",
        "rotate_wallet",
    ];

    /// Handler name as declared by the program.
    pub fn name(&self) -> &'static str {
        match self {
            VaultInstruction::InitializeConfig(_) => Self::NAMES[0],
            VaultInstruction::InitializeVault(_) => Self::NAMES[1],
            VaultInstruction::AddSecret(_) => Self::NAMES[2],
            VaultInstruction::UpdateSecret(_) => Self::NAMES[3],
            VaultInstruction::UpgradeTier(_) => Self::NAMES[4],
            VaultInstruction::RotateWallet(_) => Self::NAMES[5],
        }
    }

    pub fn discriminator(&self) -> [u8; DISCRIMINATOR_LEN] {
        anchor_discriminator("global", self.name())
    }

    pub fn pack(&self) -> Result<Vec<u8>, CodecError> {
        let context = self.name();
        let mut data = self.discriminator().to_vec();
        let written = match self {
            VaultInstruction::InitializeConfig(args) => args.serialize(&mut data),
            VaultInstruction::InitializeVault(args) => args.serialize(&mut data),
            VaultInstruction::AddSecret(args) => {
                check_ciphertext(&args.ciphertext)?;
                args.serialize(&mut data)
            }
            VaultInstruction::UpdateSecret(args) => {
                check_ciphertext(&args.ciphertext)?;
                args.serialize(&mut data)
            }
            VaultInstruction::UpgradeTier(args) => args.serialize(&mut data),
            VaultInstruction::RotateWallet(args) => args.serialize(&mut data),
        };
        written.map_err(|source| CodecError::Malformed { context, source })?;
        Ok(data)
    }

    pub fn unpack(data: &[u8]) -> Result<Self, CodecError> {
        if data.len() < DISCRIMINATOR_LEN {
            return Err(CodecError::TooShort {
                account: "instruction",
                needed: DISCRIMINATOR_LEN,
                actual: data.len(),
            });
        }
        let (disc, args) = data.split_at(DISCRIMINATOR_LEN);
        let name = Self::NAMES
            .into_iter()
            .find(|name| anchor_discriminator("global", name).as_slice() == disc)
            .ok_or_else(|| CodecError::UnknownInstruction(hex::encode(disc)))?;

        let malformed = |source| CodecError::Malformed {
            context: name,
            source,
        };
        let ix = match name {
            "initialize_config" => {
                VaultInstruction::InitializeConfig(borsh::from_slice(args).map_err(malformed)?)
            }
            "initialize_vault" => {
                VaultInstruction::InitializeVault(borsh::from_slice(args).map_err(malformed)?)
            }
            "add_secret" => VaultInstruction::AddSecret(borsh::from_slice(args).map_err(malformed)?),
            "update_secret" => {
                VaultInstruction::UpdateSecret(borsh::from_slice(args).map_err(malformed)?)
            }
            "upgrade_tier" => {
                VaultInstruction::UpgradeTier(borsh::from_slice(args).map_err(malformed)?)
            }
            _ => VaultInstruction::RotateWallet(borsh::from_slice(args).map_err(malformed)?),
        };
        Ok(ix)
    }
}

fn check_ciphertext(ciphertext: &[u8]) -> Result<(), CodecError> {
    if ciphertext.len() > MAX_SECRET_SIZE {
        return Err(CodecError::CiphertextTooLarge {
            size: ciphertext.len(),
            max: MAX_SECRET_SIZE,
        });
    }
    Ok(())
}

fn build(
    addresses: &ProgramAddresses,
    ix: &VaultInstruction,
    accounts: Vec<AccountMeta>,
) -> Result<Instruction, CodecError> {
    Ok(Instruction {
        program_id: *addresses.program_id(),
        accounts,
        data: ix.pack()?,
    })
}

/// `initialize_config`: config(w), admin(w, s), system program.
pub fn initialize_config(
    addresses: &ProgramAddresses,
    admin: &Pubkey,
    args: InitializeConfigArgs,
) -> Result<Instruction, CodecError> {
    build(
        addresses,
        &VaultInstruction::InitializeConfig(args),
        vec![
            AccountMeta::new(addresses.config_address(), false),
            AccountMeta::new(*admin, true),
            AccountMeta::new_readonly(system_program::ID, false),
        ],
    )
}

/// `initialize_vault`: vault(w), owner(w, s), system program.
pub fn initialize_vault(
    addresses: &ProgramAddresses,
    owner: &Pubkey,
    seed: &VaultSeed,
) -> Result<Instruction, CodecError> {
    build(
        addresses,
        &VaultInstruction::InitializeVault(InitializeVaultArgs {
            vault_seed: seed.to_bytes(),
        }),
        vec![
            AccountMeta::new(addresses.vault_address(seed), false),
            AccountMeta::new(*owner, true),
            AccountMeta::new_readonly(system_program::ID, false),
        ],
    )
}

/// `add_secret`: config, vault(w), secret(w), owner(w, s), treasury(w),
/// system program. The secret account sits at `index`, which must equal the
/// vault's current `secret_count`.
pub fn add_secret(
    addresses: &ProgramAddresses,
    owner: &Pubkey,
    vault: &Pubkey,
    index: u32,
    treasury: &Pubkey,
    args: AddSecretArgs,
) -> Result<Instruction, CodecError> {
    build(
        addresses,
        &VaultInstruction::AddSecret(args),
        vec![
            AccountMeta::new_readonly(addresses.config_address(), false),
            AccountMeta::new(*vault, false),
            AccountMeta::new(addresses.secret_address(vault, index), false),
            AccountMeta::new(*owner, true),
            AccountMeta::new(*treasury, false),
            AccountMeta::new_readonly(system_program::ID, false),
        ],
    )
}

/// `update_secret`: vault, secret(w), owner(s).
pub fn update_secret(
    addresses: &ProgramAddresses,
    owner: &Pubkey,
    vault: &Pubkey,
    index: u32,
    args: UpdateSecretArgs,
) -> Result<Instruction, CodecError> {
    build(
        addresses,
        &VaultInstruction::UpdateSecret(args),
        vec![
            AccountMeta::new_readonly(*vault, false),
            AccountMeta::new(addresses.secret_address(vault, index), false),
            AccountMeta::new_readonly(*owner, true),
        ],
    )
}

/// `upgrade_tier`: config, vault(w), payer(w, s), owner(s), treasury(w),
/// system program.
pub fn upgrade_tier(
    addresses: &ProgramAddresses,
    payer: &Pubkey,
    owner: &Pubkey,
    vault: &Pubkey,
    treasury: &Pubkey,
    new_tier: VaultTier,
) -> Result<Instruction, CodecError> {
    build(
        addresses,
        &VaultInstruction::UpgradeTier(UpgradeTierArgs { new_tier }),
        vec![
            AccountMeta::new_readonly(addresses.config_address(), false),
            AccountMeta::new(*vault, false),
            AccountMeta::new(*payer, true),
            AccountMeta::new_readonly(*owner, true),
            AccountMeta::new(*treasury, false),
            AccountMeta::new_readonly(system_program::ID, false),
        ],
    )
}

/// `rotate_wallet`: vault(w), owner(s).
pub fn rotate_wallet(
    addresses: &ProgramAddresses,
    owner: &Pubkey,
    vault: &Pubkey,
    new_owner: &Pubkey,
) -> Result<Instruction, CodecError> {
    build(
        addresses,
        &VaultInstruction::RotateWallet(RotateWalletArgs {
            new_owner: *new_owner,
        }),
        vec![
            AccountMeta::new(*vault, false),
            AccountMeta::new_readonly(*owner, true),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_discriminators_match_handler_names() {
        let upgrade = VaultInstruction::UpgradeTier(UpgradeTierArgs {
            new_tier: VaultTier::Pro,
        });
        assert_eq!(upgrade.discriminator(), hex!("7a38aa3cfceabe33"));
        assert_eq!(upgrade.pack().unwrap(), [&hex!("7a38aa3cfceabe33")[..], &[2u8][..]].concat());

        let vault = VaultInstruction::InitializeVault(InitializeVaultArgs { vault_seed: [0; 32] });
        assert_eq!(vault.discriminator(), hex!("30bfa32c47813fa4"));
    }

    #[test]
    fn test_add_secret_layout() {
        let ix = VaultInstruction::AddSecret(AddSecretArgs {
            secret_type: SecretType::Note,
            ciphertext: vec![0xCC; 20],
            nonce: [0x11; 12],
        });
        let data = ix.pack().unwrap();
        assert_eq!(&data[..8], &hex!("0c3e08273656b8f5"));
        assert_eq!(data[8], 4);
        assert_eq!(&data[9..13], &20u32.to_le_bytes());
        assert_eq!(&data[13..33], &[0xCC; 20]);
        assert_eq!(&data[33..45], &[0x11; 12]);
        assert_eq!(data.len(), 45);
        assert_eq!(VaultInstruction::unpack(&data).unwrap(), ix);
    }

    #[test]
    fn test_unpack_every_instruction() {
        let all = [
            VaultInstruction::InitializeConfig(InitializeConfigArgs {
                treasury_wallet: Pubkey::new_unique(),
                price_per_secret_lamports: 10,
                tier_prices: [0, 1, 2, 3],
            }),
            VaultInstruction::InitializeVault(InitializeVaultArgs { vault_seed: [4; 32] }),
            VaultInstruction::UpdateSecret(UpdateSecretArgs {
                ciphertext: vec![1, 2, 3],
                nonce: [0; 12],
            }),
            VaultInstruction::UpgradeTier(UpgradeTierArgs {
                new_tier: VaultTier::Ultra,
            }),
            VaultInstruction::RotateWallet(RotateWalletArgs {
                new_owner: Pubkey::new_unique(),
            }),
        ];
        for ix in all {
            assert_eq!(VaultInstruction::unpack(&ix.pack().unwrap()).unwrap(), ix);
        }
    }

    #[test]
    fn test_unknown_and_trailing_data_rejected() {
        assert!(matches!(
            VaultInstruction::unpack(&[0; 8]),
            Err(CodecError::UnknownInstruction(_))
        ));
        let mut data = VaultInstruction::UpgradeTier(UpgradeTierArgs {
            new_tier: VaultTier::Pro,
        })
        .pack()
        .unwrap();
        data.push(0);
        assert!(VaultInstruction::unpack(&data).is_err());
    }

    #[test]
    fn test_oversized_ciphertext_not_encodable() {
        let ix = VaultInstruction::UpdateSecret(UpdateSecretArgs {
            ciphertext: vec![0; MAX_SECRET_SIZE + 1],
            nonce: [0; 12],
        });
        assert!(matches!(
            ix.pack(),
            Err(CodecError::CiphertextTooLarge { size: 1025, max: 1024 })
        ));
    }

    #[test]
    fn test_account_lists() {
        let addresses = ProgramAddresses::default();
        let owner = Pubkey::new_unique();
        let seed = VaultSeed::new([1; 32]);
        let vault = addresses.vault_address(&seed);
        let treasury = Pubkey::new_unique();

        let ix = add_secret(
            &addresses,
            &owner,
            &vault,
            3,
            &treasury,
            AddSecretArgs {
                secret_type: SecretType::Password,
                ciphertext: vec![1; 32],
                nonce: [0; 12],
            },
        )
        .unwrap();
        assert_eq!(ix.program_id, *addresses.program_id());
        let keys: Vec<_> = ix.accounts.iter().map(|m| m.pubkey).collect();
        assert_eq!(
            keys,
            vec![
                addresses.config_address(),
                vault,
                addresses.secret_address(&vault, 3),
                owner,
                treasury,
                system_program::ID,
            ]
        );
        assert!(ix.accounts[3].is_signer && ix.accounts[3].is_writable);
        assert!(!ix.accounts[0].is_writable);

        let ix = upgrade_tier(&addresses, &owner, &owner, &vault, &treasury, VaultTier::Pro).unwrap();
        assert_eq!(ix.accounts.len(), 6);
        assert!(ix.accounts[2].is_signer && ix.accounts[3].is_signer);
        assert_eq!(ix.accounts[4].pubkey, treasury);

        let new_owner = Pubkey::new_unique();
        let ix = rotate_wallet(&addresses, &owner, &vault, &new_owner).unwrap();
        assert_eq!(&ix.data[8..], new_owner.as_ref());
    }
}
