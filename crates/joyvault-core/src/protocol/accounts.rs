//! On-chain account layouts.
//!
//! Each account is an 8-byte discriminator followed by the borsh encoding of
//! one of the structs below. The struct definition is the schema: field order
//! and widths come from the derive, and [`decode_account`] / [`encode_account`]
//! are the only code that reads or writes account bytes. Accounts are allocated
//! at their maximum size, so trailing bytes after the encoded fields are
//! ignored on decode.
//!
//! ```text
//! GlobalConfig     disc(8) admin(32) treasury(32) price_per_secret(u64) tier_prices([u64;4]) bump(u8)
//! Vault            disc(8) owner(32) vault_seed(32) tier(u8) secret_count(u32) bump(u8)
//! EncryptedSecret  disc(8) vault(32) secret_type(u8) len(u32) ciphertext(len) nonce(12) created_at(i64) bump(u8)
//! ```

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use super::types::{SecretType, VaultTier};
use super::{CodecError, DISCRIMINATOR_LEN, anchor_discriminator};
use crate::crypto::cipher::{MAX_SECRET_SIZE, NONCE_LEN};

/// Byte offsets within account data, discriminator included.
pub mod offsets {
    pub const CONFIG_ADMIN: usize = 8;
    pub const CONFIG_TREASURY: usize = 40;
    pub const CONFIG_PRICE_PER_SECRET: usize = 72;
    pub const CONFIG_TIER_PRICES: usize = 80;
    pub const CONFIG_BUMP: usize = 112;

    pub const VAULT_OWNER: usize = 8;
    pub const VAULT_SEED: usize = 40;
    pub const VAULT_TIER: usize = 72;
    pub const VAULT_SECRET_COUNT: usize = 73;
    pub const VAULT_BUMP: usize = 77;

    pub const SECRET_VAULT: usize = 8;
    pub const SECRET_TYPE: usize = 40;
    pub const SECRET_CIPHERTEXT_LEN: usize = 41;
    pub const SECRET_CIPHERTEXT: usize = 45;

    /// Nonce offset for a secret holding `ciphertext_len` bytes.
    pub const fn secret_nonce(ciphertext_len: usize) -> usize {
        SECRET_CIPHERTEXT + ciphertext_len
    }

    pub const fn secret_created_at(ciphertext_len: usize) -> usize {
        secret_nonce(ciphertext_len) + super::NONCE_LEN
    }
}

/// An account type owned by the program.
pub trait AccountLayout: BorshSerialize + BorshDeserialize {
    /// Struct name as declared by the program; feeds the discriminator.
    const NAME: &'static str;
    /// Smallest valid encoding, discriminator included.
    const MIN_LEN: usize;
    /// Bytes the program allocates for the account, discriminator included.
    const SPACE: usize;

    fn discriminator() -> [u8; DISCRIMINATOR_LEN] {
        anchor_discriminator("account", Self::NAME)
    }

    /// Constraints the byte layout alone cannot express.
    fn validate(&self) -> Result<(), CodecError> {
        Ok(())
    }
}

/// Decode an account of type `T` from raw account data.
pub fn decode_account<T: AccountLayout>(data: &[u8]) -> Result<T, CodecError> {
    if data.len() < T::MIN_LEN {
        return Err(CodecError::TooShort {
            account: T::NAME,
            needed: T::MIN_LEN,
            actual: data.len(),
        });
    }

    let expected = T::discriminator();
    let (disc, mut body) = data.split_at(DISCRIMINATOR_LEN);
    if disc != expected.as_slice() {
        return Err(CodecError::DiscriminatorMismatch {
            account: T::NAME,
            expected: hex::encode(expected),
            found: hex::encode(disc),
        });
    }

    let account = T::deserialize(&mut body).map_err(|source| CodecError::Malformed {
        context: T::NAME,
        source,
    })?;
    account.validate()?;
    Ok(account)
}

/// Encode an account, discriminator first, without allocation padding.
pub fn encode_account<T: AccountLayout>(account: &T) -> Result<Vec<u8>, CodecError> {
    account.validate()?;
    let mut out = Vec::with_capacity(T::MIN_LEN);
    out.extend_from_slice(&T::discriminator());
    account
        .serialize(&mut out)
        .map_err(|source| CodecError::Malformed {
            context: T::NAME,
            source,
        })?;
    Ok(out)
}

/// Encode an account zero-padded to its allocated size.
pub fn encode_account_padded<T: AccountLayout>(account: &T) -> Result<Vec<u8>, CodecError> {
    let mut out = encode_account(account)?;
    if out.len() < T::SPACE {
        out.resize(T::SPACE, 0);
    }
    Ok(out)
}

/// Program-wide settings, created once by the admin.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct GlobalConfig {
    pub admin: Pubkey,
    pub treasury_wallet: Pubkey,
    pub price_per_secret_lamports: u64,
    /// Indexed by [`VaultTier::price_index`].
    pub tier_prices: [u64; 4],
    pub bump: u8,
}

impl GlobalConfig {
    pub fn tier_price(&self, tier: VaultTier) -> u64 {
        self.tier_prices[tier.price_index()]
    }
}

impl AccountLayout for GlobalConfig {
    const NAME: &'static str = "GlobalConfig";
    const MIN_LEN: usize = DISCRIMINATOR_LEN + 32 + 32 + 8 + 32 + 1;
    const SPACE: usize = Self::MIN_LEN;
}

/// A user's vault: owner, tier and the number of secrets appended so far.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct VaultAccount {
    pub owner: Pubkey,
    pub vault_seed: [u8; 32],
    pub tier: VaultTier,
    pub secret_count: u32,
    pub bump: u8,
}

impl VaultAccount {
    pub fn max_secrets(&self) -> u32 {
        self.tier.max_secrets()
    }

    pub fn has_capacity(&self) -> bool {
        self.secret_count < self.max_secrets()
    }

    pub fn remaining_capacity(&self) -> u32 {
        self.max_secrets().saturating_sub(self.secret_count)
    }
}

impl AccountLayout for VaultAccount {
    const NAME: &'static str = "Vault";
    const MIN_LEN: usize = DISCRIMINATOR_LEN + 32 + 32 + 1 + 4 + 1;
    const SPACE: usize = Self::MIN_LEN;

    fn validate(&self) -> Result<(), CodecError> {
        if self.secret_count > self.max_secrets() {
            return Err(CodecError::SecretCountExceedsTier {
                count: self.secret_count,
                max: self.max_secrets(),
            });
        }
        Ok(())
    }
}

/// One encrypted `{title, content}` record at a fixed index.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct EncryptedSecret {
    pub vault: Pubkey,
    pub secret_type: SecretType,
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_LEN],
    /// Unix seconds, set by the program at append time.
    pub created_at: i64,
    pub bump: u8,
}

impl AccountLayout for EncryptedSecret {
    const NAME: &'static str = "EncryptedSecret";
    const MIN_LEN: usize = DISCRIMINATOR_LEN + 32 + 1 + 4 + NONCE_LEN + 8 + 1;
    const SPACE: usize = Self::MIN_LEN + MAX_SECRET_SIZE;

    fn validate(&self) -> Result<(), CodecError> {
        if self.ciphertext.len() > MAX_SECRET_SIZE {
            return Err(CodecError::CiphertextTooLarge {
                size: self.ciphertext.len(),
                max: MAX_SECRET_SIZE,
            });
        }
        Ok(())
    }
}

pub fn decode_config(data: &[u8]) -> Result<GlobalConfig, CodecError> {
    decode_account(data)
}

pub fn decode_vault(data: &[u8]) -> Result<VaultAccount, CodecError> {
    decode_account(data)
}

pub fn decode_secret(data: &[u8]) -> Result<EncryptedSecret, CodecError> {
    decode_account(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_vault() -> VaultAccount {
        VaultAccount {
            owner: Pubkey::new_from_array([1; 32]),
            vault_seed: [2; 32],
            tier: VaultTier::Pro,
            secret_count: 0x0102_0304,
            bump: 254,
        }
    }

    #[test]
    fn test_vault_field_offsets() {
        let data = encode_account(&sample_vault()).unwrap();
        assert_eq!(data.len(), VaultAccount::MIN_LEN);
        assert_eq!(&data[..8], &VaultAccount::discriminator());
        assert_eq!(&data[offsets::VAULT_OWNER..offsets::VAULT_SEED], &[1; 32]);
        assert_eq!(&data[offsets::VAULT_SEED..offsets::VAULT_TIER], &[2; 32]);
        assert_eq!(data[offsets::VAULT_TIER], 2);
        assert_eq!(
            &data[offsets::VAULT_SECRET_COUNT..offsets::VAULT_BUMP],
            &[4, 3, 2, 1]
        );
        assert_eq!(data[offsets::VAULT_BUMP], 254);
    }

    #[test]
    fn test_config_field_offsets() {
        let config = GlobalConfig {
            admin: Pubkey::new_from_array([9; 32]),
            treasury_wallet: Pubkey::new_from_array([8; 32]),
            price_per_secret_lamports: 1_000,
            tier_prices: [0, 5_000_000, 20_000_000, 50_000_000],
            bump: 255,
        };
        let data = encode_account(&config).unwrap();
        assert_eq!(data.len(), 113);
        assert_eq!(data[offsets::CONFIG_ADMIN], 9);
        assert_eq!(data[offsets::CONFIG_TREASURY], 8);
        assert_eq!(
            u64::from_le_bytes(data[offsets::CONFIG_PRICE_PER_SECRET..][..8].try_into().unwrap()),
            1_000
        );
        assert_eq!(
            u64::from_le_bytes(data[offsets::CONFIG_TIER_PRICES + 16..][..8].try_into().unwrap()),
            20_000_000
        );
        assert_eq!(data[offsets::CONFIG_BUMP], 255);
        assert_eq!(decode_config(&data).unwrap().tier_price(VaultTier::Ultra), 50_000_000);
    }

    /// Hand-assemble a secret account exactly as the program lays it out.
    fn raw_secret(ciphertext_len: usize, padding: usize) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&EncryptedSecret::discriminator());
        data.extend_from_slice(&[7; 32]);
        data.push(SecretType::SeedPhrase.tag());
        data.extend_from_slice(&u32::try_from(ciphertext_len).unwrap().to_le_bytes());
        data.extend((0..ciphertext_len).map(|i| (i % 251) as u8));
        data.extend_from_slice(&[0xAA; 12]);
        data.extend_from_slice(&1_767_225_600i64.to_le_bytes());
        data.push(253);
        data.resize(data.len() + padding, 0);
        data
    }

    #[test]
    fn test_secret_offsets_independent_of_ciphertext_length() {
        for n in [0usize, 1, 16, 45, 300, 1024] {
            let data = raw_secret(n, 1024 - n);
            assert_eq!(data[offsets::SECRET_TYPE], 2);
            assert_eq!(
                &data[offsets::secret_nonce(n)..offsets::secret_created_at(n)],
                &[0xAA; 12]
            );

            let secret = decode_secret(&data).unwrap();
            assert_eq!(secret.vault, Pubkey::new_from_array([7; 32]));
            assert_eq!(secret.secret_type, SecretType::SeedPhrase);
            assert_eq!(secret.ciphertext.len(), n);
            assert_eq!(
                secret.ciphertext,
                (0..n).map(|i| (i % 251) as u8).collect::<Vec<_>>()
            );
            assert_eq!(secret.nonce, [0xAA; 12]);
            assert_eq!(secret.created_at, 1_767_225_600);
            assert_eq!(secret.bump, 253);
        }
    }

    #[test]
    fn test_padded_secret_has_allocated_size() {
        let secret = decode_secret(&raw_secret(10, 0)).unwrap();
        let padded = encode_account_padded(&secret).unwrap();
        assert_eq!(padded.len(), EncryptedSecret::SPACE);
        assert_eq!(padded.len(), 8 + 1082);
        assert_eq!(decode_secret(&padded).unwrap(), secret);
    }

    #[test]
    fn test_wrong_discriminator_rejected() {
        let data = encode_account(&sample_vault()).unwrap();
        assert!(matches!(
            decode_secret(&data),
            Err(CodecError::DiscriminatorMismatch {
                account: "EncryptedSecret",
                ..
            })
        ));
    }

    #[test]
    fn test_short_data_rejected() {
        let data = encode_account(&sample_vault()).unwrap();
        assert!(matches!(
            decode_vault(&data[..40]),
            Err(CodecError::TooShort {
                needed: 78,
                actual: 40,
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_tier_tag_is_error() {
        let mut data = encode_account(&sample_vault()).unwrap();
        data[offsets::VAULT_TIER] = 9;
        assert!(matches!(
            decode_vault(&data),
            Err(CodecError::Malformed { context: "Vault", .. })
        ));
    }

    #[test]
    fn test_vault_count_over_tier_capacity_rejected() {
        let mut vault = sample_vault();
        vault.tier = VaultTier::Free;
        vault.secret_count = 1;
        assert_eq!(decode_vault(&encode_account(&vault).unwrap()).unwrap(), vault);

        vault.secret_count = u32::MAX;
        assert!(matches!(
            decode_vault(&encode_account(&vault).unwrap()),
            Err(CodecError::SecretCountExceedsTier {
                count: u32::MAX,
                max: 1
            })
        ));
    }

    #[test]
    fn test_oversized_ciphertext_rejected() {
        let data = raw_secret(1025, 0);
        assert!(matches!(
            decode_secret(&data),
            Err(CodecError::CiphertextTooLarge { size: 1025, .. })
        ));
    }

    #[test]
    fn test_truncated_ciphertext_is_error() {
        let data = raw_secret(100, 0);
        // length prefix says 100 but only 50 bytes follow
        assert!(matches!(
            decode_secret(&data[..offsets::SECRET_CIPHERTEXT + 50]),
            Err(CodecError::Malformed { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_vault_roundtrip(
            owner in any::<[u8; 32]>(),
            seed in any::<[u8; 32]>(),
            tier in 0u8..4,
            count in any::<u32>(),
            bump in any::<u8>(),
        ) {
            let tier_value = VaultTier::from_tag(tier).unwrap();
            let vault = VaultAccount {
                owner: Pubkey::new_from_array(owner),
                vault_seed: seed,
                tier: tier_value,
                secret_count: count % (tier_value.max_secrets() + 1),
                bump,
            };
            let data = encode_account(&vault).unwrap();
            prop_assert_eq!(data[offsets::VAULT_TIER], tier);
            prop_assert_eq!(decode_vault(&data).unwrap(), vault);
        }

        #[test]
        fn prop_decode_never_panics(data in proptest::collection::vec(any::<u8>(), 0..1200)) {
            let _ = decode_vault(&data);
            let _ = decode_secret(&data);
            let _ = decode_config(&data);
        }
    }
}
