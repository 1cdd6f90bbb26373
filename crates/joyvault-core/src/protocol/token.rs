//! The token-program surface needed for tier payment: associated account
//! derivation, balance reads, account creation and transfer.
//!
//! Layouts and instruction encodings come from `spl-token` and the
//! associated-token-account client; this module narrows them to the fields
//! the payment flow reads.

use solana_program::instruction::Instruction;
use solana_program::program_option::COption;
use solana_program::program_pack::Pack;
use solana_program::pubkey::Pubkey;
use spl_associated_token_account_client::address::get_associated_token_address;
use spl_token::instruction::TokenInstruction;
use spl_token::state::{Account, AccountState};

use super::CodecError;

pub use spl_associated_token_account_client::program::ID as ASSOCIATED_TOKEN_PROGRAM_ID;
pub use spl_token::ID as TOKEN_PROGRAM_ID;

/// Decimals of the payment token.
pub const PAYMENT_DECIMALS: u8 = 6;

pub const TOKEN_ACCOUNT_LEN: usize = Account::LEN;

/// Token account of `wallet` for `mint` under the associated-account program.
pub fn associated_token_address(wallet: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address(wallet, mint)
}

/// The fields of a token account the payment flow reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAccount {
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
}

impl TokenAccount {
    /// Rejects data of the wrong length and uninitialized accounts.
    pub fn unpack(data: &[u8]) -> Result<Self, CodecError> {
        let account = Account::unpack(data).map_err(|source| CodecError::Token {
            context: "token account",
            source,
        })?;
        Ok(Self {
            mint: account.mint,
            owner: account.owner,
            amount: account.amount,
        })
    }

    /// Initialized account with no delegate, not native, no close authority.
    pub fn pack(&self) -> Vec<u8> {
        let account = Account {
            mint: self.mint,
            owner: self.owner,
            amount: self.amount,
            delegate: COption::None,
            state: AccountState::Initialized,
            is_native: COption::None,
            delegated_amount: 0,
            close_authority: COption::None,
        };
        let mut data = vec![0u8; TOKEN_ACCOUNT_LEN];
        account.pack_into_slice(&mut data);
        data
    }
}

/// Create `wallet`'s associated account for `mint`, paid by `payer`.
pub fn create_associated_token_account(
    payer: &Pubkey,
    wallet: &Pubkey,
    mint: &Pubkey,
) -> Instruction {
    spl_associated_token_account_client::instruction::create_associated_token_account(
        payer,
        wallet,
        mint,
        &TOKEN_PROGRAM_ID,
    )
}

/// Unchecked transfer of `amount` base units, signed by `authority`.
pub fn transfer(
    source: &Pubkey,
    destination: &Pubkey,
    authority: &Pubkey,
    amount: u64,
) -> Result<Instruction, CodecError> {
    spl_token::instruction::transfer(
        &TOKEN_PROGRAM_ID,
        source,
        destination,
        authority,
        &[],
        amount,
    )
    .map_err(|source| CodecError::Token {
        context: "transfer instruction",
        source,
    })
}

/// Amount of a transfer instruction; `None` for any other token instruction.
pub fn unpack_transfer(data: &[u8]) -> Option<u64> {
    match TokenInstruction::unpack(data) {
        Ok(TokenInstruction::Transfer { amount }) => Some(amount),
        _ => None,
    }
}

/// Render base units with `decimals` places, keeping at least two.
///
/// Scales beyond `u64` have no fractional rendering, so the raw base units
/// are printed instead.
pub fn format_amount(base_units: u64, decimals: u8) -> String {
    let Some(scale) = 10u64.checked_pow(u32::from(decimals)) else {
        return base_units.to_string();
    };
    let whole = base_units / scale;
    let frac = base_units % scale;
    if decimals == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:0width$}", width = usize::from(decimals));
    let keep = frac.trim_end_matches('0').len().max(2.min(frac.len()));
    format!("{whole}.{}", &frac[..keep])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_account(amount: u64) -> TokenAccount {
        TokenAccount {
            mint: Pubkey::new_unique(),
            owner: Pubkey::new_unique(),
            amount,
        }
    }

    #[test]
    fn test_token_account_layout() {
        let account = sample_account(5_000_000);
        let data = account.pack();
        assert_eq!(data.len(), 165);
        // amount sits after mint and owner
        assert_eq!(&data[64..72], &5_000_000u64.to_le_bytes());
        assert_eq!(TokenAccount::unpack(&data).unwrap(), account);
        assert!(matches!(
            TokenAccount::unpack(&data[..100]),
            Err(CodecError::Token { .. })
        ));
    }

    #[test]
    fn test_uninitialized_account_rejected() {
        let data = vec![0u8; TOKEN_ACCOUNT_LEN];
        assert!(matches!(
            TokenAccount::unpack(&data),
            Err(CodecError::Token {
                context: "token account",
                ..
            })
        ));
    }

    #[test]
    fn test_transfer_encoding() {
        let ix = transfer(
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            20_000_000,
        )
        .unwrap();
        assert_eq!(ix.program_id, TOKEN_PROGRAM_ID);
        assert_eq!(ix.data[0], 3);
        assert_eq!(unpack_transfer(&ix.data), Some(20_000_000));
        assert!(ix.accounts[2].is_signer);
        assert_eq!(unpack_transfer(&[3, 1]), None);
        // MintTo shares the amount encoding but is not a transfer
        assert_eq!(unpack_transfer(&[7, 1, 0, 0, 0, 0, 0, 0, 0]), None);
    }

    #[test]
    fn test_create_ata_accounts() {
        let payer = Pubkey::new_unique();
        let wallet = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let ix = create_associated_token_account(&payer, &wallet, &mint);
        assert_eq!(ix.program_id, ASSOCIATED_TOKEN_PROGRAM_ID);
        assert_eq!(ix.accounts[1].pubkey, associated_token_address(&wallet, &mint));
        assert_ne!(
            associated_token_address(&wallet, &mint),
            associated_token_address(&payer, &mint)
        );
    }

    #[test]
    fn test_associated_address_seeds() {
        let wallet = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let (expected, _) = Pubkey::find_program_address(
            &[wallet.as_ref(), TOKEN_PROGRAM_ID.as_ref(), mint.as_ref()],
            &ASSOCIATED_TOKEN_PROGRAM_ID,
        );
        assert_eq!(associated_token_address(&wallet, &mint), expected);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(5_000_000, 6), "5.00");
        assert_eq!(format_amount(500_000, 6), "0.50");
        assert_eq!(format_amount(1_234_567, 6), "1.234567");
        assert_eq!(format_amount(0, 6), "0.00");
        assert_eq!(format_amount(42, 0), "42");
    }

    #[test]
    fn test_format_amount_beyond_u64_scale() {
        assert_eq!(format_amount(u64::MAX, 19), "1.8446744073709551615");
        assert_eq!(format_amount(12_345, 20), "12345");
        assert_eq!(format_amount(u64::MAX, 255), u64::MAX.to_string());
    }
}
