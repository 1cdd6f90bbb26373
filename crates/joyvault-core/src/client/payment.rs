//! Token payment for tier upgrades.
//!
//! Payment is a single transaction: create the treasury's token account if it
//! does not exist yet, then transfer the tier price. It is submitted at most
//! once. A payment that fails or cannot be confirmed is reported as an error
//! and the caller must not go on to the upgrade.

use solana_program::pubkey::Pubkey;
use thiserror::Error;
use tracing::{info, instrument, warn};

use super::transport::{
    RpcClient, RpcError, SignerError, SubmitError, TransactionFailure, TransactionRequest,
    TransactionSignature, WalletSigner, sign_and_submit,
};
use crate::protocol::accounts::{GlobalConfig, decode_config};
use crate::protocol::token::{self, PAYMENT_DECIMALS, TokenAccount};
use crate::protocol::{CodecError, ProgramAddresses, VaultTier};

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("{tier} tier has no price; nothing to pay")]
    NothingToPay { tier: VaultTier },

    #[error(
        "Insufficient balance: have {}, need {}",
        units(.current),
        units(.required)
    )]
    InsufficientBalance { current: u64, required: u64 },

    #[error("Program config account not found")]
    ConfigMissing,

    #[error("Payment cancelled by user")]
    UserCancelled,

    #[error(transparent)]
    Signer(SignerError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("RPC transport error: {0}")]
    Transport(String),

    /// The transfer may have landed. Check the balance before paying again.
    #[error("Payment {signature} not confirmed")]
    Unconfirmed { signature: TransactionSignature },

    #[error("Payment rejected: {0}")]
    Rejected(TransactionFailure),
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn units(amount: &u64) -> String {
    token::format_amount(*amount, PAYMENT_DECIMALS)
}

impl From<SubmitError> for PaymentError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Signer(SignerError::UserCancelled) => PaymentError::UserCancelled,
            SubmitError::Signer(e) => PaymentError::Signer(e),
            SubmitError::Rpc(e) => e.into(),
        }
    }
}

impl From<RpcError> for PaymentError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Transport(msg) => PaymentError::Transport(msg),
            RpcError::Unconfirmed(signature) => PaymentError::Unconfirmed { signature },
            RpcError::Rejected(failure) => PaymentError::Rejected(failure),
        }
    }
}

/// Proof of a confirmed tier payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub tier: VaultTier,
    /// Base units of the payment token.
    pub amount: u64,
    pub source: Pubkey,
    pub destination: Pubkey,
    pub created_destination: bool,
    pub signature: TransactionSignature,
}

pub struct PaymentOrchestrator<'a, R, W> {
    rpc: &'a R,
    wallet: &'a W,
    addresses: ProgramAddresses,
    mint: Pubkey,
}

impl<'a, R: RpcClient, W: WalletSigner> PaymentOrchestrator<'a, R, W> {
    pub fn new(rpc: &'a R, wallet: &'a W, addresses: ProgramAddresses, mint: Pubkey) -> Self {
        Self {
            rpc,
            wallet,
            addresses,
            mint,
        }
    }

    /// Price of `tier` in token base units, as recorded in the program config.
    pub async fn tier_price(&self, tier: VaultTier) -> Result<u64, PaymentError> {
        Ok(self.fetch_config().await?.tier_price(tier))
    }

    /// Token balance of `wallet`; zero if it has no token account.
    pub async fn balance_of(&self, wallet: &Pubkey) -> Result<u64, PaymentError> {
        let address = token::associated_token_address(wallet, &self.mint);
        match self.rpc.get_account_data(&address).await? {
            Some(data) => Ok(TokenAccount::unpack(&data)?.amount),
            None => Ok(0),
        }
    }

    /// Pay the price of `tier` to the treasury recorded in the program config.
    #[instrument(level = "info", skip(self), fields(tier = %tier))]
    pub async fn pay_for_tier(&self, tier: VaultTier) -> Result<PaymentReceipt, PaymentError> {
        let payer = self
            .wallet
            .public_key()
            .ok_or(PaymentError::Signer(SignerError::NotConnected))?;

        let config = self.fetch_config().await?;
        let amount = config.tier_price(tier);
        if amount == 0 {
            return Err(PaymentError::NothingToPay { tier });
        }

        let current = self.balance_of(&payer).await?;
        if current < amount {
            warn!(current, required = amount, "Insufficient balance for tier payment");
            return Err(PaymentError::InsufficientBalance {
                current,
                required: amount,
            });
        }

        let source = token::associated_token_address(&payer, &self.mint);
        let destination = token::associated_token_address(&config.treasury_wallet, &self.mint);
        let created_destination = self.rpc.get_account_data(&destination).await?.is_none();

        let mut instructions = Vec::with_capacity(2);
        if created_destination {
            info!("Treasury token account missing, creating it in the payment transaction");
            instructions.push(token::create_associated_token_account(
                &payer,
                &config.treasury_wallet,
                &self.mint,
            ));
        }
        instructions.push(token::transfer(&source, &destination, &payer, amount)?);

        let signature = sign_and_submit(
            self.rpc,
            self.wallet,
            TransactionRequest {
                fee_payer: payer,
                instructions,
                label: "pay_for_tier",
            },
        )
        .await?;

        info!(
            %signature,
            amount = %token::format_amount(amount, PAYMENT_DECIMALS),
            "Tier payment confirmed"
        );
        Ok(PaymentReceipt {
            tier,
            amount,
            source,
            destination,
            created_destination,
            signature,
        })
    }

    async fn fetch_config(&self) -> Result<GlobalConfig, PaymentError> {
        let data = self
            .rpc
            .get_account_data(&self.addresses.config_address())
            .await?
            .ok_or(PaymentError::ConfigMissing)?;
        Ok(decode_config(&data)?)
    }
}
