//! Vault protocol client.
//!
//! Composes key derivation, encryption, address derivation and the account
//! codec into the operations a user performs against their vault. Every
//! mutating operation re-reads the vault immediately before building its
//! instruction, checks the program's rules locally, submits through the
//! wallet and RPC capabilities, and re-reads again to confirm the new state.
//! Local checks are a fast path; the program's rejection is authoritative.

pub mod config;
pub mod payment;
pub mod session;
pub mod transport;
pub mod vault;

use solana_program::pubkey::Pubkey;
use thiserror::Error;

use crate::crypto::CryptoError;
use crate::protocol::{CodecError, VaultTier};
use payment::{PaymentError, PaymentReceipt};
use transport::{RpcError, SignerError, SubmitError, TransactionFailure, TransactionSignature};

/// Errors from vault operations.
///
/// Input errors are raised before any network call. State and authorization
/// errors carry enough detail to explain the refusal. Transport errors
/// ([`Transport`](Self::Transport), [`Unconfirmed`](Self::Unconfirmed)) and
/// [`IndexConflict`](Self::IndexConflict) are retried a bounded number of
/// times with fresh reads before they reach the caller.
#[derive(Error, Debug)]
pub enum VaultClientError {
    // =========================================================================
    // INPUT ERRORS
    // =========================================================================
    #[error("Secret is {size} bytes encrypted, maximum is {max}")]
    SecretTooLarge { size: usize, max: usize },

    #[error("Secrets are append-only; updating in place is disabled")]
    UpdateNotPermitted,

    // =========================================================================
    // STATE ERRORS
    // =========================================================================
    #[error("Vault already exists at {address}")]
    AlreadyExists { address: Pubkey },

    #[error("No vault at {address}")]
    VaultNotFound { address: Pubkey },

    #[error("Program config account not found")]
    ConfigMissing,

    #[error("Capacity reached: {count}/{max} secrets on {tier} tier")]
    CapacityReached { count: u32, max: u32, tier: VaultTier },

    #[error("Invalid tier transition: {from} -> {to}")]
    InvalidTransition { from: VaultTier, to: VaultTier },

    /// The caller named a treasury other than the one recorded in config.
    #[error("Treasury {provided} does not match configured treasury {expected}")]
    WrongTreasury { expected: Pubkey, provided: Pubkey },

    #[error("Secret index {index} out of range: vault holds {count}")]
    SecretIndexOutOfRange { index: u32, count: u32 },

    #[error("Secret account {address} not found")]
    SecretNotFound { address: Pubkey },

    /// Another submission took the index first; retried with a fresh count.
    #[error("Secret index {index} was taken concurrently")]
    IndexConflict { index: u32 },

    // =========================================================================
    // AUTHORIZATION ERRORS
    // =========================================================================
    #[error("Wallet {signer} is not the vault owner")]
    Unauthorized { signer: Pubkey },

    #[error("Cancelled by user")]
    UserCancelled,

    #[error(transparent)]
    Signer(SignerError),

    // =========================================================================
    // PAYMENT
    // =========================================================================
    #[error("Payment failed: {0}")]
    Payment(#[source] PaymentError),

    /// Payment confirmed but the upgrade did not go through.
    #[error("Paid ({}) but tier upgrade failed: {source}", payment.signature)]
    UpgradeAfterPayment {
        payment: Box<PaymentReceipt>,
        #[source]
        source: Box<VaultClientError>,
    },

    // =========================================================================
    // CODEC / CRYPTO
    // =========================================================================
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    // =========================================================================
    // TRANSPORT
    // =========================================================================
    #[error("RPC transport error: {0}")]
    Transport(String),

    #[error("Transaction {signature} not confirmed")]
    Unconfirmed { signature: TransactionSignature },

    #[error("Transaction rejected: {0}")]
    Rejected(TransactionFailure),
}

impl VaultClientError {
    /// Whether a fresh re-read and resubmission may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VaultClientError::Transport(_)
                | VaultClientError::Unconfirmed { .. }
                | VaultClientError::IndexConflict { .. }
        )
    }
}

impl From<PaymentError> for VaultClientError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::UserCancelled => VaultClientError::UserCancelled,
            PaymentError::ConfigMissing => VaultClientError::ConfigMissing,
            other => VaultClientError::Payment(other),
        }
    }
}

impl From<SubmitError> for VaultClientError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Signer(SignerError::UserCancelled) => VaultClientError::UserCancelled,
            SubmitError::Signer(e) => VaultClientError::Signer(e),
            SubmitError::Rpc(e) => e.into(),
        }
    }
}

impl From<RpcError> for VaultClientError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Transport(msg) => VaultClientError::Transport(msg),
            RpcError::Unconfirmed(signature) => VaultClientError::Unconfirmed { signature },
            RpcError::Rejected(failure) => VaultClientError::Rejected(failure),
        }
    }
}

// Re-export commonly used types
pub use config::{ClientConfig, SecretLifecycle};
pub use payment::PaymentOrchestrator;
pub use session::{Session, SessionError};
pub use transport::{RpcClient, WalletSigner};
pub use vault::{
    SecretEntry, SecretFailure, SecretListing, SecretReceipt, UpgradeReceipt, VaultClient,
    VaultLocation,
};
