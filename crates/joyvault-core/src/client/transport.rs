//! Capabilities the client consumes: a wallet that can sign, and an RPC
//! endpoint that can read accounts and submit signed transactions.

use std::fmt;
use std::future::Future;

use solana_program::instruction::Instruction;
use solana_program::pubkey::Pubkey;
use thiserror::Error;
use tracing::debug;

use crate::protocol::ProgramError;

/// An unsigned transaction as handed to the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub fee_payer: Pubkey,
    pub instructions: Vec<Instruction>,
    /// Short operation name for logs and wallet prompts.
    pub label: &'static str,
}

/// A transaction the wallet agreed to sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub request: TransactionRequest,
    pub signers: Vec<Pubkey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionSignature(pub String);

impl fmt::Display for TransactionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignerError {
    /// The user dismissed the signing prompt.
    #[error("Signing cancelled by user")]
    UserCancelled,

    #[error("Wallet refused to sign: {0}")]
    Rejected(String),

    #[error("Wallet not connected")]
    NotConnected,
}

/// Why the network or the program refused a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionFailure {
    /// Program or runtime error code, when one was reported.
    pub code: Option<u32>,
    /// Index of the failing instruction within the transaction.
    pub instruction_index: Option<usize>,
    pub message: String,
}

impl TransactionFailure {
    pub fn program_error(&self) -> Option<ProgramError> {
        self.code.map(ProgramError::from_code)
    }
}

impl fmt::Display for TransactionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.program_error() {
            Some(err) => write!(f, "{}: {err}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// Request never reached the node or the response was lost.
    #[error("RPC transport error: {0}")]
    Transport(String),

    /// Submitted but confirmation did not arrive; it may or may not have landed.
    #[error("Transaction {0} not confirmed")]
    Unconfirmed(TransactionSignature),

    /// Executed and failed (or failed preflight). Nothing was applied.
    #[error("Transaction rejected: {0}")]
    Rejected(TransactionFailure),
}

/// Wallet signing capability. The client never sees wallet key material.
pub trait WalletSigner: Send + Sync {
    /// `None` while no wallet is connected.
    fn public_key(&self) -> Option<Pubkey>;

    fn sign_transaction(
        &self,
        request: TransactionRequest,
    ) -> impl Future<Output = Result<SignedTransaction, SignerError>> + Send;
}

/// Read/submit RPC capability.
pub trait RpcClient: Send + Sync {
    /// Raw account data, or `None` if no account exists at `address`.
    fn get_account_data(
        &self,
        address: &Pubkey,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, RpcError>> + Send;

    fn send_transaction(
        &self,
        transaction: &SignedTransaction,
    ) -> impl Future<Output = Result<TransactionSignature, RpcError>> + Send;

    fn confirm_transaction(
        &self,
        signature: &TransactionSignature,
    ) -> impl Future<Output = Result<(), RpcError>> + Send;
}

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error(transparent)]
    Signer(#[from] SignerError),

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// Sign, send and wait for confirmation.
pub(crate) async fn sign_and_submit<R: RpcClient, W: WalletSigner>(
    rpc: &R,
    wallet: &W,
    request: TransactionRequest,
) -> Result<TransactionSignature, SubmitError> {
    let label = request.label;
    let signed = wallet.sign_transaction(request).await?;
    let signature = rpc.send_transaction(&signed).await?;
    debug!(label, %signature, "Transaction sent");
    rpc.confirm_transaction(&signature).await?;
    debug!(label, %signature, "Transaction confirmed");
    Ok(signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_display_names_program_error() {
        let failure = TransactionFailure {
            code: Some(6000),
            instruction_index: Some(0),
            message: "custom program error".into(),
        };
        assert_eq!(failure.program_error(), Some(ProgramError::VaultCapacityReached));
        assert!(failure.to_string().contains("vault capacity reached"));
    }
}
