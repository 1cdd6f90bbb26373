//! Scripted wallet.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use solana_program::pubkey::Pubkey;

use crate::client::transport::{
    SignedTransaction, SignerError, TransactionRequest, WalletSigner,
};

/// How the wallet answers one signing prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignBehavior {
    Approve,
    /// The user dismisses the prompt.
    Cancel,
    Reject(String),
}

#[derive(Debug)]
struct WalletInner {
    pubkey: Pubkey,
    connected: AtomicBool,
    script: Mutex<VecDeque<SignBehavior>>,
    prompts: Mutex<Vec<&'static str>>,
}

/// A wallet that approves every prompt unless told otherwise.
///
/// Clones share the script and the prompt log.
#[derive(Debug, Clone)]
pub struct SimulatedWallet {
    inner: Arc<WalletInner>,
}

impl Default for SimulatedWallet {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedWallet {
    pub fn new() -> Self {
        Self::with_pubkey(Pubkey::new_unique())
    }

    pub fn with_pubkey(pubkey: Pubkey) -> Self {
        Self {
            inner: Arc::new(WalletInner {
                pubkey,
                connected: AtomicBool::new(true),
                script: Mutex::new(VecDeque::new()),
                prompts: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.inner.pubkey
    }

    /// Answer the next unscripted prompt with `behavior`.
    pub fn then(&self, behavior: SignBehavior) -> &Self {
        self.inner.script.lock().push_back(behavior);
        self
    }

    pub fn disconnect(&self) {
        self.inner.connected.store(false, Ordering::SeqCst);
    }

    pub fn connect(&self) {
        self.inner.connected.store(true, Ordering::SeqCst);
    }

    /// Labels of every prompt shown, including cancelled ones.
    pub fn prompts(&self) -> Vec<&'static str> {
        self.inner.prompts.lock().clone()
    }
}

impl WalletSigner for SimulatedWallet {
    fn public_key(&self) -> Option<Pubkey> {
        self.inner
            .connected
            .load(Ordering::SeqCst)
            .then_some(self.inner.pubkey)
    }

    async fn sign_transaction(
        &self,
        request: TransactionRequest,
    ) -> Result<SignedTransaction, SignerError> {
        if !self.inner.connected.load(Ordering::SeqCst) {
            return Err(SignerError::NotConnected);
        }
        self.inner.prompts.lock().push(request.label);
        let behavior = self
            .inner
            .script
            .lock()
            .pop_front()
            .unwrap_or(SignBehavior::Approve);
        match behavior {
            SignBehavior::Approve => Ok(SignedTransaction {
                request,
                signers: vec![self.inner.pubkey],
            }),
            SignBehavior::Cancel => Err(SignerError::UserCancelled),
            SignBehavior::Reject(reason) => Err(SignerError::Rejected(reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> TransactionRequest {
        TransactionRequest {
            fee_payer: Pubkey::new_unique(),
            instructions: Vec::new(),
            label: "sign_check",
        }
    }

    #[tokio::test]
    async fn test_script_then_default_approve() {
        let wallet = SimulatedWallet::new();
        wallet.then(SignBehavior::Cancel);

        assert_eq!(
            wallet.sign_transaction(request()).await.unwrap_err(),
            SignerError::UserCancelled
        );
        let signed = wallet.sign_transaction(request()).await.unwrap();
        assert_eq!(signed.signers, vec![wallet.pubkey()]);
        assert_eq!(wallet.prompts(), vec!["sign_check", "sign_check"]);
    }

    #[tokio::test]
    async fn test_disconnected_wallet() {
        let wallet = SimulatedWallet::new();
        wallet.disconnect();
        assert_eq!(wallet.public_key(), None);
        assert_eq!(
            wallet.sign_transaction(request()).await.unwrap_err(),
            SignerError::NotConnected
        );
    }
}
