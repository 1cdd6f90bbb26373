//! High-level vault operations.
//!
//! # Retry model
//!
//! Every operation runs as a sequence of attempts, at most
//! [`ClientConfig::max_attempts`]. An attempt reads fresh state, validates it,
//! submits, and re-reads to confirm the post-condition. Only
//! [retryable](VaultClientError::is_retryable) errors start another attempt.
//! Because an unconfirmed submission may still have landed, attempts after the
//! first look for the effect of an earlier attempt before submitting again.

use std::future::Future;

use solana_program::instruction::Instruction;
use solana_program::pubkey::Pubkey;
use tracing::{debug, info, instrument, warn};

use super::VaultClientError;
use super::config::{ClientConfig, SecretLifecycle};
use super::payment::{PaymentOrchestrator, PaymentReceipt};
use super::transport::{
    RpcClient, SignerError, TransactionRequest, TransactionSignature, WalletSigner,
    sign_and_submit,
};
use crate::crypto::cipher::{self, MAX_SECRET_SIZE, SealedSecret, SecretPayload};
use crate::crypto::{CryptoError, MasterKey, VaultSeed};
use crate::protocol::accounts::{
    EncryptedSecret, GlobalConfig, VaultAccount, decode_config, decode_secret, decode_vault,
};
use crate::protocol::instruction::{self, AddSecretArgs, UpdateSecretArgs};
use crate::protocol::{ProgramAddresses, ProgramError, SecretType, VaultTier};

type Result<T> = std::result::Result<T, VaultClientError>;

/// Where a master key's vault lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultLocation {
    pub seed: VaultSeed,
    pub address: Pubkey,
}

/// A secret appended by [`VaultClient::add_secret`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretReceipt {
    pub index: u32,
    pub address: Pubkey,
}

/// A decrypted secret.
#[derive(Debug)]
pub struct SecretEntry {
    pub index: u32,
    pub address: Pubkey,
    pub secret_type: SecretType,
    /// Unix seconds.
    pub created_at: i64,
    pub payload: SecretPayload,
}

/// A secret that could not be read or decrypted during a listing.
#[derive(Debug)]
pub struct SecretFailure {
    pub index: u32,
    pub address: Pubkey,
    pub error: VaultClientError,
}

#[derive(Debug)]
pub struct SecretListing {
    pub vault: VaultAccount,
    pub secrets: Vec<SecretEntry>,
    pub failures: Vec<SecretFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeReceipt {
    pub from: VaultTier,
    pub to: VaultTier,
    /// `None` when the target tier is free.
    pub payment: Option<PaymentReceipt>,
}

/// Vault operations over an RPC and a wallet capability.
pub struct VaultClient<R, W> {
    rpc: R,
    wallet: W,
    config: ClientConfig,
    addresses: ProgramAddresses,
}

impl<R: RpcClient, W: WalletSigner> VaultClient<R, W> {
    pub fn new(rpc: R, wallet: W) -> Self {
        Self::with_config(rpc, wallet, ClientConfig::default())
    }

    pub fn with_config(rpc: R, wallet: W, config: ClientConfig) -> Self {
        let addresses = config.addresses();
        Self {
            rpc,
            wallet,
            config,
            addresses,
        }
    }

    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn addresses(&self) -> &ProgramAddresses {
        &self.addresses
    }

    pub fn locate(&self, master_key: &MasterKey) -> VaultLocation {
        let seed = master_key.vault_seed();
        VaultLocation {
            seed,
            address: self.addresses.vault_address(&seed),
        }
    }

    /// Payment orchestrator sharing this client's capabilities.
    pub fn payments(&self) -> PaymentOrchestrator<'_, R, W> {
        PaymentOrchestrator::new(
            &self.rpc,
            &self.wallet,
            self.addresses,
            self.config.payment_mint,
        )
    }

    pub async fn fetch_vault(&self, address: &Pubkey) -> Result<Option<VaultAccount>> {
        match self.read(address).await? {
            Some(data) => Ok(Some(decode_vault(&data)?)),
            None => Ok(None),
        }
    }

    pub async fn fetch_config(&self) -> Result<GlobalConfig> {
        let data = self
            .read(&self.addresses.config_address())
            .await?
            .ok_or(VaultClientError::ConfigMissing)?;
        Ok(decode_config(&data)?)
    }

    /// Create the vault for `master_key`, owned by the connected wallet.
    #[instrument(level = "info", skip_all)]
    pub async fn create_vault(&self, master_key: &MasterKey) -> Result<VaultAccount> {
        let owner = self.signer()?;
        let location = self.locate(master_key);
        self.retrying("create_vault", move |attempt| {
            self.try_create_vault(location, owner, attempt)
        })
        .await
    }

    /// Encrypt `{title, content}` and append it at the vault's next index.
    #[instrument(level = "info", skip(self, master_key, title, content))]
    pub async fn add_secret(
        &self,
        master_key: &MasterKey,
        secret_type: SecretType,
        title: &str,
        content: &str,
    ) -> Result<SecretReceipt> {
        let owner = self.signer()?;
        let location = self.locate(master_key);
        let sealed = seal(master_key, title, content)?;
        let sealed = &sealed;
        self.retrying("add_secret", move |attempt| {
            self.try_add_secret(location, owner, secret_type, sealed, attempt)
        })
        .await
    }

    /// Replace the secret at `index` with a fresh encryption of `{title, content}`.
    ///
    /// Ownership is not checked locally; a non-owner submission is refused by
    /// the program and surfaces as [`VaultClientError::Unauthorized`].
    #[instrument(level = "info", skip(self, master_key, title, content))]
    pub async fn update_secret(
        &self,
        master_key: &MasterKey,
        index: u32,
        title: &str,
        content: &str,
    ) -> Result<SecretReceipt> {
        if self.config.secret_lifecycle == SecretLifecycle::AppendOnly {
            return Err(VaultClientError::UpdateNotPermitted);
        }
        let signer = self.signer()?;
        let location = self.locate(master_key);
        let sealed = seal(master_key, title, content)?;
        let sealed = &sealed;
        self.retrying("update_secret", move |attempt| {
            self.try_update_secret(location, signer, index, sealed, attempt)
        })
        .await
    }

    /// Move the vault to `new_tier`, paying the configured price first.
    ///
    /// `treasury`, if given, must equal the treasury recorded in the program
    /// config. The upgrade is submitted only after the payment is confirmed.
    #[instrument(level = "info", skip(self, master_key))]
    pub async fn upgrade_tier(
        &self,
        master_key: &MasterKey,
        new_tier: VaultTier,
        treasury: Option<Pubkey>,
    ) -> Result<UpgradeReceipt> {
        let owner = self.signer()?;
        let location = self.locate(master_key);

        let vault = self
            .retrying("read_vault", move |_| self.require_vault(location.address))
            .await?;
        let from = vault.tier;
        if !from.can_upgrade_to(new_tier) {
            warn!(%from, to = %new_tier, "Refusing tier transition");
            return Err(VaultClientError::InvalidTransition { from, to: new_tier });
        }

        let config = self.retrying("read_config", move |_| self.fetch_config()).await?;
        if let Some(provided) = treasury
            && provided != config.treasury_wallet
        {
            return Err(VaultClientError::WrongTreasury {
                expected: config.treasury_wallet,
                provided,
            });
        }

        let payment = if config.tier_price(new_tier) > 0 {
            Some(self.payments().pay_for_tier(new_tier).await?)
        } else {
            None
        };

        let upgraded = self
            .retrying("upgrade_tier", move |attempt| {
                self.try_upgrade_tier(location, owner, new_tier, attempt)
            })
            .await;

        match (upgraded, payment) {
            (Ok(vault), payment) => {
                info!(%from, to = %vault.tier, "Tier upgraded");
                Ok(UpgradeReceipt {
                    from,
                    to: vault.tier,
                    payment,
                })
            }
            (Err(source), Some(payment)) => {
                warn!(signature = %payment.signature, error = %source, "Upgrade failed after payment");
                Err(VaultClientError::UpgradeAfterPayment {
                    payment: Box::new(payment),
                    source: Box::new(source),
                })
            }
            (Err(e), None) => Err(e),
        }
    }

    /// Hand the vault to `new_owner`. Must be signed by the current owner.
    #[instrument(level = "info", skip(self, master_key))]
    pub async fn rotate_owner(
        &self,
        master_key: &MasterKey,
        new_owner: Pubkey,
    ) -> Result<VaultAccount> {
        let owner = self.signer()?;
        let location = self.locate(master_key);
        self.retrying("rotate_owner", move |attempt| {
            self.try_rotate_owner(location, owner, new_owner, attempt)
        })
        .await
    }

    /// Read and decrypt one secret.
    pub async fn read_secret(&self, master_key: &MasterKey, index: u32) -> Result<SecretEntry> {
        let location = self.locate(master_key);
        let address = self.addresses.secret_address(&location.address, index);
        let secret = self
            .fetch_secret(&address)
            .await?
            .ok_or(VaultClientError::SecretNotFound { address })?;
        let payload = cipher::open_payload(master_key, &secret.ciphertext, &secret.nonce)?;
        Ok(SecretEntry {
            index,
            address,
            secret_type: secret.secret_type,
            created_at: secret.created_at,
            payload,
        })
    }

    /// Decrypt every secret in `[0, secret_count)`.
    ///
    /// Transport errors are retried per entry. Entries that still cannot be
    /// read, or that fail to decode or decrypt, are collected in
    /// [`SecretListing::failures`]; the rest of the listing continues.
    #[instrument(level = "info", skip_all)]
    pub async fn list_secrets(&self, master_key: &MasterKey) -> Result<SecretListing> {
        let location = self.locate(master_key);
        let vault = self
            .retrying("read_vault", move |_| self.require_vault(location.address))
            .await?;

        let count = vault.secret_count.min(vault.max_secrets());
        let mut secrets = Vec::with_capacity(count as usize);
        let mut failures = Vec::new();
        for index in 0..count {
            let read = self
                .retrying("read_secret", move |_| self.read_secret(master_key, index))
                .await;
            match read {
                Ok(entry) => secrets.push(entry),
                Err(error) => {
                    warn!(index, %error, "Skipping unreadable secret");
                    failures.push(SecretFailure {
                        index,
                        address: self.addresses.secret_address(&location.address, index),
                        error,
                    });
                }
            }
        }
        debug!(read = secrets.len(), failed = failures.len(), "Listing complete");
        Ok(SecretListing {
            vault,
            secrets,
            failures,
        })
    }

    // -------------------------------------------------------------------------
    // Attempts
    // -------------------------------------------------------------------------

    async fn try_create_vault(
        &self,
        location: VaultLocation,
        owner: Pubkey,
        attempt: u32,
    ) -> Result<VaultAccount> {
        let address = location.address;
        if let Some(existing) = self.fetch_vault(&address).await? {
            if attempt > 1 && existing.owner == owner {
                debug!("Vault created by an earlier attempt");
                return Ok(existing);
            }
            return Err(VaultClientError::AlreadyExists { address });
        }

        let ix = instruction::initialize_vault(&self.addresses, &owner, &location.seed)?;
        let signature = match self.submit(owner, "create_vault", vec![ix]).await {
            Err(VaultClientError::Rejected(failure))
                if failure.program_error() == Some(ProgramError::AccountAlreadyInUse) =>
            {
                return Err(VaultClientError::AlreadyExists { address });
            }
            other => other.map_err(|e| classify(e, owner))?,
        };

        match self.fetch_vault(&address).await? {
            Some(vault) if vault.owner == owner => {
                info!(%address, "Vault created");
                Ok(vault)
            }
            _ => Err(VaultClientError::Unconfirmed { signature }),
        }
    }

    async fn try_add_secret(
        &self,
        location: VaultLocation,
        owner: Pubkey,
        secret_type: SecretType,
        sealed: &SealedSecret,
        attempt: u32,
    ) -> Result<SecretReceipt> {
        let vault = self.require_vault(location.address).await?;
        if attempt > 1
            && let Some(receipt) = self.find_landed_secret(&location, &vault, sealed).await?
        {
            debug!(index = receipt.index, "Secret added by an earlier attempt");
            return Ok(receipt);
        }

        if !vault.has_capacity() {
            warn!(count = vault.secret_count, max = vault.max_secrets(), "Vault is full");
            return Err(capacity_reached(&vault));
        }

        let config = self.fetch_config().await?;
        let index = vault.secret_count;
        let address = self.addresses.secret_address(&location.address, index);
        let ix = instruction::add_secret(
            &self.addresses,
            &owner,
            &location.address,
            index,
            &config.treasury_wallet,
            AddSecretArgs {
                secret_type,
                ciphertext: sealed.ciphertext.clone(),
                nonce: sealed.nonce,
            },
        )?;

        let signature = match self.submit(owner, "add_secret", vec![ix]).await {
            Err(VaultClientError::Rejected(failure)) => {
                return Err(match failure.program_error() {
                    Some(ProgramError::AccountAlreadyInUse) => {
                        VaultClientError::IndexConflict { index }
                    }
                    Some(ProgramError::VaultCapacityReached) => capacity_reached(&vault),
                    _ => classify(VaultClientError::Rejected(failure), owner),
                });
            }
            other => other?,
        };

        let landed = self
            .fetch_secret(&address)
            .await?
            .is_some_and(|secret| secret.nonce == sealed.nonce);
        if landed {
            info!(index, %address, "Secret added");
            Ok(SecretReceipt { index, address })
        } else {
            Err(VaultClientError::Unconfirmed { signature })
        }
    }

    async fn try_update_secret(
        &self,
        location: VaultLocation,
        signer: Pubkey,
        index: u32,
        sealed: &SealedSecret,
        attempt: u32,
    ) -> Result<SecretReceipt> {
        let vault = self.require_vault(location.address).await?;
        if index >= vault.secret_count {
            return Err(VaultClientError::SecretIndexOutOfRange {
                index,
                count: vault.secret_count,
            });
        }
        let address = self.addresses.secret_address(&location.address, index);
        if attempt > 1
            && self
                .fetch_secret(&address)
                .await?
                .is_some_and(|secret| secret.nonce == sealed.nonce)
        {
            debug!(index, "Secret updated by an earlier attempt");
            return Ok(SecretReceipt { index, address });
        }

        let ix = instruction::update_secret(
            &self.addresses,
            &signer,
            &location.address,
            index,
            UpdateSecretArgs {
                ciphertext: sealed.ciphertext.clone(),
                nonce: sealed.nonce,
            },
        )?;
        let signature = self
            .submit(signer, "update_secret", vec![ix])
            .await
            .map_err(|e| classify(e, signer))?;

        let landed = self
            .fetch_secret(&address)
            .await?
            .is_some_and(|secret| secret.nonce == sealed.nonce);
        if landed {
            info!(index, %address, "Secret updated");
            Ok(SecretReceipt { index, address })
        } else {
            Err(VaultClientError::Unconfirmed { signature })
        }
    }

    async fn try_upgrade_tier(
        &self,
        location: VaultLocation,
        owner: Pubkey,
        new_tier: VaultTier,
        attempt: u32,
    ) -> Result<VaultAccount> {
        let vault = self.require_vault(location.address).await?;
        if attempt > 1 && vault.tier == new_tier {
            debug!("Tier upgraded by an earlier attempt");
            return Ok(vault);
        }
        if !vault.tier.can_upgrade_to(new_tier) {
            return Err(VaultClientError::InvalidTransition {
                from: vault.tier,
                to: new_tier,
            });
        }

        let config = self.fetch_config().await?;
        let ix = instruction::upgrade_tier(
            &self.addresses,
            &owner,
            &owner,
            &location.address,
            &config.treasury_wallet,
            new_tier,
        )?;
        let signature = match self.submit(owner, "upgrade_tier", vec![ix]).await {
            Err(VaultClientError::Rejected(failure))
                if failure.program_error() == Some(ProgramError::InvalidTierUpgrade) =>
            {
                return Err(VaultClientError::InvalidTransition {
                    from: vault.tier,
                    to: new_tier,
                });
            }
            other => other.map_err(|e| classify(e, owner))?,
        };

        match self.fetch_vault(&location.address).await? {
            Some(vault) if vault.tier == new_tier => Ok(vault),
            _ => Err(VaultClientError::Unconfirmed { signature }),
        }
    }

    async fn try_rotate_owner(
        &self,
        location: VaultLocation,
        owner: Pubkey,
        new_owner: Pubkey,
        attempt: u32,
    ) -> Result<VaultAccount> {
        let vault = self.require_vault(location.address).await?;
        if vault.owner == new_owner {
            if attempt > 1 {
                debug!("Owner rotated by an earlier attempt");
            }
            return Ok(vault);
        }

        let ix = instruction::rotate_wallet(&self.addresses, &owner, &location.address, &new_owner)?;
        let signature = self
            .submit(owner, "rotate_owner", vec![ix])
            .await
            .map_err(|e| classify(e, owner))?;

        match self.fetch_vault(&location.address).await? {
            Some(vault) if vault.owner == new_owner => {
                info!(%new_owner, "Vault owner rotated");
                Ok(vault)
            }
            _ => Err(VaultClientError::Unconfirmed { signature }),
        }
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    async fn retrying<T, F, Fut>(&self, operation: &'static str, mut attempt_fn: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match attempt_fn(attempt).await {
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!(operation, attempt, max_attempts, error = %e, "Retrying with fresh state");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    fn signer(&self) -> Result<Pubkey> {
        self.wallet
            .public_key()
            .ok_or(VaultClientError::Signer(SignerError::NotConnected))
    }

    async fn read(&self, address: &Pubkey) -> Result<Option<Vec<u8>>> {
        self.rpc.get_account_data(address).await.map_err(Into::into)
    }

    async fn require_vault(&self, address: Pubkey) -> Result<VaultAccount> {
        self.fetch_vault(&address)
            .await?
            .ok_or(VaultClientError::VaultNotFound { address })
    }

    async fn fetch_secret(&self, address: &Pubkey) -> Result<Option<EncryptedSecret>> {
        match self.read(address).await? {
            Some(data) => Ok(Some(decode_secret(&data)?)),
            None => Ok(None),
        }
    }

    /// Look for `sealed` among the most recent indices. Each attempt can
    /// advance the count by at most one, so the window is the retry budget.
    async fn find_landed_secret(
        &self,
        location: &VaultLocation,
        vault: &VaultAccount,
        sealed: &SealedSecret,
    ) -> Result<Option<SecretReceipt>> {
        let window = self.config.max_attempts.max(1);
        let start = vault.secret_count.saturating_sub(window);
        for index in (start..vault.secret_count).rev() {
            let address = self.addresses.secret_address(&location.address, index);
            match self.fetch_secret(&address).await {
                Ok(Some(secret)) if secret.nonce == sealed.nonce => {
                    return Ok(Some(SecretReceipt { index, address }));
                }
                Ok(_) => {}
                Err(VaultClientError::Codec(error)) => {
                    debug!(index, %error, "Skipping undecodable secret while checking for a landed add");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    async fn submit(
        &self,
        fee_payer: Pubkey,
        label: &'static str,
        instructions: Vec<Instruction>,
    ) -> Result<TransactionSignature> {
        let request = TransactionRequest {
            fee_payer,
            instructions,
            label,
        };
        sign_and_submit(&self.rpc, &self.wallet, request)
            .await
            .map_err(Into::into)
    }
}

fn seal(master_key: &MasterKey, title: &str, content: &str) -> Result<SealedSecret> {
    let payload = SecretPayload::new(title, content);
    let sealed = match cipher::seal_payload(master_key, &payload) {
        Ok(sealed) => sealed,
        Err(CryptoError::PlaintextTooLarge { size, max }) => {
            return Err(VaultClientError::SecretTooLarge { size, max });
        }
        Err(e) => return Err(e.into()),
    };
    if sealed.ciphertext.len() > MAX_SECRET_SIZE {
        return Err(VaultClientError::SecretTooLarge {
            size: sealed.ciphertext.len(),
            max: MAX_SECRET_SIZE,
        });
    }
    Ok(sealed)
}

/// Translate a rejection that means the same thing for every operation.
fn classify(err: VaultClientError, signer: Pubkey) -> VaultClientError {
    match err {
        VaultClientError::Rejected(failure)
            if failure.program_error().is_some_and(ProgramError::is_authorization) =>
        {
            warn!(%signer, %failure, "Signer is not authorized for this vault");
            VaultClientError::Unauthorized { signer }
        }
        other => other,
    }
}

fn capacity_reached(vault: &VaultAccount) -> VaultClientError {
    VaultClientError::CapacityReached {
        count: vault.secret_count,
        max: vault.max_secrets(),
        tier: vault.tier,
    }
}
