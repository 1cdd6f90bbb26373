//! In-memory ledger executing the vault program, the associated token account
//! program and token transfers.
//!
//! Transactions are atomic: every instruction runs against a copy of the
//! accounts, which replaces the live state only if all of them succeed. A
//! failing transaction is reported the way preflight would report it, with
//! the error code and the index of the failing instruction.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use solana_program::instruction::{AccountMeta, Instruction};
use solana_program::pubkey::Pubkey;
use spl_token::error::TokenError;
use tracing::debug;

use crate::client::transport::{
    RpcClient, RpcError, SignedTransaction, TransactionFailure, TransactionSignature,
};
use crate::crypto::VaultSeed;
use crate::crypto::cipher::MAX_SECRET_SIZE;
use crate::protocol::accounts::{
    AccountLayout, EncryptedSecret, GlobalConfig, VaultAccount, decode_account,
    encode_account_padded,
};
use crate::protocol::instruction::{
    self, AddSecretArgs, InitializeConfigArgs, UpdateSecretArgs, VaultInstruction,
};
use crate::protocol::token::{
    self, ASSOCIATED_TOKEN_PROGRAM_ID, TOKEN_PROGRAM_ID, TokenAccount,
};
use crate::protocol::{PROGRAM_ID, ProgramAddresses, ProgramError, VaultTier};

/// Anchor's code for instruction data that does not deserialize.
const INSTRUCTION_DID_NOT_DESERIALIZE: u32 = 102;

/// A transport fault to inject into the next matching call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The next account read fails.
    TransportOnRead,
    /// The next read of this address fails.
    TransportOnReadOf(Pubkey),
    /// The next submission fails before reaching the ledger.
    TransportOnSend,
    /// The next submission is applied but its confirmation never arrives.
    LoseConfirmation,
}

#[derive(Debug, Clone, Default)]
struct Accounts {
    data: HashMap<Pubkey, Vec<u8>>,
    lamports: HashMap<Pubkey, u64>,
}

impl Accounts {
    fn exists(&self, address: &Pubkey) -> bool {
        self.data.contains_key(address)
    }

    fn load<T: AccountLayout>(&self, address: &Pubkey) -> Result<T, ProgramError> {
        let data = self
            .data
            .get(address)
            .ok_or(ProgramError::AccountNotInitialized)?;
        decode_account(data).map_err(|_| ProgramError::AccountNotInitialized)
    }

    fn store<T: AccountLayout>(&mut self, address: Pubkey, account: &T) -> Result<(), ProgramError> {
        let data = encode_account_padded(account)
            .map_err(|_| ProgramError::Other(INSTRUCTION_DID_NOT_DESERIALIZE))?;
        self.data.insert(address, data);
        Ok(())
    }

    fn transfer_lamports(&mut self, from: &Pubkey, to: &Pubkey, amount: u64) -> Result<(), ProgramError> {
        if amount == 0 {
            return Ok(());
        }
        let balance = self.lamports.get(from).copied().unwrap_or(0);
        if balance < amount {
            return Err(ProgramError::InsufficientLamports);
        }
        self.lamports.insert(*from, balance - amount);
        *self.lamports.entry(*to).or_insert(0) += amount;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    accounts: Accounts,
    unix_timestamp: i64,
    faults: Vec<Fault>,
    unconfirmed: HashSet<TransactionSignature>,
    executed: Vec<&'static str>,
    sequence: u64,
}

impl LedgerState {
    fn take_fault(&mut self, fault: Fault) -> bool {
        match self.faults.iter().position(|f| *f == fault) {
            Some(pos) => {
                self.faults.remove(pos);
                true
            }
            None => false,
        }
    }
}

/// Shared handle to an in-memory ledger. Clones see the same state.
#[derive(Debug, Clone)]
pub struct SimulatedLedger {
    addresses: ProgramAddresses,
    state: Arc<Mutex<LedgerState>>,
}

impl Default for SimulatedLedger {
    fn default() -> Self {
        Self::new(PROGRAM_ID)
    }
}

impl SimulatedLedger {
    pub fn new(program_id: Pubkey) -> Self {
        let state = LedgerState {
            unix_timestamp: 1_767_225_600,
            ..LedgerState::default()
        };
        Self {
            addresses: ProgramAddresses::new(program_id),
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn addresses(&self) -> &ProgramAddresses {
        &self.addresses
    }

    /// Queue a fault; each fault fires once.
    pub fn inject(&self, fault: Fault) {
        self.state.lock().faults.push(fault);
    }

    pub fn airdrop(&self, to: &Pubkey, lamports: u64) {
        *self.state.lock().accounts.lamports.entry(*to).or_insert(0) += lamports;
    }

    pub fn lamports(&self, address: &Pubkey) -> u64 {
        self.state
            .lock()
            .accounts
            .lamports
            .get(address)
            .copied()
            .unwrap_or(0)
    }

    /// Credit `amount` of `mint` to `wallet`, creating its token account.
    pub fn mint_tokens(&self, mint: &Pubkey, wallet: &Pubkey, amount: u64) {
        let address = token::associated_token_address(wallet, mint);
        let mut state = self.state.lock();
        let current = state
            .accounts
            .data
            .get(&address)
            .and_then(|data| TokenAccount::unpack(data).ok())
            .map_or(0, |account| account.amount);
        let account = TokenAccount {
            mint: *mint,
            owner: *wallet,
            amount: current + amount,
        };
        state.accounts.data.insert(address, account.pack());
    }

    /// Token balance of `wallet`; zero without a token account.
    pub fn token_balance(&self, mint: &Pubkey, wallet: &Pubkey) -> u64 {
        let address = token::associated_token_address(wallet, mint);
        self.state
            .lock()
            .accounts
            .data
            .get(&address)
            .and_then(|data| TokenAccount::unpack(data).ok())
            .map_or(0, |account| account.amount)
    }

    /// Run `initialize_config` as `admin`.
    pub fn initialize_config(
        &self,
        admin: &Pubkey,
        treasury: &Pubkey,
        price_per_secret_lamports: u64,
        tier_prices: [u64; 4],
    ) -> Result<(), TransactionFailure> {
        let ix = instruction::initialize_config(
            &self.addresses,
            admin,
            InitializeConfigArgs {
                treasury_wallet: *treasury,
                price_per_secret_lamports,
                tier_prices,
            },
        )
        .map_err(|e| TransactionFailure {
            code: None,
            instruction_index: Some(0),
            message: e.to_string(),
        })?;
        let mut state = self.state.lock();
        let mut accounts = state.accounts.clone();
        execute(&self.addresses, &mut accounts, state.unix_timestamp, &[ix], &[*admin])?;
        state.accounts = accounts;
        Ok(())
    }

    pub fn set_unix_timestamp(&self, unix_timestamp: i64) {
        self.state.lock().unix_timestamp = unix_timestamp;
    }

    /// Write raw account data, bypassing every program.
    pub fn put_account(&self, address: Pubkey, data: Vec<u8>) {
        self.state.lock().accounts.data.insert(address, data);
    }

    pub fn account_data(&self, address: &Pubkey) -> Option<Vec<u8>> {
        self.state.lock().accounts.data.get(address).cloned()
    }

    /// Labels of the transactions applied so far, in order.
    pub fn executed(&self) -> Vec<&'static str> {
        self.state.lock().executed.clone()
    }
}

impl RpcClient for SimulatedLedger {
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, RpcError> {
        let mut state = self.state.lock();
        if state.take_fault(Fault::TransportOnRead)
            || state.take_fault(Fault::TransportOnReadOf(*address))
        {
            return Err(RpcError::Transport("read timed out".into()));
        }
        Ok(state.accounts.data.get(address).cloned())
    }

    async fn send_transaction(
        &self,
        transaction: &SignedTransaction,
    ) -> Result<TransactionSignature, RpcError> {
        let mut state = self.state.lock();
        if state.take_fault(Fault::TransportOnSend) {
            return Err(RpcError::Transport("connection reset".into()));
        }

        let request = &transaction.request;
        if !transaction.signers.contains(&request.fee_payer) {
            return Err(RpcError::Rejected(TransactionFailure {
                code: Some(ProgramError::AccountNotSigner.code()),
                instruction_index: None,
                message: "fee payer did not sign".into(),
            }));
        }

        let mut accounts = state.accounts.clone();
        execute(
            &self.addresses,
            &mut accounts,
            state.unix_timestamp,
            &request.instructions,
            &transaction.signers,
        )
        .map_err(RpcError::Rejected)?;

        state.accounts = accounts;
        state.sequence += 1;
        state.executed.push(request.label);
        let signature = TransactionSignature(format!("sim-{}-{}", state.sequence, request.label));
        debug!(%signature, "Simulated transaction applied");
        if state.take_fault(Fault::LoseConfirmation) {
            state.unconfirmed.insert(signature.clone());
        }
        Ok(signature)
    }

    async fn confirm_transaction(&self, signature: &TransactionSignature) -> Result<(), RpcError> {
        if self.state.lock().unconfirmed.remove(signature) {
            return Err(RpcError::Unconfirmed(signature.clone()));
        }
        Ok(())
    }
}

fn execute(
    addresses: &ProgramAddresses,
    accounts: &mut Accounts,
    unix_timestamp: i64,
    instructions: &[Instruction],
    signers: &[Pubkey],
) -> Result<(), TransactionFailure> {
    for (index, ix) in instructions.iter().enumerate() {
        let fail = |err: ProgramError| TransactionFailure {
            code: Some(err.code()),
            instruction_index: Some(index),
            message: format!("instruction {index} failed: {err}"),
        };

        if ix
            .accounts
            .iter()
            .any(|meta| meta.is_signer && !signers.contains(&meta.pubkey))
        {
            return Err(fail(ProgramError::AccountNotSigner));
        }

        let result = if ix.program_id == *addresses.program_id() {
            let mut program = VaultProgram {
                addresses,
                accounts,
                unix_timestamp,
            };
            program.run(ix)
        } else if ix.program_id == ASSOCIATED_TOKEN_PROGRAM_ID {
            create_token_account(accounts, &ix.accounts)
        } else if ix.program_id == TOKEN_PROGRAM_ID {
            transfer_tokens(accounts, &ix.accounts, &ix.data)
        } else {
            Err(token_error(TokenError::InvalidInstruction))
        };
        result.map_err(fail)?;
    }
    Ok(())
}

fn key_at(metas: &[AccountMeta], position: usize) -> Result<Pubkey, ProgramError> {
    metas
        .get(position)
        .map(|meta| meta.pubkey)
        .ok_or(ProgramError::Other(INSTRUCTION_DID_NOT_DESERIALIZE))
}

struct VaultProgram<'a> {
    addresses: &'a ProgramAddresses,
    accounts: &'a mut Accounts,
    unix_timestamp: i64,
}

impl VaultProgram<'_> {
    fn run(&mut self, ix: &Instruction) -> Result<(), ProgramError> {
        let instruction = VaultInstruction::unpack(&ix.data)
            .map_err(|_| ProgramError::Other(INSTRUCTION_DID_NOT_DESERIALIZE))?;
        let metas = ix.accounts.as_slice();
        match instruction {
            VaultInstruction::InitializeConfig(args) => self.initialize_config(metas, args),
            VaultInstruction::InitializeVault(args) => self.initialize_vault(metas, args.vault_seed),
            VaultInstruction::AddSecret(args) => self.add_secret(metas, args),
            VaultInstruction::UpdateSecret(args) => self.update_secret(metas, args),
            VaultInstruction::UpgradeTier(args) => self.upgrade_tier(metas, args.new_tier),
            VaultInstruction::RotateWallet(args) => self.rotate_wallet(metas, args.new_owner),
        }
    }

    fn create_at(&self, address: &Pubkey, expected: &Pubkey) -> Result<(), ProgramError> {
        if address != expected {
            return Err(ProgramError::ConstraintSeeds);
        }
        if self.accounts.exists(address) {
            return Err(ProgramError::AccountAlreadyInUse);
        }
        Ok(())
    }

    /// Load the vault at `address` and check it was derived from its own seed.
    fn owned_vault(&self, address: &Pubkey, owner: &Pubkey) -> Result<VaultAccount, ProgramError> {
        let vault: VaultAccount = self.accounts.load(address)?;
        let seed = VaultSeed::new(vault.vault_seed);
        if self.addresses.vault_address(&seed) != *address {
            return Err(ProgramError::ConstraintSeeds);
        }
        if vault.owner != *owner {
            return Err(ProgramError::ConstraintHasOne);
        }
        Ok(vault)
    }

    fn config(&self, address: &Pubkey) -> Result<GlobalConfig, ProgramError> {
        if *address != self.addresses.config_address() {
            return Err(ProgramError::ConstraintSeeds);
        }
        self.accounts.load(address)
    }

    fn initialize_config(
        &mut self,
        metas: &[AccountMeta],
        args: InitializeConfigArgs,
    ) -> Result<(), ProgramError> {
        let config = key_at(metas, 0)?;
        let admin = key_at(metas, 1)?;
        let (expected, bump) = self.addresses.config_address_with_bump();
        self.create_at(&config, &expected)?;
        self.accounts.store(
            config,
            &GlobalConfig {
                admin,
                treasury_wallet: args.treasury_wallet,
                price_per_secret_lamports: args.price_per_secret_lamports,
                tier_prices: args.tier_prices,
                bump,
            },
        )
    }

    fn initialize_vault(&mut self, metas: &[AccountMeta], vault_seed: [u8; 32]) -> Result<(), ProgramError> {
        let vault = key_at(metas, 0)?;
        let owner = key_at(metas, 1)?;
        let (expected, bump) = self
            .addresses
            .vault_address_with_bump(&VaultSeed::new(vault_seed));
        self.create_at(&vault, &expected)?;
        self.accounts.store(
            vault,
            &VaultAccount {
                owner,
                vault_seed,
                tier: VaultTier::Free,
                secret_count: 0,
                bump,
            },
        )
    }

    fn add_secret(&mut self, metas: &[AccountMeta], args: AddSecretArgs) -> Result<(), ProgramError> {
        let config = self.config(&key_at(metas, 0)?)?;
        let vault_address = key_at(metas, 1)?;
        let secret_address = key_at(metas, 2)?;
        let owner = key_at(metas, 3)?;
        let treasury = key_at(metas, 4)?;

        let mut vault = self.owned_vault(&vault_address, &owner)?;
        let (expected, bump) = self
            .addresses
            .secret_address_with_bump(&vault_address, vault.secret_count);
        self.create_at(&secret_address, &expected)?;

        if !vault.has_capacity() {
            return Err(ProgramError::VaultCapacityReached);
        }
        if args.ciphertext.len() > MAX_SECRET_SIZE {
            return Err(ProgramError::SecretTooLarge);
        }
        if treasury != config.treasury_wallet {
            return Err(ProgramError::ConstraintAddress);
        }
        self.accounts
            .transfer_lamports(&owner, &treasury, config.price_per_secret_lamports)?;

        self.accounts.store(
            secret_address,
            &EncryptedSecret {
                vault: vault_address,
                secret_type: args.secret_type,
                ciphertext: args.ciphertext,
                nonce: args.nonce,
                created_at: self.unix_timestamp,
                bump,
            },
        )?;
        vault.secret_count += 1;
        self.accounts.store(vault_address, &vault)
    }

    fn update_secret(&mut self, metas: &[AccountMeta], args: UpdateSecretArgs) -> Result<(), ProgramError> {
        let vault_address = key_at(metas, 0)?;
        let secret_address = key_at(metas, 1)?;
        let owner = key_at(metas, 2)?;

        self.owned_vault(&vault_address, &owner)?;
        let mut secret: EncryptedSecret = self.accounts.load(&secret_address)?;
        if secret.vault != vault_address {
            return Err(ProgramError::ConstraintHasOne);
        }
        if args.ciphertext.len() > MAX_SECRET_SIZE {
            return Err(ProgramError::SecretTooLarge);
        }
        secret.ciphertext = args.ciphertext;
        secret.nonce = args.nonce;
        self.accounts.store(secret_address, &secret)
    }

    fn upgrade_tier(&mut self, metas: &[AccountMeta], new_tier: VaultTier) -> Result<(), ProgramError> {
        let config = self.config(&key_at(metas, 0)?)?;
        let vault_address = key_at(metas, 1)?;
        let payer = key_at(metas, 2)?;
        let owner = key_at(metas, 3)?;
        let treasury = key_at(metas, 4)?;

        let mut vault = self.owned_vault(&vault_address, &owner)?;
        if treasury != config.treasury_wallet {
            return Err(ProgramError::ConstraintAddress);
        }
        if !vault.tier.can_upgrade_to(new_tier) {
            return Err(ProgramError::InvalidTierUpgrade);
        }
        self.accounts
            .transfer_lamports(&payer, &treasury, config.tier_price(new_tier))?;
        vault.tier = new_tier;
        self.accounts.store(vault_address, &vault)
    }

    fn rotate_wallet(&mut self, metas: &[AccountMeta], new_owner: Pubkey) -> Result<(), ProgramError> {
        let vault_address = key_at(metas, 0)?;
        let owner = key_at(metas, 1)?;
        let mut vault = self.owned_vault(&vault_address, &owner)?;
        vault.owner = new_owner;
        self.accounts.store(vault_address, &vault)
    }
}

fn token_error(error: TokenError) -> ProgramError {
    ProgramError::Other(error as u32)
}

fn create_token_account(accounts: &mut Accounts, metas: &[AccountMeta]) -> Result<(), ProgramError> {
    let address = key_at(metas, 1)?;
    let wallet = key_at(metas, 2)?;
    let mint = key_at(metas, 3)?;
    if token::associated_token_address(&wallet, &mint) != address {
        return Err(ProgramError::ConstraintSeeds);
    }
    if accounts.exists(&address) {
        return Err(ProgramError::AccountAlreadyInUse);
    }
    let account = TokenAccount {
        mint,
        owner: wallet,
        amount: 0,
    };
    accounts.data.insert(address, account.pack());
    Ok(())
}

fn transfer_tokens(accounts: &mut Accounts, metas: &[AccountMeta], data: &[u8]) -> Result<(), ProgramError> {
    let amount =
        token::unpack_transfer(data).ok_or(token_error(TokenError::InvalidInstruction))?;
    let source_address = key_at(metas, 0)?;
    let destination_address = key_at(metas, 1)?;
    let authority = key_at(metas, 2)?;

    let token_account = |address: &Pubkey| {
        accounts
            .data
            .get(address)
            .and_then(|data| TokenAccount::unpack(data).ok())
            .ok_or(ProgramError::AccountNotInitialized)
    };
    let mut source = token_account(&source_address)?;
    let mut destination = token_account(&destination_address)?;

    if source.owner != authority {
        return Err(token_error(TokenError::OwnerMismatch));
    }
    if source.mint != destination.mint {
        return Err(token_error(TokenError::MintMismatch));
    }
    if source.amount < amount {
        return Err(token_error(TokenError::InsufficientFunds));
    }
    source.amount -= amount;
    destination.amount += amount;
    accounts.data.insert(source_address, source.pack());
    accounts.data.insert(destination_address, destination.pack());
    Ok(())
}
