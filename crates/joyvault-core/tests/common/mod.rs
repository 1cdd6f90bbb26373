#![allow(dead_code)]

use joyvault_core::client::{ClientConfig, VaultClient};
use joyvault_core::crypto::MasterKey;
use joyvault_core::protocol::DEVNET_USDC_MINT;
use joyvault_core::testing::{
    DEFAULT_PRICE_PER_SECRET, DEFAULT_TIER_PRICES, SimulatedLedger, SimulatedWallet,
};
use solana_program::pubkey::Pubkey;

pub type TestClient = VaultClient<SimulatedLedger, SimulatedWallet>;

/// Enough lamports for every fee and tier transfer in a test.
pub const STARTING_LAMPORTS: u64 = 10_000_000_000;

/// One deployed program, one user wallet, one treasury.
pub struct Harness {
    pub ledger: SimulatedLedger,
    pub wallet: SimulatedWallet,
    pub client: TestClient,
    pub admin: Pubkey,
    pub treasury: Pubkey,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Self {
        init_tracing();
        let ledger = SimulatedLedger::new(config.program_id);
        let admin = Pubkey::new_unique();
        let treasury = Pubkey::new_unique();
        ledger
            .initialize_config(&admin, &treasury, DEFAULT_PRICE_PER_SECRET, DEFAULT_TIER_PRICES)
            .unwrap();

        let wallet = SimulatedWallet::new();
        ledger.airdrop(&wallet.pubkey(), STARTING_LAMPORTS);
        let client = VaultClient::with_config(ledger.clone(), wallet.clone(), config);
        Self {
            ledger,
            wallet,
            client,
            admin,
            treasury,
        }
    }

    /// A second client on the same ledger driven by a different wallet.
    pub fn other_client(&self) -> (SimulatedWallet, TestClient) {
        let wallet = SimulatedWallet::new();
        self.ledger.airdrop(&wallet.pubkey(), STARTING_LAMPORTS);
        let client = VaultClient::with_config(
            self.ledger.clone(),
            wallet.clone(),
            self.client.config().clone(),
        );
        (wallet, client)
    }

    pub fn fund_tokens(&self, amount: u64) {
        self.ledger
            .mint_tokens(&DEVNET_USDC_MINT, &self.wallet.pubkey(), amount);
    }

    pub fn treasury_tokens(&self) -> u64 {
        self.ledger.token_balance(&DEVNET_USDC_MINT, &self.treasury)
    }
}

/// Deterministic master key; derivation is covered by the unit tests.
pub fn master_key(seed: u8) -> MasterKey {
    let mut bytes = [seed; 32];
    for (i, b) in bytes.iter_mut().enumerate() {
        *b = b.wrapping_add(i as u8);
    }
    MasterKey::from_bytes(bytes)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
