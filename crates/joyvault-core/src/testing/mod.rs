//! In-memory stand-ins for the chain and the wallet.
//!
//! [`SimulatedLedger`] implements [`RpcClient`](crate::client::RpcClient) and
//! executes the vault program's instructions with the program's own checks,
//! so the client can be exercised end to end without a validator.
//! [`SimulatedWallet`] signs, cancels or rejects on a script.

mod ledger;
mod wallet;

pub use ledger::{Fault, SimulatedLedger};
pub use wallet::{SignBehavior, SimulatedWallet};

/// Tier prices in payment-token base units: free, 5, 20 and 50 tokens.
pub const DEFAULT_TIER_PRICES: [u64; 4] = [0, 5_000_000, 20_000_000, 50_000_000];

/// Lamports charged per added secret.
pub const DEFAULT_PRICE_PER_SECRET: u64 = 1_000_000;
