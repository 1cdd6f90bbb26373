//! Decode command - print the fields of raw account data.
//!
//! Accepts the bytes as base64 (what `solana account --output json` emits),
//! hex, or a binary file dump. Discriminator mismatches and truncated data
//! exit with status 4.
//!
//! # Examples
//!
//! ```bash
//! joyvault decode vault --base64 "0wjoKwKYdXc..."
//! joyvault decode secret --file secret.bin --json
//! joyvault decode token --hex "..."
//! ```

use std::path::PathBuf;

use anyhow::Result;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use clap::{Args as ClapArgs, ValueEnum};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

use joyvault_core::ClientConfig;
use joyvault_core::crypto::VaultSeed;
use joyvault_core::protocol::accounts::{decode_config, decode_secret, decode_vault};
use joyvault_core::protocol::token::TokenAccount;
use joyvault_core::protocol::{GlobalConfig, VaultTier};

use crate::output::{create_table, format_sol, format_tokens};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccountKind {
    /// A user's vault (owner, tier, secret count)
    Vault,
    /// One encrypted secret
    Secret,
    /// The program-wide GlobalConfig
    Config,
    /// An SPL token account
    Token,
}

#[derive(ClapArgs, Clone)]
#[command(group(
    clap::ArgGroup::new("input")
        .required(true)
        .args(["base64", "hex", "file"]),
))]
pub struct Args {
    /// Account type to decode as
    #[arg(value_enum)]
    pub kind: AccountKind,

    /// Account data as base64
    #[arg(long, value_name = "DATA")]
    pub base64: Option<String>,

    /// Account data as hex
    #[arg(long, value_name = "DATA")]
    pub hex: Option<String>,

    /// Read raw account data from a file
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// The account bytes could not be obtained from the given input.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Invalid base64 account data: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Invalid hex account data: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No account data given")]
    Missing,
}

impl Args {
    /// Raw bytes from whichever input was given.
    pub fn account_data(&self) -> Result<Vec<u8>, InputError> {
        if let Some(data) = &self.base64 {
            return Ok(STANDARD.decode(data.trim())?);
        }
        if let Some(data) = &self.hex {
            let data = data.trim();
            return Ok(hex::decode(data.strip_prefix("0x").unwrap_or(data))?);
        }
        if let Some(path) = &self.file {
            return std::fs::read(path).map_err(|source| InputError::Read {
                path: path.clone(),
                source,
            });
        }
        Err(InputError::Missing)
    }
}

#[derive(Serialize)]
struct VaultView {
    address: String,
    owner: String,
    vault_seed: String,
    tier: VaultTier,
    secret_count: u32,
    max_secrets: u32,
    bump: u8,
}

#[derive(Serialize)]
struct SecretView {
    vault: String,
    secret_type: String,
    ciphertext_len: usize,
    nonce: String,
    created_at: i64,
    bump: u8,
}

#[derive(Serialize)]
struct ConfigView {
    admin: String,
    treasury_wallet: String,
    price_per_secret_lamports: u64,
    tier_prices: Vec<TierPrice>,
    bump: u8,
}

#[derive(Serialize)]
pub(crate) struct TierPrice {
    pub tier: VaultTier,
    pub base_units: u64,
    pub amount: String,
}

pub(crate) fn tier_price(config: &GlobalConfig, tier: VaultTier) -> TierPrice {
    let base_units = config.tier_price(tier);
    TierPrice {
        tier,
        base_units,
        amount: format_tokens(base_units),
    }
}

#[derive(Serialize)]
struct TokenView {
    mint: String,
    owner: String,
    amount: u64,
    ui_amount: String,
}

#[instrument(level = "info", name = "cmd::decode", skip_all, fields(kind = ?args.kind))]
pub fn execute(args: &Args, client: &ClientConfig) -> Result<()> {
    let data = args.account_data()?;
    debug!(len = data.len(), "Decoding account data");

    match args.kind {
        AccountKind::Vault => show_vault(&data, client, args.json),
        AccountKind::Secret => show_secret(&data, args.json),
        AccountKind::Config => show_config(&data, args.json),
        AccountKind::Token => show_token(&data, args.json),
    }
}

fn show_vault(data: &[u8], client: &ClientConfig, json: bool) -> Result<()> {
    let vault = decode_vault(data)?;
    let seed = VaultSeed::new(vault.vault_seed);
    let view = VaultView {
        address: client.addresses().vault_address(&seed).to_string(),
        owner: vault.owner.to_string(),
        vault_seed: seed.to_string(),
        tier: vault.tier,
        secret_count: vault.secret_count,
        max_secrets: vault.max_secrets(),
        bump: vault.bump,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["Address", &view.address]);
    table.add_row(vec!["Owner", &view.owner]);
    table.add_row(vec!["Vault Seed", &view.vault_seed]);
    table.add_row(vec!["Tier".to_string(), view.tier.to_string()]);
    table.add_row(vec![
        "Secrets".to_string(),
        format!("{}/{}", view.secret_count, view.max_secrets),
    ]);
    table.add_row(vec!["Bump".to_string(), view.bump.to_string()]);
    println!("{table}");
    Ok(())
}

fn show_secret(data: &[u8], json: bool) -> Result<()> {
    let secret = decode_secret(data)?;
    let view = SecretView {
        vault: secret.vault.to_string(),
        secret_type: secret.secret_type.to_string(),
        ciphertext_len: secret.ciphertext.len(),
        nonce: hex::encode(secret.nonce),
        created_at: secret.created_at,
        bump: secret.bump,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["Vault", &view.vault]);
    table.add_row(vec!["Type", &view.secret_type]);
    table.add_row(vec![
        "Ciphertext".to_string(),
        format!("{} bytes", view.ciphertext_len),
    ]);
    table.add_row(vec!["Nonce", &view.nonce]);
    table.add_row(vec!["Created (unix)".to_string(), view.created_at.to_string()]);
    table.add_row(vec!["Bump".to_string(), view.bump.to_string()]);
    println!("{table}");
    Ok(())
}

fn show_config(data: &[u8], json: bool) -> Result<()> {
    let config = decode_config(data)?;
    let view = ConfigView {
        admin: config.admin.to_string(),
        treasury_wallet: config.treasury_wallet.to_string(),
        price_per_secret_lamports: config.price_per_secret_lamports,
        tier_prices: VaultTier::ALL
            .iter()
            .map(|&tier| tier_price(&config, tier))
            .collect(),
        bump: config.bump,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["Admin", &view.admin]);
    table.add_row(vec!["Treasury", &view.treasury_wallet]);
    table.add_row(vec![
        "Price per Secret".to_string(),
        format!("{} SOL", format_sol(view.price_per_secret_lamports)),
    ]);
    for price in &view.tier_prices {
        table.add_row(vec![format!("{} Price", price.tier), price.amount.clone()]);
    }
    table.add_row(vec!["Bump".to_string(), view.bump.to_string()]);
    println!("{table}");
    Ok(())
}

fn show_token(data: &[u8], json: bool) -> Result<()> {
    let account = TokenAccount::unpack(data)?;
    let view = TokenView {
        mint: account.mint.to_string(),
        owner: account.owner.to_string(),
        amount: account.amount,
        ui_amount: format_tokens(account.amount),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["Mint", &view.mint]);
    table.add_row(vec!["Owner", &view.owner]);
    table.add_row(vec![
        "Amount".to_string(),
        format!("{} ({} base units)", view.ui_amount, view.amount),
    ]);
    println!("{table}");
    Ok(())
}
