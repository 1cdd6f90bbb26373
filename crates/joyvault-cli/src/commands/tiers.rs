//! Tiers command - show tier capacities, and prices when a config dump is given.
//!
//! # Examples
//!
//! ```bash
//! joyvault tiers
//! joyvault tiers --config-file config.bin --json
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Args as ClapArgs;
use serde::Serialize;
use tracing::instrument;

use joyvault_core::ClientConfig;
use joyvault_core::protocol::VaultTier;
use joyvault_core::protocol::accounts::decode_config;

use super::decode::{InputError, TierPrice, tier_price};
use crate::output::{create_table, format_sol};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// GlobalConfig account data file, for prices and treasury
    #[arg(long, value_name = "PATH", conflicts_with = "config_base64")]
    pub config_file: Option<PathBuf>,

    /// GlobalConfig account data as base64
    #[arg(long, value_name = "DATA")]
    pub config_base64: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct TierTable {
    config_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    treasury_wallet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    price_per_secret_lamports: Option<u64>,
    tiers: Vec<TierRow>,
}

#[derive(Serialize)]
struct TierRow {
    tier: VaultTier,
    max_secrets: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    price: Option<TierPrice>,
}

fn config_data(args: &Args) -> Result<Option<Vec<u8>>, InputError> {
    use base64::Engine as _;

    if let Some(path) = &args.config_file {
        return std::fs::read(path)
            .map(Some)
            .map_err(|source| InputError::Read {
                path: path.clone(),
                source,
            });
    }
    match &args.config_base64 {
        Some(data) => Ok(Some(
            base64::engine::general_purpose::STANDARD.decode(data.trim())?,
        )),
        None => Ok(None),
    }
}

#[instrument(level = "info", name = "cmd::tiers", skip_all)]
pub fn execute(args: &Args, client: &ClientConfig) -> Result<()> {
    let config = match config_data(args)? {
        Some(data) => Some(decode_config(&data)?),
        None => None,
    };

    let tiers = VaultTier::ALL
        .iter()
        .map(|&tier| TierRow {
            tier,
            max_secrets: tier.max_secrets(),
            price: config.as_ref().map(|c| tier_price(c, tier)),
        })
        .collect();

    let table_data = TierTable {
        config_address: client.addresses().config_address().to_string(),
        treasury_wallet: config.as_ref().map(|c| c.treasury_wallet.to_string()),
        price_per_secret_lamports: config.as_ref().map(|c| c.price_per_secret_lamports),
        tiers,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&table_data)?);
        return Ok(());
    }

    let mut table = create_table();
    if config.is_some() {
        table.set_header(vec!["Tier", "Max Secrets", "Price"]);
    } else {
        table.set_header(vec!["Tier", "Max Secrets"]);
    }
    for row in &table_data.tiers {
        let mut cells = vec![row.tier.to_string(), row.max_secrets.to_string()];
        if let Some(price) = &row.price {
            cells.push(price.amount.clone());
        }
        table.add_row(cells);
    }
    println!("{table}");

    if let (Some(treasury), Some(lamports)) = (
        &table_data.treasury_wallet,
        table_data.price_per_secret_lamports,
    ) {
        println!("Treasury: {treasury}");
        println!("Per-secret fee: {} SOL", format_sol(lamports));
    }

    Ok(())
}
