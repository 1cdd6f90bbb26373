//! Derive command - show where a Life Phrase's vault lives on-chain.
//!
//! Runs the same key derivation as the wallet client and prints the vault
//! seed, the config and vault addresses, and the first few secret addresses.
//! The master key itself is never printed.
//!
//! # Examples
//!
//! ```bash
//! # Prompt for the phrase
//! joyvault derive
//!
//! # Salt with a wallet address and list five secret addresses
//! joyvault derive --context 7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU --secrets 5
//!
//! # JSON for scripting
//! echo "$PHRASE" | joyvault --phrase-stdin derive --json
//! ```

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use serde::Serialize;
use tracing::{debug, instrument};

use joyvault_core::crypto::{AttemptTracker, validate_strength};
use joyvault_core::{ClientConfig, Session};

use super::validate::WeakPhrase;
use crate::config::Defaults;
use crate::output::create_table;

/// Secret addresses listed when neither the flag nor the config says otherwise.
const DEFAULT_SECRETS: u32 = 3;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Salt context appended to the app salt (usually a wallet address)
    #[arg(long)]
    pub context: Option<String>,

    /// Number of secret addresses to list
    #[arg(long, value_name = "N")]
    pub secrets: Option<u32>,

    /// Derive even if the phrase fails the strength requirements
    #[arg(long)]
    pub allow_weak: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct Derivation {
    kdf: String,
    master_key_derived: bool,
    program_id: String,
    vault_seed: String,
    config_address: String,
    vault_address: String,
    vault_bump: u8,
    secrets: Vec<SecretSlot>,
}

#[derive(Serialize)]
struct SecretSlot {
    index: u32,
    address: String,
    bump: u8,
}

#[instrument(level = "info", name = "cmd::derive", skip_all, fields(kdf = %client.kdf))]
pub fn execute(args: &Args, phrase: &str, client: &ClientConfig, defaults: &Defaults) -> Result<()> {
    if !args.allow_weak {
        let report = validate_strength(phrase);
        if !report.valid {
            return Err(WeakPhrase {
                failed: report.errors.len(),
                score: report.score,
            })
            .context("Refusing to derive; pass --allow-weak to locate an existing vault");
        }
    }

    let mut session = Session::with_version(client.kdf);
    session
        .unlock(phrase, args.context.as_deref(), &mut AttemptTracker::new())
        .map_err(crate::session_error)?;
    let seed = session.vault_seed().map_err(crate::session_error)?;
    let master_key_derived = session.is_unlocked();
    session.lock();

    let addresses = client.addresses();
    let (vault_address, vault_bump) = addresses.vault_address_with_bump(&seed);
    let count = args.secrets.or(defaults.secrets).unwrap_or(DEFAULT_SECRETS);
    debug!(count, "Deriving secret addresses");

    let secrets: Vec<SecretSlot> = (0..count)
        .map(|index| {
            let (address, bump) = addresses.secret_address_with_bump(&vault_address, index);
            SecretSlot {
                index,
                address: address.to_string(),
                bump,
            }
        })
        .collect();

    let derivation = Derivation {
        kdf: client.kdf.to_string(),
        master_key_derived,
        program_id: addresses.program_id().to_string(),
        vault_seed: seed.to_string(),
        config_address: addresses.config_address().to_string(),
        vault_address: vault_address.to_string(),
        vault_bump,
        secrets,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&derivation)?);
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Property", "Value"]);
    table.add_row(vec!["KDF", &derivation.kdf]);
    table.add_row(vec![
        "Master Key",
        if derivation.master_key_derived {
            "derived (not shown)"
        } else {
            "not derived"
        },
    ]);
    table.add_row(vec!["Program", &derivation.program_id]);
    table.add_row(vec!["Vault Seed", &derivation.vault_seed]);
    table.add_row(vec!["Config", &derivation.config_address]);
    table.add_row(vec![
        "Vault".to_string(),
        format!("{} (bump {})", derivation.vault_address, derivation.vault_bump),
    ]);
    println!("{table}");

    if !derivation.secrets.is_empty() {
        let mut table = create_table();
        table.set_header(vec!["Index", "Secret Address", "Bump"]);
        for slot in &derivation.secrets {
            table.add_row(vec![
                slot.index.to_string(),
                slot.address.clone(),
                slot.bump.to_string(),
            ]);
        }
        println!("{table}");
    }

    Ok(())
}
