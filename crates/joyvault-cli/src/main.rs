#![deny(unsafe_code)]

mod commands;
mod config;
mod exit_code;
mod output;

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use solana_program::pubkey::Pubkey;
use tracing_subscriber::EnvFilter;

use joyvault_core::client::SessionError;
use joyvault_core::crypto::CryptoError;
use joyvault_core::protocol::CodecError;

use crate::commands::{decode, derive, tiers, validate};
use crate::config::Config;

/// Offline tooling for JoyVault Life Phrases and vault accounts
#[derive(Parser)]
#[command(name = "joyvault")]
#[command(author, version)]
#[command(propagate_version = true)]
#[command(after_help = "EXAMPLES:
    # Check a Life Phrase before using it
    joyvault validate

    # Show the vault and secret addresses a phrase maps to
    echo \"$PHRASE\" | joyvault --phrase-stdin derive --secrets 3

    # Decode a vault account fetched with `solana account --output json`
    joyvault decode vault --base64 \"$DATA\"

    # Tier table with prices from a config account dump
    joyvault tiers --config-file config.bin
")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Life Phrase (insecure, prefer --phrase-stdin or JOYVAULT_PHRASE)
    #[arg(long, env = "JOYVAULT_PHRASE", hide_env_values = true, global = true)]
    phrase: Option<String>,

    /// Read the Life Phrase from stdin (single line)
    #[arg(long, conflicts_with = "phrase", global = true)]
    phrase_stdin: bool,

    /// Configuration file (default: ~/.config/joyvault/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Program id, overriding the configuration file
    #[arg(long, value_name = "PUBKEY", global = true)]
    program_id: Option<Pubkey>,

    #[command(subcommand)]
    command: Commands,
}

/// Phrase options extracted from the CLI for commands that need one
#[derive(Clone, Default)]
pub struct PhraseOptions {
    pub phrase: Option<String>,
    pub phrase_stdin: bool,
}

impl From<&Cli> for PhraseOptions {
    fn from(cli: &Cli) -> Self {
        Self {
            phrase: cli.phrase.clone(),
            phrase_stdin: cli.phrase_stdin,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Check a Life Phrase against the strength requirements
    Validate(validate::Args),

    /// Derive the vault seed and program addresses for a Life Phrase
    Derive(derive::Args),

    /// Decode raw account data
    Decode(decode::Args),

    /// Show tier capacities and prices
    Tiers(tiers::Args),
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(exit_code::SUCCESS),
        Err(e) => {
            let code = categorize_error(&e);

            let args: Vec<String> = std::env::args().collect();
            let is_quiet = args.iter().any(|a| a == "-q" || a == "--quiet");

            if !is_quiet {
                eprintln!("Error: {e:#}");
            }

            ExitCode::from(code)
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if !cli.quiet {
        let verbosity = if cli.verbose > 0 {
            cli.verbose
        } else {
            config.defaults.verbosity.unwrap_or(0)
        };
        setup_tracing(verbosity);
    }

    let mut client = config.client.clone();
    if let Some(program_id) = cli.program_id {
        client.program_id = program_id;
    }

    let phrase_opts = PhraseOptions::from(&cli);

    match cli.command {
        Commands::Validate(args) => {
            let phrase = get_phrase(&phrase_opts)?;
            validate::execute(&args, &phrase)
        }
        Commands::Derive(args) => {
            let phrase = get_phrase(&phrase_opts)?;
            derive::execute(&args, &phrase, &client, &config.defaults)
        }
        Commands::Decode(args) => decode::execute(&args, &client),
        Commands::Tiers(args) => tiers::execute(&args, &client),
    }
}

fn setup_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .init();
}

/// Categorize an error into an exit code using typed error downcasting
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(crypto_err) = cause.downcast_ref::<CryptoError>() {
            return match crypto_err {
                CryptoError::EmptyPhrase | CryptoError::RateLimited { .. } => {
                    exit_code::AUTH_FAILED
                }
                _ => exit_code::GENERAL_ERROR,
            };
        }

        if cause.downcast_ref::<validate::WeakPhrase>().is_some() {
            return exit_code::AUTH_FAILED;
        }

        if cause.downcast_ref::<CodecError>().is_some() {
            return exit_code::VAULT_INVALID;
        }

        if cause.downcast_ref::<decode::InputError>().is_some() {
            return exit_code::USAGE_ERROR;
        }

        if let Some(io_err) = cause.downcast_ref::<io::Error>()
            && io_err.kind() == io::ErrorKind::Interrupted
        {
            return exit_code::CANCELLED;
        }
    }

    exit_code::GENERAL_ERROR
}

/// Unwrap session failures so the crypto cause stays downcastable.
pub(crate) fn session_error(e: SessionError) -> anyhow::Error {
    match e {
        SessionError::Crypto(inner) => inner.into(),
        other => other.into(),
    }
}

fn get_phrase(opts: &PhraseOptions) -> Result<String> {
    if opts.phrase_stdin {
        read_phrase_from_stdin()
    } else if let Some(ref phrase) = opts.phrase {
        Ok(phrase.clone())
    } else {
        prompt_phrase()
    }
}

/// Read the phrase from stdin (first line only)
fn read_phrase_from_stdin() -> Result<String> {
    if io::stdin().is_terminal() {
        bail!(
            "--phrase-stdin requires the phrase to be piped in.\n\
             Example: echo \"$PHRASE\" | joyvault --phrase-stdin derive"
        );
    }

    let mut phrase = String::new();
    io::stdin()
        .read_line(&mut phrase)
        .context("Failed to read phrase from stdin")?;

    let phrase = phrase.trim_end_matches('\n').trim_end_matches('\r');
    if phrase.trim().is_empty() {
        bail!(CryptoError::EmptyPhrase);
    }

    Ok(phrase.to_string())
}

/// Prompt for the Life Phrase without echoing it.
fn prompt_phrase() -> Result<String> {
    eprint!("Life Phrase: ");
    io::stderr().flush()?;

    let phrase = rpassword::read_password()?;
    if phrase.trim().is_empty() {
        bail!(CryptoError::EmptyPhrase);
    }

    Ok(phrase)
}
