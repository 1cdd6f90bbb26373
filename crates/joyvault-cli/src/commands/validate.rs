//! Validate command - score a Life Phrase against the strength requirements.
//!
//! Exits with status 3 when the phrase fails a hard requirement, so it can
//! gate scripts.
//!
//! # Examples
//!
//! ```bash
//! # Prompt for the phrase and print a report
//! joyvault validate
//!
//! # Machine-readable report
//! echo "$PHRASE" | joyvault --phrase-stdin validate --json
//! ```

use anyhow::Result;
use clap::Args as ClapArgs;
use thiserror::Error;
use tracing::{info, instrument};

use joyvault_core::crypto::validate_strength;
use joyvault_core::crypto::strength::{MIN_CHARS, MIN_ENTROPY_BITS, MIN_WORDS};

use crate::output::create_table;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// The phrase failed at least one hard requirement.
#[derive(Error, Debug)]
#[error("Life Phrase is too weak ({failed} requirement(s) not met, score {score}/100)")]
pub struct WeakPhrase {
    pub failed: usize,
    pub score: u8,
}

#[instrument(level = "info", name = "cmd::validate", skip_all)]
pub fn execute(args: &Args, phrase: &str) -> Result<()> {
    let report = validate_strength(phrase);
    info!(score = report.score, valid = report.valid, "Phrase scored");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let mut table = create_table();
        table.set_header(vec!["Check", "Value", "Required"]);
        table.add_row(vec![
            "Characters".to_string(),
            report.chars.to_string(),
            format!("{MIN_CHARS}+"),
        ]);
        table.add_row(vec![
            "Words".to_string(),
            report.words.to_string(),
            format!("{MIN_WORDS}+"),
        ]);
        table.add_row(vec![
            "Entropy".to_string(),
            format!("{:.1} bits", report.entropy_bits),
            format!("{MIN_ENTROPY_BITS} bits"),
        ]);
        table.add_row(vec![
            "Score".to_string(),
            format!("{}/100 ({})", report.score, report.label),
            String::new(),
        ]);
        println!("{table}");

        for error in &report.errors {
            println!("  ✗ {error}");
        }
        for warning in &report.warnings {
            println!("  ! {warning}");
        }
        if report.valid {
            println!("Life Phrase meets all requirements");
        }
    }

    if !report.valid {
        return Err(WeakPhrase {
            failed: report.errors.len(),
            score: report.score,
        }
        .into());
    }

    Ok(())
}
