use comfy_table::Table;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;

use joyvault_core::protocol::token::{self, PAYMENT_DECIMALS};

/// Create a styled table for output
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);
    table
}

/// Format payment-token base units as a decimal amount
pub fn format_tokens(base_units: u64) -> String {
    token::format_amount(base_units, PAYMENT_DECIMALS)
}

/// Format lamports as SOL
pub fn format_sol(lamports: u64) -> String {
    token::format_amount(lamports, 9)
}
