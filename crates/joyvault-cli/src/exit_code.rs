//! Exit codes for the CLI.
//!
//! These follow common Unix conventions and provide meaningful
//! status information for scripting and automation.

/// Successful execution
pub const SUCCESS: u8 = 0;

/// General/unspecified error
pub const GENERAL_ERROR: u8 = 1;

/// Command-line usage error (bad arguments, unreadable input)
pub const USAGE_ERROR: u8 = 2;

/// Life Phrase rejected (too weak, empty, rate limited)
pub const AUTH_FAILED: u8 = 3;

/// Account data could not be decoded
pub const VAULT_INVALID: u8 = 4;

/// Operation cancelled at a prompt
pub const CANCELLED: u8 = 8;
