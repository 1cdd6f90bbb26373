//! Error codes returned by the program and the runtime around it.

use std::fmt;

/// Custom codes start at 6000; lower codes come from the account framework
/// (2000-3999) and the system program (0-1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramError {
    VaultCapacityReached,
    SecretTooLarge,
    InvalidTierUpgrade,
    Unauthorized,
    /// `has_one` constraint failed: signer is not the recorded owner.
    ConstraintHasOne,
    /// Account is not at the address derived from its seeds.
    ConstraintSeeds,
    /// Account is not at the address recorded in config (treasury).
    ConstraintAddress,
    AccountNotSigner,
    AccountNotInitialized,
    /// Account to be created already exists.
    AccountAlreadyInUse,
    InsufficientLamports,
    Other(u32),
}

impl ProgramError {
    pub fn from_code(code: u32) -> Self {
        match code {
            6000 => ProgramError::VaultCapacityReached,
            6001 => ProgramError::SecretTooLarge,
            6002 => ProgramError::InvalidTierUpgrade,
            6003 => ProgramError::Unauthorized,
            2001 => ProgramError::ConstraintHasOne,
            2006 => ProgramError::ConstraintSeeds,
            2012 => ProgramError::ConstraintAddress,
            3010 => ProgramError::AccountNotSigner,
            3012 => ProgramError::AccountNotInitialized,
            0 => ProgramError::AccountAlreadyInUse,
            1 => ProgramError::InsufficientLamports,
            other => ProgramError::Other(other),
        }
    }

    pub fn code(self) -> u32 {
        match self {
            ProgramError::VaultCapacityReached => 6000,
            ProgramError::SecretTooLarge => 6001,
            ProgramError::InvalidTierUpgrade => 6002,
            ProgramError::Unauthorized => 6003,
            ProgramError::ConstraintHasOne => 2001,
            ProgramError::ConstraintSeeds => 2006,
            ProgramError::ConstraintAddress => 2012,
            ProgramError::AccountNotSigner => 3010,
            ProgramError::AccountNotInitialized => 3012,
            ProgramError::AccountAlreadyInUse => 0,
            ProgramError::InsufficientLamports => 1,
            ProgramError::Other(code) => code,
        }
    }

    /// Whether the program rejected the signer as not owning the vault.
    pub fn is_authorization(self) -> bool {
        matches!(
            self,
            ProgramError::Unauthorized | ProgramError::ConstraintHasOne | ProgramError::AccountNotSigner
        )
    }
}

impl fmt::Display for ProgramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ProgramError::VaultCapacityReached => "vault capacity reached",
            ProgramError::SecretTooLarge => "secret too large",
            ProgramError::InvalidTierUpgrade => "invalid tier upgrade",
            ProgramError::Unauthorized => "unauthorized",
            ProgramError::ConstraintHasOne => "has_one constraint violated",
            ProgramError::ConstraintSeeds => "seeds constraint violated",
            ProgramError::ConstraintAddress => "address constraint violated",
            ProgramError::AccountNotSigner => "account is not a signer",
            ProgramError::AccountNotInitialized => "account not initialized",
            ProgramError::AccountAlreadyInUse => "account already in use",
            ProgramError::InsufficientLamports => "insufficient lamports",
            ProgramError::Other(code) => return write!(f, "program error {code}"),
        };
        write!(f, "{msg} ({})", self.code())
    }
}
