#![forbid(unsafe_code)]

pub mod client;
pub mod crypto;
pub mod error;
pub mod protocol;

#[cfg(feature = "testing")]
pub mod testing;

pub use client::{ClientConfig, Session, VaultClient};
pub use crypto::{MasterKey, VaultSeed};
pub use protocol::{ProgramAddresses, SecretType, VaultTier};
