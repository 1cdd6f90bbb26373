//! Error types for the joyvault-core crate
//!
//! Each concern owns its error enum; this module gathers them in one place.

// Re-export error types from submodules
pub use crate::client::VaultClientError;
pub use crate::client::payment::PaymentError;
pub use crate::client::session::SessionError;
pub use crate::client::transport::{RpcError, SignerError, SubmitError, TransactionFailure};
pub use crate::crypto::CryptoError;
pub use crate::crypto::strength::StrengthError;
pub use crate::protocol::{CodecError, ProgramError};
