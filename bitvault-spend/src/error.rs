//! Standardized error handling for the spend engine
//!
//! Every failure is returned to the immediate caller with enough context
//! (input/output index, requested vs. available amounts) to diagnose it
//! without retrying. Nothing is retried or swallowed inside the engine.
//!
//! # Usage
//!
//! ```
//! use bitvault_spend::error::WalletError;
//!
//! fn check(available: u64, needed: u64) -> Result<(), WalletError> {
//!     if available < needed {
//!         return Err(WalletError::InsufficientFunds { needed, available });
//!     }
//!     Ok(())
//! }
//!
//! assert!(check(10, 20).is_err());
//! ```

use crate::validation::ValidationError;
use thiserror::Error;

/// The main error type for the spend engine
#[derive(Debug, Error)]
pub enum WalletError {
    /// Malformed or mismatched-network address, bad amount, overflow
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Coins cannot cover the target (or target plus fee)
    #[error("Insufficient funds: needed {needed}, available {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    /// Signing or derivation requested for an unrecognized family
    #[error("Unsupported address type: {0}")]
    UnsupportedFamily(String),

    /// Malformed transaction hex or hash
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Digest computation or signature production failed
    #[error("Signing input {input_index} failed: {reason}")]
    Signing { input_index: usize, reason: String },

    /// Raised by the chain backend and surfaced unchanged
    #[error("Network error: {0}")]
    Network(String),

    /// Private key decoding or key/network mismatch
    #[error("Key error: {0}")]
    Key(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),
}

impl WalletError {
    /// Build a signing error for the given input
    pub fn signing(input_index: usize, reason: impl Into<String>) -> Self {
        WalletError::Signing {
            input_index,
            reason: reason.into(),
        }
    }

    /// Whether this error was raised by the chain backend
    pub fn is_network(&self) -> bool {
        matches!(self, WalletError::Network(_))
    }
}

impl From<bitcoin::consensus::encode::Error> for WalletError {
    fn from(err: bitcoin::consensus::encode::Error) -> Self {
        WalletError::Encoding(format!("Transaction decoding failed: {}", err))
    }
}

impl From<hex::FromHexError> for WalletError {
    fn from(err: hex::FromHexError) -> Self {
        WalletError::Encoding(format!("Invalid hex: {}", err))
    }
}

impl From<reqwest::Error> for WalletError {
    fn from(err: reqwest::Error) -> Self {
        WalletError::Network(err.to_string())
    }
}

/// Convenience result alias used throughout the crate
pub type WalletResult<T> = Result<T, WalletError>;
