//! BitVault Spend Engine
//!
//! This crate assembles, funds and signs Bitcoin transactions for the BitVault
//! wallet. Given the wallet's key and a set of payment requests it selects
//! coins, negotiates fee and change, builds the transaction, signs every
//! input for the wallet's spending-condition family and hands back the
//! consensus-serialized hex ready for broadcast.
//!
//! # Modules
//!
//! - `types`: Coins, payment requests, fee decisions and spending families
//! - `error`: The `WalletError` taxonomy
//! - `validation`: Payment resolution and amount checks
//! - `math`: Virtual-size estimation
//! - `utxo_selection`: Coin selection strategies
//! - `fee_estimation`: Fee and change negotiation
//! - `context`: Immutable per-key wallet context
//! - `address`: Address decoding and locking-script derivation
//! - `builder`: Unsigned transaction assembly
//! - `signer`: Per-family signing strategies
//! - `codec`: Transaction hex encoding
//! - `chain`: Chain backend capability and Esplora client
//! - `wallet`: Send orchestration
//! - `config`: TOML configuration
//! - `logging`: Security-aware logging infrastructure
//!
//! # Security Considerations
//!
//! - Private keys are held only by `WalletContext` and never logged
//! - WIF strings are wrapped in a zeroizing `SensitiveString`
//! - A transaction is either signed on every input or not modified at all

/// Core domain types
pub mod types;

/// Error types
pub mod error;

/// Payment resolution and validation
pub mod validation;

/// Transaction size estimation
pub mod math;

/// Coin selection
pub mod utxo_selection;

/// Fee and change negotiation
pub mod fee_estimation;

/// Immutable wallet context
pub mod context;

/// Address handling
pub mod address;

/// Transaction assembly
pub mod builder;

/// Transaction signing
pub mod signer;

/// Transaction hex encoding
pub mod codec;

/// Chain data access
pub mod chain;

/// Send orchestration
pub mod wallet;

/// Configuration management
pub mod config;

/// Secure logging functionality
pub mod logging;

pub use bitcoin::{Network, Transaction, Txid};

pub use chain::{ChainBackend, EsploraClient, MockChainBackend};
pub use context::WalletContext;
pub use error::{WalletError, WalletResult};
pub use fee_estimation::{effective_fee_rate, solve_fee_and_change, FeeOutcome};
pub use math::{estimate_tx_vsize, DEFAULT_TX_VSIZE};
pub use signer::{SigningStrategy, TransactionSigner, UnlockingData};
pub use types::{
    AddressType, Coin, FeeDecision, PaymentRequest, ResolvedOutput, ResolvedOutputs,
    SensitiveString, DUST_THRESHOLD,
};
pub use utxo_selection::{CoinSelection, SelectionStrategy, SmallestFirst, UtxoSelector};
pub use validation::ValidationError;
pub use wallet::{PreparedTransaction, SpendingWallet};
