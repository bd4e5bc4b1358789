//! Coin selection
//!
//! The selector picks which of the wallet's coins fund a spend. Selection
//! algorithms implement [`SelectionStrategy`] and are driven by the
//! [`UtxoSelector`] context, so a different algorithm can be swapped in
//! without touching the callers.
//!
//! The default algorithm is [`SmallestFirst`]: it consumes coins in
//! ascending value order until the target is covered, which tends to
//! consolidate small coins.
//!
//! # Usage
//!
//! ```
//! use bitvault_spend::types::Coin;
//! use bitvault_spend::utxo_selection::UtxoSelector;
//!
//! let coins = vec![
//!     Coin::new("aa".repeat(32), 0, 5_000),
//!     Coin::new("bb".repeat(32), 1, 1_000),
//! ];
//!
//! let selection = UtxoSelector::new().select(&coins, 1_500).unwrap();
//! assert_eq!(selection.total, 6_000);
//! assert_eq!(selection.selected[0].value, 1_000);
//! ```

use crate::error::WalletError;
use crate::logging::{log_core, LogLevel};
use crate::types::Coin;
use crate::validation::ValidationError;
use log::{debug, warn};
use serde_json::json;

/// Coins chosen to fund a spend, together with their total value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinSelection {
    pub selected: Vec<Coin>,
    pub total: u64,
}

impl CoinSelection {
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

/// Trait defining a coin selection algorithm
pub trait SelectionStrategy: Send + Sync {
    /// Name of this strategy
    fn name(&self) -> &'static str;

    /// Select coins whose total value reaches `target`
    ///
    /// Fails with [`WalletError::InsufficientFunds`] when all coins together
    /// do not cover the target.
    fn select(&self, coins: &[Coin], target: u64) -> Result<CoinSelection, WalletError>;
}

/// Greedy smallest-value-first selection
///
/// The sort is stable, so coins of equal value keep their input order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmallestFirst;

impl SelectionStrategy for SmallestFirst {
    fn name(&self) -> &'static str {
        "smallest-first"
    }

    fn select(&self, coins: &[Coin], target: u64) -> Result<CoinSelection, WalletError> {
        let mut sorted: Vec<&Coin> = coins.iter().collect();
        sorted.sort_by_key(|coin| coin.value);

        let mut selected = Vec::new();
        let mut total: u64 = 0;

        for coin in sorted {
            total = total
                .checked_add(coin.value)
                .ok_or(ValidationError::CoinValueOverflow)?;
            selected.push(coin.clone());

            if total >= target {
                return Ok(CoinSelection { selected, total });
            }
        }

        Err(WalletError::InsufficientFunds {
            needed: target,
            available: total,
        })
    }
}

/// Context object that runs a selection strategy
pub struct UtxoSelector {
    strategy: Box<dyn SelectionStrategy>,
}

impl UtxoSelector {
    /// Create a selector using [`SmallestFirst`]
    pub fn new() -> Self {
        Self::with_strategy(Box::new(SmallestFirst))
    }

    pub fn with_strategy(strategy: Box<dyn SelectionStrategy>) -> Self {
        Self { strategy }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Select coins covering `target`
    pub fn select(&self, coins: &[Coin], target: u64) -> Result<CoinSelection, WalletError> {
        debug!(
            "Selecting coins for target {} sats from {} candidates using {}",
            target,
            coins.len(),
            self.strategy.name()
        );

        match self.strategy.select(coins, target) {
            Ok(selection) => {
                log_core(
                    LogLevel::Debug,
                    "coins_selected",
                    Some(json!({
                        "target": target,
                        "selected": selection.len(),
                        "total": selection.total,
                    })),
                );
                Ok(selection)
            }
            Err(e) => {
                warn!("Coin selection failed: {}", e);
                Err(e)
            }
        }
    }
}

impl Default for UtxoSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UtxoSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UtxoSelector")
            .field("strategy", &self.strategy.name())
            .finish()
    }
}
