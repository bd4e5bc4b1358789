//! Fee and change negotiation
//!
//! Given a set of selected coins and the total requested by the payment
//! outputs, this module decides the fee and whether a change output is worth
//! creating. It does not reselect coins itself. A [`FeeOutcome::Shortfall`]
//! tells the caller how much more it needs so the caller can select again.
//!
//! # Change policy
//!
//! A change output is only created when the change left over after paying
//! for the larger (with-change) transaction is strictly greater than the
//! dust threshold. Otherwise the whole surplus is given to the miner, so a
//! change of exactly the dust threshold is folded into the fee.

use crate::logging::{log_core, LogLevel};
use crate::math::{calculate_fee, estimate_tx_vsize};
use crate::types::{AddressType, FeeDecision, DUST_THRESHOLD};
use log::debug;
use serde_json::json;

/// Lowest fee-rate the engine will ever use, in sat/vbyte
pub const MIN_FEE_RATE: u64 = 1;

/// Result of negotiating fee and change for a set of coins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeOutcome {
    /// The coins cover outputs plus fee
    Settled(FeeDecision),

    /// The coins fall `missing` sats short of outputs plus the no-change fee
    Shortfall { fee: u64, missing: u64 },
}

impl FeeOutcome {
    pub fn is_settled(&self) -> bool {
        matches!(self, FeeOutcome::Settled(_))
    }
}

/// Apply the fee-rate floor to a configured value
///
/// Anything at or below zero becomes [`MIN_FEE_RATE`].
pub fn effective_fee_rate(configured: i64) -> u64 {
    if configured <= 0 {
        MIN_FEE_RATE
    } else {
        configured as u64
    }
}

/// Fee for a transaction shape at the given rate
pub fn estimate_fee(inputs: usize, outputs: usize, family: AddressType, fee_rate: u64) -> u64 {
    calculate_fee(estimate_tx_vsize(inputs, outputs, family), fee_rate)
}

/// Decide fee and change for the selected coins
///
/// # Arguments
/// * `coin_count` - Number of selected coins (transaction inputs)
/// * `coin_total` - Total value of the selected coins
/// * `requested` - Sum of the payment outputs
/// * `output_count` - Number of payment outputs, excluding change
/// * `family` - Spending-condition family of the inputs
/// * `fee_rate` - Effective fee-rate in sat/vbyte
pub fn solve_fee_and_change(
    coin_count: usize,
    coin_total: u64,
    requested: u64,
    output_count: usize,
    family: AddressType,
    fee_rate: u64,
) -> FeeOutcome {
    if coin_count == 0 {
        return FeeOutcome::Shortfall {
            fee: 0,
            missing: requested,
        };
    }

    let value = coin_total as i128;
    let requested_wide = requested as i128;

    let fee_no_change = estimate_fee(coin_count, output_count, family, fee_rate);
    let needed = requested_wide + fee_no_change as i128;
    if value < needed {
        let missing = u64::try_from(needed - value).unwrap_or(u64::MAX);
        debug!(
            "Coins worth {} sats are {} short of {} + fee {}",
            coin_total, missing, requested, fee_no_change
        );
        return FeeOutcome::Shortfall {
            fee: fee_no_change,
            missing,
        };
    }

    let fee_with_change = estimate_fee(coin_count, output_count + 1, family, fee_rate);
    let change_with_change = value - requested_wide - fee_with_change as i128;

    let decision = if change_with_change > DUST_THRESHOLD as i128 {
        FeeDecision {
            fee: fee_with_change,
            change: change_with_change as u64,
        }
    } else {
        // value >= needed, so the surplus fits in u64
        FeeDecision {
            fee: (value - requested_wide) as u64,
            change: 0,
        }
    };

    log_core(
        LogLevel::Debug,
        "fee_settled",
        Some(json!({
            "inputs": coin_count,
            "fee": decision.fee,
            "change": decision.change,
            "change_output": decision.has_change_output(),
        })),
    );

    FeeOutcome::Settled(decision)
}
