//! Output resolution and input validation
//!
//! # Security Model
//!
//! Payment requests arrive from outside the engine and are treated as
//! untrusted. Every request is checked before a single input or output is
//! assembled:
//!
//! - the amount must be positive and at or above the dust threshold
//! - the address must decode and belong to the configured network
//! - the running total must not overflow
//!
//! Errors identify the offending request by index. The first violation wins
//! and no partial result is ever returned.

use crate::address::{decode_address_script, AddressError};
use crate::error::WalletError;
use crate::types::{PaymentRequest, ResolvedOutput, ResolvedOutputs, DUST_THRESHOLD};
use bitcoin::{Network, ScriptBuf};
use log::debug;
use thiserror::Error;

/// Errors raised while validating requests and amounts
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("No outputs requested")]
    NoOutputs,

    #[error("Output {index}: amount must be positive")]
    NonPositiveAmount { index: usize },

    #[error("Output {index}: invalid address: {reason}")]
    InvalidAddress { index: usize, reason: String },

    #[error("Output {index}: network mismatch: {reason}")]
    NetworkMismatch { index: usize, reason: String },

    #[error("Output {index}: amount {amount} is below the dust threshold of {minimum}")]
    DustOutput {
        index: usize,
        amount: u64,
        minimum: u64,
    },

    #[error("Output {index}: total amount overflows")]
    AmountOverflow { index: usize },

    #[error("Change amount is negative: {0}")]
    NegativeChange(i64),

    #[error("Sum of coin values overflows")]
    CoinValueOverflow,
}

impl ValidationError {
    /// Index of the offending output, when the error refers to one
    pub fn output_index(&self) -> Option<usize> {
        match self {
            ValidationError::NonPositiveAmount { index }
            | ValidationError::InvalidAddress { index, .. }
            | ValidationError::NetworkMismatch { index, .. }
            | ValidationError::DustOutput { index, .. }
            | ValidationError::AmountOverflow { index } => Some(*index),
            _ => None,
        }
    }
}

/// Validate an amount against the dust threshold
pub fn validate_amount(index: usize, amount: u64) -> Result<(), ValidationError> {
    if amount == 0 {
        return Err(ValidationError::NonPositiveAmount { index });
    }
    if amount < DUST_THRESHOLD {
        return Err(ValidationError::DustOutput {
            index,
            amount,
            minimum: DUST_THRESHOLD,
        });
    }
    Ok(())
}

/// Reject a negative change amount coming from a signed computation
pub fn validate_change(change: i64) -> Result<u64, ValidationError> {
    u64::try_from(change).map_err(|_| ValidationError::NegativeChange(change))
}

/// Decode the destination of output `index` into its locking script
pub fn resolve_destination(
    index: usize,
    address: &str,
    network: Network,
) -> Result<ScriptBuf, ValidationError> {
    decode_address_script(address, network).map_err(|e| match e {
        AddressError::WrongNetwork { .. } => ValidationError::NetworkMismatch {
            index,
            reason: e.to_string(),
        },
        AddressError::Empty | AddressError::Malformed(_) => ValidationError::InvalidAddress {
            index,
            reason: e.to_string(),
        },
    })
}

/// Turn payment requests into locking scripts and amounts
///
/// Requests are checked in order. For each one the amount must be positive,
/// the address must decode for `network`, and the amount must not be dust.
/// The running total is accumulated with overflow checking.
pub fn resolve_payment_outputs(
    requests: &[PaymentRequest],
    network: Network,
) -> Result<ResolvedOutputs, WalletError> {
    if requests.is_empty() {
        return Err(ValidationError::NoOutputs.into());
    }

    let mut outputs = Vec::with_capacity(requests.len());
    let mut total: u64 = 0;

    for (index, request) in requests.iter().enumerate() {
        if request.amount == 0 {
            return Err(ValidationError::NonPositiveAmount { index }.into());
        }

        let script_pubkey = resolve_destination(index, &request.address, network)?;

        validate_amount(index, request.amount)?;

        total = total
            .checked_add(request.amount)
            .ok_or(ValidationError::AmountOverflow { index })?;

        outputs.push(ResolvedOutput {
            script_pubkey,
            amount: request.amount,
        });
    }

    debug!(
        "Resolved {} payment outputs totalling {} sats",
        outputs.len(),
        total
    );

    Ok(ResolvedOutputs { outputs, total })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_bounds() {
        assert_eq!(
            validate_amount(3, 0),
            Err(ValidationError::NonPositiveAmount { index: 3 })
        );
        assert!(matches!(
            validate_amount(0, 545),
            Err(ValidationError::DustOutput { amount: 545, .. })
        ));
        assert!(validate_amount(0, 546).is_ok());
    }

    #[test]
    fn change_sign() {
        assert_eq!(validate_change(0), Ok(0));
        assert_eq!(validate_change(1336), Ok(1336));
        assert_eq!(validate_change(-1), Err(ValidationError::NegativeChange(-1)));
    }
}
