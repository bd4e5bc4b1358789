//! Transaction size estimation
//!
//! Virtual sizes are estimated from the input/output counts and the
//! spending-condition family of the inputs. Estimates are deterministic and
//! are used both for fee computation and for the sweep amount.
//!
//! Example:
//! ```
//! use bitvault_spend::math::estimate_tx_vsize;
//! use bitvault_spend::types::AddressType;
//!
//! assert_eq!(estimate_tx_vsize(1, 1, AddressType::P2wpkh), 133);
//! assert_eq!(estimate_tx_vsize(1, 2, AddressType::P2pkh), 226);
//! ```

use crate::types::{AddressType, DUST_THRESHOLD};
use std::str::FromStr;

/// Size returned for a family name the estimator does not recognise
pub const DEFAULT_TX_VSIZE: u64 = 250;

/// Version, input/output counts and lock time
const TX_OVERHEAD: u64 = 10;

// Legacy P2PKH
const P2PKH_INPUT_SIZE: u64 = 148;
const P2PKH_OUTPUT_SIZE: u64 = 34;

// Non-witness bytes of a segwit input and output
const SEGWIT_INPUT_BASE: u64 = 64;
const SEGWIT_OUTPUT_SIZE: u64 = 31;

/// Marker and flag bytes
const SEGWIT_MARKER: u64 = 2;

/// Signature plus compressed public key with their length prefixes
const P2WPKH_WITNESS_SIZE: u64 = 107;

/// A single 64-byte Schnorr signature
const P2TR_WITNESS_SIZE: u64 = 64;

/// Determines if an amount is below the dust threshold
pub fn is_dust_amount(amount_sats: u64) -> bool {
    amount_sats < DUST_THRESHOLD
}

/// Calculates the transaction weight according to BIP141
///
/// Non-witness data counts as 4 weight units per byte and witness data as
/// 1 weight unit per byte.
pub fn calculate_tx_weight(non_witness_size: u64, witness_size: u64) -> u64 {
    non_witness_size
        .saturating_mul(4)
        .saturating_add(witness_size)
}

/// Converts transaction weight to virtual size, rounding up
pub fn weight_to_vsize(weight: u64) -> u64 {
    weight.saturating_add(3) / 4
}

/// Estimated virtual size in vbytes of a transaction with `inputs` inputs of
/// the given family and `outputs` outputs
pub fn estimate_tx_vsize(inputs: usize, outputs: usize, family: AddressType) -> u64 {
    let n = inputs as u64;
    let m = outputs as u64;

    match family {
        AddressType::P2pkh => TX_OVERHEAD + P2PKH_INPUT_SIZE * n + P2PKH_OUTPUT_SIZE * m,
        AddressType::P2wpkh | AddressType::P2shP2wpkh => {
            segwit_vsize(n, m, P2WPKH_WITNESS_SIZE)
        }
        AddressType::P2tr => segwit_vsize(n, m, P2TR_WITNESS_SIZE),
    }
}

/// Like [`estimate_tx_vsize`], but takes the family by name
///
/// Unknown names fall back to [`DEFAULT_TX_VSIZE`].
pub fn estimate_tx_vsize_by_name(inputs: usize, outputs: usize, family: &str) -> u64 {
    match AddressType::from_str(family) {
        Ok(family) => estimate_tx_vsize(inputs, outputs, family),
        Err(_) => DEFAULT_TX_VSIZE,
    }
}

/// Fee in satoshis for a virtual size at a rate in sat/vbyte
pub fn calculate_fee(vsize: u64, fee_rate: u64) -> u64 {
    vsize.saturating_mul(fee_rate)
}

fn segwit_vsize(inputs: u64, outputs: u64, witness_per_input: u64) -> u64 {
    let base = TX_OVERHEAD + SEGWIT_INPUT_BASE * inputs + SEGWIT_OUTPUT_SIZE * outputs;
    let witness = witness_per_input * inputs + SEGWIT_MARKER;
    weight_to_vsize(calculate_tx_weight(base, witness))
}
