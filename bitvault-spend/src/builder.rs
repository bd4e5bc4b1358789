//! Unsigned transaction assembly
//!
//! The builder turns funded coins and resolved outputs into an unsigned
//! [`Transaction`]: version 1, lock time 0, one input per coin with final
//! sequence and empty unlocking data, the payment outputs in request order
//! and, when the change is worth keeping, one change output back to the
//! wallet's own address.

use crate::address::wallet_locking_script;
use crate::context::WalletContext;
use crate::error::WalletError;
use crate::types::{AddressType, Coin, PaymentRequest, ResolvedOutput, DUST_THRESHOLD};
use crate::validation::{resolve_payment_outputs, validate_change, ValidationError};
use bitcoin::absolute::LockTime;
use bitcoin::{OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use log::{debug, warn};
use std::str::FromStr;

/// Transaction version used for every transaction the engine builds
pub const TX_VERSION: i32 = 1;

/// Build an unsigned transaction spending `coins` to `outputs`
///
/// A change output paying `change` to the wallet's own `family` address is
/// appended only when `change` is above the dust threshold. Spending no
/// coins at all is reported as insufficient funds.
pub fn build_transaction(
    ctx: &WalletContext,
    family: AddressType,
    coins: &[Coin],
    outputs: &[ResolvedOutput],
    change: u64,
) -> Result<Transaction, WalletError> {
    if outputs.is_empty() {
        return Err(ValidationError::NoOutputs.into());
    }
    if coins.is_empty() {
        return Err(WalletError::InsufficientFunds {
            needed: outputs
                .iter()
                .fold(0u64, |acc, output| acc.saturating_add(output.amount)),
            available: 0,
        });
    }

    let mut tx = unsigned_transaction(coins)?;

    tx.output.extend(outputs.iter().map(|output| TxOut {
        value: output.amount,
        script_pubkey: output.script_pubkey.clone(),
    }));

    if change > DUST_THRESHOLD {
        let change_script = wallet_locking_script(ctx, family)?;
        tx.output.push(TxOut {
            value: change,
            script_pubkey: change_script,
        });
        debug!("Added change output of {} sats to own {} address", change, family);
    }

    debug!(
        "Built transaction with {} inputs and {} outputs",
        tx.input.len(),
        tx.output.len()
    );
    Ok(tx)
}

/// Build an unsigned single-output transaction spending every coin
///
/// Used for sweeps: there is never a change output. An amount below dust
/// is built anyway, but logged.
pub fn build_sweep_transaction(
    coins: &[Coin],
    destination: ScriptBuf,
    amount: u64,
) -> Result<Transaction, WalletError> {
    if amount == 0 {
        return Err(ValidationError::NonPositiveAmount { index: 0 }.into());
    }
    if coins.is_empty() {
        return Err(WalletError::InsufficientFunds {
            needed: amount,
            available: 0,
        });
    }
    if amount < DUST_THRESHOLD {
        warn!(
            "Sweep amount {} sats is below the dust threshold of {}",
            amount, DUST_THRESHOLD
        );
    }

    let mut tx = unsigned_transaction(coins)?;
    tx.output.push(TxOut {
        value: amount,
        script_pubkey: destination,
    });
    Ok(tx)
}

/// Resolve a single payment and build with an explicit change amount
pub fn create_transaction(
    ctx: &WalletContext,
    family: AddressType,
    to_address: &str,
    amount: u64,
    coins: &[Coin],
    change: i64,
) -> Result<Transaction, WalletError> {
    create_transaction_with_outputs(
        ctx,
        family,
        coins,
        &[PaymentRequest::new(to_address, amount)],
        change,
    )
}

/// Resolve payments and build with an explicit change amount
pub fn create_transaction_with_outputs(
    ctx: &WalletContext,
    family: AddressType,
    coins: &[Coin],
    requests: &[PaymentRequest],
    change: i64,
) -> Result<Transaction, WalletError> {
    let resolved = resolve_payment_outputs(requests, ctx.network())?;
    let change = validate_change(change)?;
    build_transaction(ctx, family, coins, &resolved.outputs, change)
}

/// One input per coin, in the given order, and no outputs yet
fn unsigned_transaction(coins: &[Coin]) -> Result<Transaction, WalletError> {
    let input = coins
        .iter()
        .enumerate()
        .map(|(index, coin)| {
            Ok(TxIn {
                previous_output: OutPoint::new(parse_txid(index, &coin.txid)?, coin.vout),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            })
        })
        .collect::<Result<Vec<_>, WalletError>>()?;

    Ok(Transaction {
        version: TX_VERSION,
        lock_time: LockTime::ZERO,
        input,
        output: Vec::new(),
    })
}

fn parse_txid(index: usize, txid: &str) -> Result<Txid, WalletError> {
    if txid.trim().is_empty() {
        return Err(WalletError::Encoding(format!("Input {} has no txid", index)));
    }
    Txid::from_str(txid.trim())
        .map_err(|e| WalletError::Encoding(format!("Input {} has invalid txid: {}", index, e)))
}
