//! Send orchestration
//!
//! [`SpendingWallet`] ties the engine together: it resolves payments, fetches
//! the wallet's coins from a [`ChainBackend`], negotiates fee and change,
//! builds and signs the transaction, and submits it.
//!
//! # Funding loop
//!
//! Coins are selected for the requested total first. When the fee pushes the
//! spend over what the selected coins hold, the target is raised to
//! `requested + fee` and selection runs again. The loop is bounded by
//! `max_reselection_rounds` and stops early if the target stops growing, so
//! it always terminates.
//!
//! # Concurrency
//!
//! Every call works on its own coin snapshot. Nothing is reserved between
//! calls, so two concurrent sends from the same wallet may pick the same
//! coins; coordinating that is up to the caller.

use crate::address::derive_locking_script_and_address;
use crate::builder::{build_sweep_transaction, build_transaction};
use crate::chain::{ChainBackend, EsploraClient};
use crate::codec::{decode_transaction_hex, encode_transaction_hex};
use crate::config::Config;
use crate::context::WalletContext;
use crate::error::{WalletError, WalletResult};
use crate::fee_estimation::{estimate_fee, solve_fee_and_change, FeeOutcome};
use crate::logging::{log_network, log_transaction, LogLevel};
use crate::signer::TransactionSigner;
use crate::types::{
    total_coin_value, AddressType, Coin, FeeDecision, PaymentRequest, ResolvedOutputs,
    SensitiveString,
};
use crate::utxo_selection::UtxoSelector;
use crate::validation::{resolve_destination, resolve_payment_outputs, ValidationError};
use bitcoin::{Transaction, Txid};
use log::{debug, info, warn};
use serde_json::json;
use std::time::Duration;

/// Default bound on select/solve rounds
pub const DEFAULT_MAX_RESELECTION_ROUNDS: u32 = 16;

/// A funded and signed transaction that has not been submitted yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTransaction {
    pub transaction: Transaction,
    /// Coins spent, in input order
    pub selected: Vec<Coin>,
    pub fee: u64,
    /// Zero when there is no change output
    pub change: u64,
}

impl PreparedTransaction {
    pub fn txid(&self) -> Txid {
        self.transaction.txid()
    }

    pub fn to_hex(&self) -> String {
        encode_transaction_hex(&self.transaction)
    }
}

/// Builds, signs and submits transactions for one key
pub struct SpendingWallet<B: ChainBackend> {
    ctx: WalletContext,
    backend: B,
    selector: UtxoSelector,
    max_reselection_rounds: u32,
    default_address_type: AddressType,
}

impl SpendingWallet<EsploraClient> {
    /// Build a wallet talking to Esplora from a validated configuration
    pub fn from_config(config: &Config, wif: &SensitiveString) -> WalletResult<Self> {
        config
            .validate()
            .map_err(|e| WalletError::Config(e.to_string()))?;

        let network = config
            .network()
            .map_err(|e| WalletError::Config(e.to_string()))?;
        let address_type = config
            .address_type()
            .map_err(|e| WalletError::Config(e.to_string()))?;

        let ctx = WalletContext::from_wif(wif, network, config.wallet.fee_rate)?;
        let backend = EsploraClient::for_network(
            network,
            config.chain.api_url.as_deref(),
            Duration::from_secs(config.chain.timeout_seconds),
        )?;

        Ok(SpendingWallet::new(ctx, backend)
            .with_max_reselection_rounds(config.wallet.max_reselection_rounds)
            .with_default_address_type(address_type))
    }
}

impl<B: ChainBackend> SpendingWallet<B> {
    pub fn new(ctx: WalletContext, backend: B) -> Self {
        Self {
            ctx,
            backend,
            selector: UtxoSelector::new(),
            max_reselection_rounds: DEFAULT_MAX_RESELECTION_ROUNDS,
            default_address_type: AddressType::P2wpkh,
        }
    }

    /// Bound the funding loop; zero is treated as one round
    pub fn with_max_reselection_rounds(mut self, rounds: u32) -> Self {
        self.max_reselection_rounds = rounds.max(1);
        self
    }

    pub fn with_selector(mut self, selector: UtxoSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_default_address_type(mut self, family: AddressType) -> Self {
        self.default_address_type = family;
        self
    }

    pub fn context(&self) -> &WalletContext {
        &self.ctx
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Family configured for this wallet's own coins
    pub fn default_address_type(&self) -> AddressType {
        self.default_address_type
    }

    /// The wallet's own address for a family
    pub fn address(&self, family: AddressType) -> WalletResult<String> {
        derive_locking_script_and_address(&self.ctx, family).map(|(_, address)| address)
    }

    /// Confirmed balance of the wallet's own address for a family
    pub fn balance(&self, family: AddressType) -> WalletResult<u64> {
        let address = self.address(family)?;
        self.backend.fetch_balance(&address)
    }

    /// Raw hex of any transaction known to the backend
    pub fn transaction_hex(&self, txid: &str) -> WalletResult<String> {
        self.backend.fetch_transaction_hex(txid)
    }

    /// Fund, build and sign a payment to several destinations
    pub fn prepare_send_many(
        &self,
        family: AddressType,
        requests: &[PaymentRequest],
    ) -> WalletResult<PreparedTransaction> {
        let resolved = resolve_payment_outputs(requests, self.ctx.network())?;
        let coins = self.fetch_coins(family)?;

        if coins.is_empty() {
            return Err(WalletError::InsufficientFunds {
                needed: resolved.total,
                available: 0,
            });
        }

        let (selected, decision) = self.fund(family, &coins, &resolved)?;

        let mut transaction =
            build_transaction(&self.ctx, family, &selected, &resolved.outputs, decision.change)?;
        TransactionSigner::new(&self.ctx).sign(&mut transaction, family, &selected)?;

        log_transaction(
            LogLevel::Info,
            "transaction_prepared",
            Some(json!({
                "txid": transaction.txid().to_string(),
                "inputs": selected.len(),
                "outputs": transaction.output.len(),
                "fee": decision.fee,
                "change": decision.change,
            })),
        );

        Ok(PreparedTransaction {
            transaction,
            selected,
            fee: decision.fee,
            change: decision.change,
        })
    }

    /// Pay several destinations and return the txid reported by the backend
    pub fn send_many(
        &self,
        family: AddressType,
        requests: &[PaymentRequest],
    ) -> WalletResult<String> {
        let prepared = self.prepare_send_many(family, requests)?;
        self.submit(&prepared)
    }

    /// Pay a single destination
    pub fn send(
        &self,
        family: AddressType,
        to_address: &str,
        amount: u64,
    ) -> WalletResult<String> {
        self.send_many(family, &[PaymentRequest::new(to_address, amount)])
    }

    /// Build and sign a sweep of every coin to one destination
    ///
    /// The destination receives the total minus the fee for an
    /// all-inputs, single-output transaction. There is no change output.
    pub fn prepare_send_all(
        &self,
        family: AddressType,
        to_address: &str,
    ) -> WalletResult<PreparedTransaction> {
        let destination = resolve_destination(0, to_address, self.ctx.network())?;
        let coins = self.fetch_coins(family)?;

        if coins.is_empty() {
            return Err(WalletError::InsufficientFunds {
                needed: 1,
                available: 0,
            });
        }

        let total = total_coin_value(&coins).ok_or(ValidationError::CoinValueOverflow)?;
        let fee = estimate_fee(coins.len(), 1, family, self.ctx.fee_rate());
        if total <= fee {
            return Err(WalletError::InsufficientFunds {
                needed: fee,
                available: total,
            });
        }
        let amount = total - fee;

        let mut transaction = build_sweep_transaction(&coins, destination, amount)?;
        TransactionSigner::new(&self.ctx).sign(&mut transaction, family, &coins)?;

        log_transaction(
            LogLevel::Info,
            "sweep_prepared",
            Some(json!({
                "txid": transaction.txid().to_string(),
                "inputs": coins.len(),
                "amount": amount,
                "fee": fee,
            })),
        );

        Ok(PreparedTransaction {
            transaction,
            selected: coins,
            fee,
            change: 0,
        })
    }

    /// Sweep every coin of a family to one destination
    pub fn send_all(&self, family: AddressType, to_address: &str) -> WalletResult<String> {
        let prepared = self.prepare_send_all(family, to_address)?;
        self.submit(&prepared)
    }

    /// Sign an externally built transaction spending `coins` in input order
    pub fn sign_raw_transaction(
        &self,
        tx_hex: &str,
        family: AddressType,
        coins: &[Coin],
    ) -> WalletResult<String> {
        let mut transaction = decode_transaction_hex(tx_hex)?;
        TransactionSigner::new(&self.ctx).sign(&mut transaction, family, coins)?;
        Ok(encode_transaction_hex(&transaction))
    }

    /// Unsigned hex paying one destination from caller-supplied coins
    pub fn create_raw_transaction(
        &self,
        family: AddressType,
        to_address: &str,
        amount: u64,
        coins: &[Coin],
    ) -> WalletResult<String> {
        self.create_raw_transaction_with_outputs(
            family,
            &[PaymentRequest::new(to_address, amount)],
            coins,
        )
    }

    /// Unsigned hex paying several destinations from caller-supplied coins
    ///
    /// Every coin is spent; fee and change are negotiated as for a send.
    pub fn create_raw_transaction_with_outputs(
        &self,
        family: AddressType,
        requests: &[PaymentRequest],
        coins: &[Coin],
    ) -> WalletResult<String> {
        let resolved = resolve_payment_outputs(requests, self.ctx.network())?;

        if coins.is_empty() {
            return Err(WalletError::InsufficientFunds {
                needed: resolved.total,
                available: 0,
            });
        }

        let total = total_coin_value(coins).ok_or(ValidationError::CoinValueOverflow)?;
        let decision = match solve_fee_and_change(
            coins.len(),
            total,
            resolved.total,
            resolved.len(),
            family,
            self.ctx.fee_rate(),
        ) {
            FeeOutcome::Settled(decision) => decision,
            FeeOutcome::Shortfall { fee, .. } => {
                return Err(WalletError::InsufficientFunds {
                    needed: resolved.total.saturating_add(fee),
                    available: total,
                })
            }
        };

        let transaction =
            build_transaction(&self.ctx, family, coins, &resolved.outputs, decision.change)?;
        Ok(encode_transaction_hex(&transaction))
    }

    fn fetch_coins(&self, family: AddressType) -> WalletResult<Vec<Coin>> {
        let address = self.address(family)?;
        let coins = self.backend.fetch_spendable_coins(&address)?;
        log_network(
            LogLevel::Debug,
            "coins_fetched",
            Some(json!({ "address": address, "count": coins.len() })),
        );
        Ok(coins)
    }

    /// Select and solve until the fee is covered or the bound is reached
    fn fund(
        &self,
        family: AddressType,
        coins: &[Coin],
        resolved: &ResolvedOutputs,
    ) -> WalletResult<(Vec<Coin>, FeeDecision)> {
        let mut target = resolved.total;

        for round in 1..=self.max_reselection_rounds {
            let selection = self.selector.select(coins, target)?;

            match solve_fee_and_change(
                selection.len(),
                selection.total,
                resolved.total,
                resolved.len(),
                family,
                self.ctx.fee_rate(),
            ) {
                FeeOutcome::Settled(decision) => {
                    debug!(
                        "Funding settled in round {} with {} coins",
                        round,
                        selection.len()
                    );
                    return Ok((selection.selected, decision));
                }
                FeeOutcome::Shortfall { fee, missing } => {
                    let next = resolved
                        .total
                        .checked_add(fee)
                        .ok_or(ValidationError::CoinValueOverflow)?;
                    debug!(
                        "Round {}: {} coins are {} sats short, raising target to {}",
                        round,
                        selection.len(),
                        missing,
                        next
                    );
                    if next <= target {
                        return Err(WalletError::InsufficientFunds {
                            needed: next,
                            available: selection.total,
                        });
                    }
                    target = next;
                }
            }
        }

        warn!(
            "Funding did not settle within {} rounds",
            self.max_reselection_rounds
        );
        Err(WalletError::InsufficientFunds {
            needed: target,
            available: total_coin_value(coins).unwrap_or(u64::MAX),
        })
    }

    fn submit(&self, prepared: &PreparedTransaction) -> WalletResult<String> {
        let tx_hex = prepared.to_hex();
        let txid = self.backend.submit_transaction(&tx_hex)?;
        info!("Submitted transaction with {} inputs", prepared.selected.len());
        log_network(
            LogLevel::Info,
            "transaction_submitted",
            Some(json!({ "txid": txid })),
        );
        Ok(txid)
    }
}
