//! Chain data access
//!
//! The engine reaches the Bitcoin network only through [`ChainBackend`]:
//! listing the wallet's spendable coins, submitting signed transactions and
//! a few read-only lookups. [`EsploraClient`] talks to an Esplora REST API
//! (as run by blockstream.info); [`MockChainBackend`] serves canned data in
//! tests.
//!
//! Backend errors are surfaced unchanged as [`WalletError::Network`]. No call
//! is retried.

use crate::codec::decode_transaction_hex;
use crate::error::WalletError;
use crate::types::Coin;
use bitcoin::Network;
use log::{debug, info};
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Default request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Network access needed by the wallet
pub trait ChainBackend {
    /// Unspent outputs currently locked to `address`
    fn fetch_spendable_coins(&self, address: &str) -> Result<Vec<Coin>, WalletError>;

    /// Submit a hex-encoded transaction and return its txid
    fn submit_transaction(&self, tx_hex: &str) -> Result<String, WalletError>;

    /// Confirmed balance of `address` in satoshis
    fn fetch_balance(&self, address: &str) -> Result<u64, WalletError>;

    /// Raw hex of a transaction by id
    fn fetch_transaction_hex(&self, txid: &str) -> Result<String, WalletError>;
}

/// Esplora REST client
#[derive(Debug, Clone)]
pub struct EsploraClient {
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct AddressStats {
    funded_txo_sum: u64,
    spent_txo_sum: u64,
}

#[derive(Debug, Deserialize)]
struct AddressInfo {
    chain_stats: AddressStats,
}

impl EsploraClient {
    /// Create a client for an explicit base URL
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, WalletError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(WalletError::Config("Esplora base URL is empty".to_string()));
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    /// Create a client for a network, using `api_url` when given
    pub fn for_network(
        network: Network,
        api_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, WalletError> {
        let base_url = match api_url {
            Some(url) => url.to_string(),
            None => Self::default_base_url(network)
                .ok_or_else(|| {
                    WalletError::Config(format!("No default Esplora URL for {}", network))
                })?
                .to_string(),
        };
        Self::new(base_url, timeout)
    }

    /// Public blockstream.info endpoint for a network, if there is one
    pub fn default_base_url(network: Network) -> Option<&'static str> {
        match network {
            Network::Bitcoin => Some("https://blockstream.info/api"),
            Network::Testnet => Some("https://blockstream.info/testnet/api"),
            Network::Signet => Some("https://blockstream.info/signet/api"),
            _ => None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> Result<Response, WalletError> {
        let url = self.url(path);
        debug!("GET {}", url);
        let response = self.client.get(&url).send()?;
        check_status(response)
    }
}

// Non-2xx responses become errors carrying the body, or the status line
fn check_status(response: Response) -> Result<Response, WalletError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    let message = body.trim();
    if message.is_empty() {
        Err(WalletError::Network(status.to_string()))
    } else {
        Err(WalletError::Network(message.to_string()))
    }
}

impl ChainBackend for EsploraClient {
    fn fetch_spendable_coins(&self, address: &str) -> Result<Vec<Coin>, WalletError> {
        let coins: Vec<Coin> = self.get(&format!("/address/{}/utxo", address))?.json()?;
        debug!("Fetched {} coins", coins.len());
        Ok(coins)
    }

    fn submit_transaction(&self, tx_hex: &str) -> Result<String, WalletError> {
        let url = self.url("/tx");
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "text/plain")
            .body(tx_hex.to_string())
            .send()?;
        let txid = check_status(response)?.text()?.trim().to_string();
        info!("Broadcast accepted: {}", txid);
        Ok(txid)
    }

    fn fetch_balance(&self, address: &str) -> Result<u64, WalletError> {
        let info: AddressInfo = self.get(&format!("/address/{}", address))?.json()?;
        Ok(info
            .chain_stats
            .funded_txo_sum
            .saturating_sub(info.chain_stats.spent_txo_sum))
    }

    fn fetch_transaction_hex(&self, txid: &str) -> Result<String, WalletError> {
        let hex = self.get(&format!("/tx/{}/hex", txid))?.text()?;
        Ok(hex.trim().to_string())
    }
}

#[derive(Debug, Default)]
struct MockState {
    coins: HashMap<String, Vec<Coin>>,
    transactions: HashMap<String, String>,
    submitted: Vec<String>,
    fail_with: Option<String>,
}

/// In-memory chain backend for tests
///
/// # WARNING: FOR TESTING PURPOSES ONLY
///
/// Serves coins and transactions registered up front and records every
/// submission instead of broadcasting it. Clones share state, so a test can
/// keep a handle while the wallet owns another.
#[derive(Debug, Clone, Default)]
pub struct MockChainBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockChainBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the coins returned for `address`
    pub fn with_coins(self, address: impl Into<String>, coins: Vec<Coin>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.coins.insert(address.into(), coins);
        }
        self
    }

    /// Register a transaction returned by [`ChainBackend::fetch_transaction_hex`]
    pub fn with_transaction(self, txid: impl Into<String>, tx_hex: impl Into<String>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.transactions.insert(txid.into(), tx_hex.into());
        }
        self
    }

    /// Make every subsequent call fail with a network error
    pub fn failing(self, message: impl Into<String>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.fail_with = Some(message.into());
        }
        self
    }

    /// Hex of every transaction submitted so far, in order
    pub fn submitted(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|state| state.submitted.clone())
            .unwrap_or_default()
    }

    fn with_state<T>(
        &self,
        f: impl FnOnce(&mut MockState) -> Result<T, WalletError>,
    ) -> Result<T, WalletError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| WalletError::Network("mock backend lock poisoned".to_string()))?;
        if let Some(message) = &state.fail_with {
            return Err(WalletError::Network(message.clone()));
        }
        f(&mut state)
    }
}

impl ChainBackend for MockChainBackend {
    fn fetch_spendable_coins(&self, address: &str) -> Result<Vec<Coin>, WalletError> {
        self.with_state(|state| Ok(state.coins.get(address).cloned().unwrap_or_default()))
    }

    fn submit_transaction(&self, tx_hex: &str) -> Result<String, WalletError> {
        self.with_state(|state| {
            let txid = decode_transaction_hex(tx_hex)?.txid().to_string();
            state.submitted.push(tx_hex.to_string());
            state.transactions.insert(txid.clone(), tx_hex.to_string());
            Ok(txid)
        })
    }

    fn fetch_balance(&self, address: &str) -> Result<u64, WalletError> {
        self.with_state(|state| {
            Ok(state
                .coins
                .get(address)
                .map(|coins| coins.iter().map(|coin| coin.value).sum())
                .unwrap_or(0))
        })
    }

    fn fetch_transaction_hex(&self, txid: &str) -> Result<String, WalletError> {
        self.with_state(|state| {
            state
                .transactions
                .get(txid)
                .cloned()
                .ok_or_else(|| WalletError::Network("Transaction not found".to_string()))
        })
    }
}
