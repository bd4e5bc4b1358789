//! Common data types for the BitVault spend engine
//!
//! These types represent the request-scoped values that flow through the
//! engine: coins fetched from the chain, payment requests from the user,
//! resolved outputs, and the fee decision taken for a spend.
//!
//! # Security Boundaries
//!
//! With the exception of [`SensitiveString`], these types MUST NOT contain
//! private keys or other secret material. They may be logged (after
//! sanitization) and passed freely between components.

use crate::error::WalletError;
use bitcoin::{Network, ScriptBuf};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroize;

// Constants for Bitcoin-specific values

/// Constant for dust threshold (minimum output value)
pub const DUST_THRESHOLD: u64 = 546;

/// A string that contains sensitive data that should be zeroed when dropped
///
/// Used for WIF-encoded private keys handed to the wallet context.
///
/// # Examples
///
/// ```
/// use bitvault_spend::types::SensitiveString;
///
/// let wif = SensitiveString::new("cVt4o7BGAig1UXywgGSmARhxMdzP5qvQsxKkSsc1XEkw3tDTQFpy");
/// assert_eq!(format!("{}", wif), "[REDACTED]");
/// ```
#[derive(Zeroize)]
pub struct SensitiveString {
    inner: String,
}

impl SensitiveString {
    /// Create a new SensitiveString
    pub fn new(s: impl Into<String>) -> Self {
        Self { inner: s.into() }
    }

    /// Expose the secret value
    ///
    /// # Security
    ///
    /// Only use it when absolutely necessary and ensure the returned reference
    /// is not persisted or logged.
    pub fn expose_secret(&self) -> &str {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Clone for SensitiveString {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl fmt::Debug for SensitiveString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensitiveString([REDACTED], length={})", self.len())
    }
}

impl fmt::Display for SensitiveString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl From<&str> for SensitiveString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SensitiveString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl Drop for SensitiveString {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

/// Spending-condition family of the wallet's own coins
///
/// The family fixes both the shape of the locking script the wallet receives
/// to and the signature scheme used to spend from it. All inputs of a single
/// spend belong to the same family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressType {
    /// Legacy pay-to-pubkey-hash (addresses starting with `1` / `m` / `n`)
    #[serde(rename = "p2pkh")]
    P2pkh,
    /// Native SegWit v0 pay-to-witness-pubkey-hash (`bc1q` / `tb1q`)
    #[serde(rename = "p2wpkh")]
    P2wpkh,
    /// SegWit v0 wrapped in pay-to-script-hash (`3` / `2`)
    #[serde(rename = "p2sh", alias = "p2sh-p2wpkh")]
    P2shP2wpkh,
    /// Taproot key-path spend (`bc1p` / `tb1p`)
    #[serde(rename = "p2tr")]
    P2tr,
}

impl AddressType {
    /// All supported families, in a stable order
    pub const ALL: [AddressType; 4] = [
        AddressType::P2pkh,
        AddressType::P2wpkh,
        AddressType::P2shP2wpkh,
        AddressType::P2tr,
    ];

    /// Canonical lower-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressType::P2pkh => "p2pkh",
            AddressType::P2wpkh => "p2wpkh",
            AddressType::P2shP2wpkh => "p2sh",
            AddressType::P2tr => "p2tr",
        }
    }

    /// Whether inputs of this family carry witness data
    pub fn is_segwit(&self) -> bool {
        !matches!(self, AddressType::P2pkh)
    }
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AddressType {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "p2pkh" => Ok(AddressType::P2pkh),
            "p2wpkh" => Ok(AddressType::P2wpkh),
            "p2sh" | "p2sh-p2wpkh" => Ok(AddressType::P2shP2wpkh),
            "p2tr" => Ok(AddressType::P2tr),
            other => Err(WalletError::UnsupportedFamily(other.to_string())),
        }
    }
}

/// An unspent output owned by the wallet
///
/// Field names follow the Esplora `/address/{addr}/utxo` JSON so that the
/// chain client can deserialize responses directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    /// Origin transaction id, hex-encoded in display (reversed) byte order
    pub txid: String,
    /// Output index within the origin transaction
    pub vout: u32,
    /// Value in satoshis
    pub value: u64,
}

impl Coin {
    pub fn new(txid: impl Into<String>, vout: u32, value: u64) -> Self {
        Self {
            txid: txid.into(),
            vout,
            value,
        }
    }
}

/// A user-supplied payment: destination address and amount in satoshis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub address: String,
    pub amount: u64,
}

impl PaymentRequest {
    pub fn new(address: impl Into<String>, amount: u64) -> Self {
        Self {
            address: address.into(),
            amount,
        }
    }
}

/// A validated payment: locking script plus amount (never below dust)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutput {
    pub script_pubkey: ScriptBuf,
    pub amount: u64,
}

/// Ordered resolved outputs together with their validated total
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub outputs: Vec<ResolvedOutput>,
    pub total: u64,
}

impl ResolvedOutputs {
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

/// Fee and change settled for a funded spend
///
/// `change == 0` means no change output is created. For a successful build,
/// `sum(coins) == sum(outputs) + fee + change` holds exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeDecision {
    pub fee: u64,
    pub change: u64,
}

impl FeeDecision {
    pub fn has_change_output(&self) -> bool {
        self.change > DUST_THRESHOLD
    }
}

/// Parse a network name as used in configuration files
pub fn parse_network(name: &str) -> Result<Network, WalletError> {
    match name.trim().to_lowercase().as_str() {
        "bitcoin" | "mainnet" | "main" => Ok(Network::Bitcoin),
        "testnet" | "testnet3" | "test" => Ok(Network::Testnet),
        "signet" => Ok(Network::Signet),
        "regtest" => Ok(Network::Regtest),
        other => Err(WalletError::Config(format!("Unknown network: {}", other))),
    }
}

/// Sum coin values, failing on overflow
pub fn total_coin_value(coins: &[Coin]) -> Option<u64> {
    coins
        .iter()
        .try_fold(0u64, |acc, coin| acc.checked_add(coin.value))
}
