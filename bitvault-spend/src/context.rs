//! Immutable wallet context
//!
//! A [`WalletContext`] bundles the process-wide, read-only parameters every
//! component needs: the network, the effective fee-rate, the signing key and
//! a secp256k1 context. It is built once and passed by reference into each
//! call, so any number of transactions can be constructed from the same key
//! concurrently without shared mutable state.

use crate::error::WalletError;
use crate::fee_estimation::effective_fee_rate;
use crate::types::SensitiveString;
use bitcoin::secp256k1::{All, Secp256k1, SecretKey, XOnlyPublicKey};
use bitcoin::{Network, PrivateKey, PublicKey};
use std::fmt;

/// Read-only parameters shared by every component of the engine
#[derive(Clone)]
pub struct WalletContext {
    network: Network,
    fee_rate: u64,
    private_key: PrivateKey,
    public_key: PublicKey,
    secp: Secp256k1<All>,
}

impl WalletContext {
    /// Create a context from an already-decoded private key
    ///
    /// `fee_rate` is in satoshis per vbyte; values `<= 0` are floored to 1.
    pub fn new(private_key: PrivateKey, network: Network, fee_rate: i64) -> Result<Self, WalletError> {
        if !key_matches_network(private_key.network, network) {
            return Err(WalletError::Key(format!(
                "Private key is for {}, wallet is configured for {}",
                private_key.network, network
            )));
        }

        let secp = Secp256k1::new();
        let public_key = private_key.public_key(&secp);

        Ok(Self {
            network,
            fee_rate: effective_fee_rate(fee_rate),
            private_key,
            public_key,
            secp,
        })
    }

    /// Create a context from a WIF-encoded private key
    pub fn from_wif(wif: &SensitiveString, network: Network, fee_rate: i64) -> Result<Self, WalletError> {
        let private_key = PrivateKey::from_wif(wif.expose_secret().trim())
            .map_err(|e| WalletError::Key(format!("Failed to decode WIF: {}", e)))?;
        Self::new(private_key, network, fee_rate)
    }

    /// Return a copy of this context with a different fee-rate
    pub fn with_fee_rate(&self, fee_rate: i64) -> Self {
        Self {
            fee_rate: effective_fee_rate(fee_rate),
            ..self.clone()
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Effective fee-rate in satoshis per vbyte (always >= 1)
    pub fn fee_rate(&self) -> u64 {
        self.fee_rate
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Internal (untweaked) x-only key used for taproot outputs
    pub fn x_only_public_key(&self) -> XOnlyPublicKey {
        self.public_key.inner.x_only_public_key().0
    }

    pub fn secp(&self) -> &Secp256k1<All> {
        &self.secp
    }

    pub(crate) fn secret_key(&self) -> &SecretKey {
        &self.private_key.inner
    }
}

impl fmt::Debug for WalletContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletContext")
            .field("network", &self.network)
            .field("fee_rate", &self.fee_rate)
            .field("public_key", &self.public_key)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

// WIF only distinguishes mainnet from the test networks
fn key_matches_network(key_network: Network, network: Network) -> bool {
    (key_network == Network::Bitcoin) == (network == Network::Bitcoin)
}
