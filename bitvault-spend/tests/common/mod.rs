//! Shared helpers for the integration tests
#![allow(dead_code)]

use bitcoin::secp256k1::SecretKey;
use bitcoin::{Network, PrivateKey, ScriptBuf};
use bitvault_spend::address::derive_locking_script_and_address;
use bitvault_spend::{AddressType, Coin, WalletContext};
use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialize test logging once per test binary
pub fn setup() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// BIP-173 test vector, testnet P2WPKH
pub const TESTNET_P2WPKH: &str = "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx";

/// BIP-173 test vector, mainnet P2WPKH
pub const MAINNET_P2WPKH: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";

pub fn private_key(byte: u8, network: Network) -> PrivateKey {
    let secret = SecretKey::from_slice(&[byte; 32]).expect("valid secret key");
    PrivateKey::new(secret, network)
}

/// Testnet context for the wallet key used throughout the tests
pub fn test_context(fee_rate: i64) -> WalletContext {
    WalletContext::new(private_key(0x11, Network::Testnet), Network::Testnet, fee_rate)
        .expect("context")
}

/// A testnet address of some other party
pub fn other_address(family: AddressType) -> String {
    let other = WalletContext::new(private_key(0x22, Network::Testnet), Network::Testnet, 1)
        .expect("context");
    derive_locking_script_and_address(&other, family)
        .expect("address")
        .1
}

pub fn own_script(ctx: &WalletContext, family: AddressType) -> ScriptBuf {
    derive_locking_script_and_address(ctx, family)
        .expect("address")
        .0
}

/// Coin with a txid made of one repeated byte
pub fn coin(tag: u8, vout: u32, value: u64) -> Coin {
    Coin::new(format!("{:02x}", tag).repeat(32), vout, value)
}
