//! Address decoding and locking-script derivation
//!
//! Given the wallet's public key this module derives the locking script and
//! human-readable address for each spending-condition family, and decodes
//! destination addresses into scripts with network checking.

use crate::context::WalletContext;
use crate::error::WalletError;
use crate::types::AddressType;
use bitcoin::address::NetworkUnchecked;
use bitcoin::{Address, Network, ScriptBuf};
use std::str::FromStr;
use thiserror::Error;

/// Reasons a destination address can be rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,

    #[error("malformed address: {0}")]
    Malformed(String),

    #[error("address does not belong to {expected}")]
    WrongNetwork { expected: Network },
}

/// Parse and validate a Bitcoin address for the expected network
pub fn decode_address(address: &str, network: Network) -> Result<Address, AddressError> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(AddressError::Empty);
    }

    let unchecked = Address::<NetworkUnchecked>::from_str(trimmed)
        .map_err(|e| AddressError::Malformed(e.to_string()))?;

    if !unchecked.is_valid_for_network(network) {
        return Err(AddressError::WrongNetwork { expected: network });
    }

    Ok(unchecked.assume_checked())
}

/// Decode an address straight into its locking script
pub fn decode_address_script(address: &str, network: Network) -> Result<ScriptBuf, AddressError> {
    decode_address(address, network).map(|addr| addr.script_pubkey())
}

/// Derive the wallet's own address for a family
pub fn derive_address(ctx: &WalletContext, family: AddressType) -> Result<Address, WalletError> {
    let network = ctx.network();
    let public_key = ctx.public_key();

    match family {
        AddressType::P2pkh => Ok(Address::p2pkh(public_key, network)),
        AddressType::P2wpkh => Address::p2wpkh(public_key, network)
            .map_err(|e| WalletError::Key(format!("Cannot derive p2wpkh address: {}", e))),
        AddressType::P2shP2wpkh => Address::p2shwpkh(public_key, network)
            .map_err(|e| WalletError::Key(format!("Cannot derive p2sh address: {}", e))),
        AddressType::P2tr => Ok(Address::p2tr(
            ctx.secp(),
            ctx.x_only_public_key(),
            None,
            network,
        )),
    }
}

/// Derive the wallet's own locking script and address string for a family
pub fn derive_locking_script_and_address(
    ctx: &WalletContext,
    family: AddressType,
) -> Result<(ScriptBuf, String), WalletError> {
    let address = derive_address(ctx, family)?;
    Ok((address.script_pubkey(), address.to_string()))
}

/// Locking script of the wallet's own address, obtained by decoding the
/// address string the same way a destination would be decoded
pub fn wallet_locking_script(ctx: &WalletContext, family: AddressType) -> Result<ScriptBuf, WalletError> {
    let (_, address) = derive_locking_script_and_address(ctx, family)?;
    decode_address_script(&address, ctx.network())
        .map_err(|e| WalletError::Key(format!("Wallet {} address does not decode: {}", family, e)))
}

/// `OP_0 <hash160(pubkey)>`, the redeem script behind the wallet's p2sh address
pub fn nested_redeem_script(ctx: &WalletContext) -> Result<ScriptBuf, WalletError> {
    let wpubkey_hash = ctx
        .public_key()
        .wpubkey_hash()
        .ok_or_else(|| WalletError::Key("SegWit requires a compressed public key".to_string()))?;
    Ok(ScriptBuf::new_v0_p2wpkh(&wpubkey_hash))
}

/// Taproot output script committing to the tweaked wallet key (no script tree)
pub fn taproot_output_script(ctx: &WalletContext) -> ScriptBuf {
    ScriptBuf::new_v1_p2tr(ctx.secp(), ctx.x_only_public_key(), None)
}
