//! Transaction signing
//!
//! Each spending-condition family is handled by its own [`SigningStrategy`]:
//!
//! | Family | Digest | Unlocking data |
//! |---|---|---|
//! | p2pkh | legacy sighash over the previous script | `script_sig = <sig> <pubkey>` |
//! | p2wpkh | BIP-143 over the P2PKH script code | `witness = [sig, pubkey]` |
//! | p2sh | BIP-143 over the redeem script's code | `script_sig = <redeem>`, `witness = [sig, pubkey]` |
//! | p2tr | BIP-341 key-path over all prevouts | `witness = [schnorr sig]` |
//!
//! [`TransactionSigner`] dispatches to the right strategy, signs every input
//! in order and only writes the result back when all of them succeed.
//!
//! # Security Considerations
//!
//! - Private keys never leave the [`WalletContext`] and are never logged
//! - ECDSA nonces follow RFC-6979 and Schnorr signatures use no auxiliary
//!   randomness, so signing the same transaction twice is byte-identical
//! - The taproot strategy re-derives the wallet's own output script instead
//!   of trusting the caller-supplied one, since the digest commits to every
//!   prevout script and a mismatch would yield an invalid signature

use crate::address::{nested_redeem_script, taproot_output_script, wallet_locking_script};
use crate::context::WalletContext;
use crate::error::WalletError;
use crate::logging::{log_security, LogLevel};
use crate::types::{AddressType, Coin};
use bitcoin::hashes::Hash;
use bitcoin::key::TapTweak;
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::secp256k1::{KeyPair, Message};
use bitcoin::sighash::{EcdsaSighashType, Prevouts, SighashCache, TapSighashType};
use bitcoin::{PubkeyHash, Script, ScriptBuf, Transaction, TxOut, Witness};
use serde_json::json;

/// Unlocking data produced for one input
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnlockingData {
    pub script_sig: ScriptBuf,
    pub witness: Witness,
}

/// Signature scheme for one spending-condition family
pub trait SigningStrategy {
    /// The family this strategy spends
    fn address_type(&self) -> AddressType;

    /// Message to sign for input `index`
    ///
    /// `coins` are the coins spent by `tx`, in input order. `prev_script` is
    /// the locking script of the coin being spent.
    fn compute_digest(
        &self,
        tx: &Transaction,
        index: usize,
        coins: &[Coin],
        prev_script: &Script,
    ) -> Result<Message, WalletError>;

    /// Sign `digest` and assemble the unlocking data for the input
    fn build_unlocking_data(&self, digest: &Message) -> Result<UnlockingData, WalletError>;
}

/// Legacy pay-to-pubkey-hash
pub struct LegacySigner<'a> {
    ctx: &'a WalletContext,
}

/// Native SegWit v0 pay-to-witness-pubkey-hash
pub struct SegwitV0Signer<'a> {
    ctx: &'a WalletContext,
}

/// SegWit v0 nested in pay-to-script-hash
pub struct NestedSegwitSigner<'a> {
    ctx: &'a WalletContext,
}

/// Taproot key-path spend with the BIP-86 tweak (no script tree)
pub struct TaprootSigner<'a> {
    ctx: &'a WalletContext,
}

impl<'a> LegacySigner<'a> {
    pub fn new(ctx: &'a WalletContext) -> Self {
        Self { ctx }
    }
}

impl<'a> SegwitV0Signer<'a> {
    pub fn new(ctx: &'a WalletContext) -> Self {
        Self { ctx }
    }
}

impl<'a> NestedSegwitSigner<'a> {
    pub fn new(ctx: &'a WalletContext) -> Self {
        Self { ctx }
    }
}

impl<'a> TaprootSigner<'a> {
    pub fn new(ctx: &'a WalletContext) -> Self {
        Self { ctx }
    }
}

impl SigningStrategy for LegacySigner<'_> {
    fn address_type(&self) -> AddressType {
        AddressType::P2pkh
    }

    fn compute_digest(
        &self,
        tx: &Transaction,
        index: usize,
        _coins: &[Coin],
        prev_script: &Script,
    ) -> Result<Message, WalletError> {
        let sighash = SighashCache::new(tx)
            .legacy_signature_hash(index, prev_script, EcdsaSighashType::All.to_u32())
            .map_err(|e| WalletError::signing(index, format!("legacy sighash: {}", e)))?;
        to_message(index, sighash.as_byte_array())
    }

    fn build_unlocking_data(&self, digest: &Message) -> Result<UnlockingData, WalletError> {
        let sig = ecdsa_signature(self.ctx, digest);
        let script_sig = Builder::new()
            .push_slice(push_bytes(sig)?)
            .push_key(self.ctx.public_key())
            .into_script();

        Ok(UnlockingData {
            script_sig,
            witness: Witness::new(),
        })
    }
}

impl SigningStrategy for SegwitV0Signer<'_> {
    fn address_type(&self) -> AddressType {
        AddressType::P2wpkh
    }

    fn compute_digest(
        &self,
        tx: &Transaction,
        index: usize,
        coins: &[Coin],
        prev_script: &Script,
    ) -> Result<Message, WalletError> {
        let script_code = p2wpkh_script_code(prev_script)
            .ok_or_else(|| WalletError::signing(index, "previous script is not p2wpkh"))?;
        segwit_v0_digest(tx, index, coins, &script_code)
    }

    fn build_unlocking_data(&self, digest: &Message) -> Result<UnlockingData, WalletError> {
        Ok(UnlockingData {
            script_sig: ScriptBuf::new(),
            witness: ecdsa_witness(self.ctx, digest),
        })
    }
}

impl SigningStrategy for NestedSegwitSigner<'_> {
    fn address_type(&self) -> AddressType {
        AddressType::P2shP2wpkh
    }

    // The P2SH script only commits to the redeem script, so the digest is
    // computed over the redeem script's code
    fn compute_digest(
        &self,
        tx: &Transaction,
        index: usize,
        coins: &[Coin],
        _prev_script: &Script,
    ) -> Result<Message, WalletError> {
        let redeem_script = nested_redeem_script(self.ctx)?;
        let script_code = p2wpkh_script_code(&redeem_script)
            .ok_or_else(|| WalletError::signing(index, "redeem script is not p2wpkh"))?;
        segwit_v0_digest(tx, index, coins, &script_code)
    }

    fn build_unlocking_data(&self, digest: &Message) -> Result<UnlockingData, WalletError> {
        let redeem_script = nested_redeem_script(self.ctx)?;
        let script_sig = Builder::new()
            .push_slice(push_bytes(redeem_script.into_bytes())?)
            .into_script();

        Ok(UnlockingData {
            script_sig,
            witness: ecdsa_witness(self.ctx, digest),
        })
    }
}

impl SigningStrategy for TaprootSigner<'_> {
    fn address_type(&self) -> AddressType {
        AddressType::P2tr
    }

    fn compute_digest(
        &self,
        tx: &Transaction,
        index: usize,
        coins: &[Coin],
        _prev_script: &Script,
    ) -> Result<Message, WalletError> {
        if coins.len() != tx.input.len() {
            return Err(WalletError::signing(
                index,
                format!("{} coins for {} inputs", coins.len(), tx.input.len()),
            ));
        }

        let own_script = taproot_output_script(self.ctx);
        let prevouts: Vec<TxOut> = coins
            .iter()
            .map(|coin| TxOut {
                value: coin.value,
                script_pubkey: own_script.clone(),
            })
            .collect();

        let sighash = SighashCache::new(tx)
            .taproot_key_spend_signature_hash(index, &Prevouts::All(&prevouts), TapSighashType::Default)
            .map_err(|e| WalletError::signing(index, format!("taproot sighash: {}", e)))?;
        to_message(index, sighash.as_byte_array())
    }

    fn build_unlocking_data(&self, digest: &Message) -> Result<UnlockingData, WalletError> {
        let secp = self.ctx.secp();
        let tweaked = KeyPair::from_secret_key(secp, self.ctx.secret_key())
            .tap_tweak(secp, None)
            .to_inner();
        let sig = secp.sign_schnorr_no_aux_rand(digest, &tweaked);

        // Default sighash type, so no trailing byte
        let signature = bitcoin::taproot::Signature {
            sig,
            hash_ty: TapSighashType::Default,
        };

        let mut witness = Witness::new();
        witness.push(signature.to_vec());

        Ok(UnlockingData {
            script_sig: ScriptBuf::new(),
            witness,
        })
    }
}

/// Strategy for the given family
pub fn signing_strategy<'a>(
    ctx: &'a WalletContext,
    family: AddressType,
) -> Box<dyn SigningStrategy + 'a> {
    match family {
        AddressType::P2pkh => Box::new(LegacySigner::new(ctx)),
        AddressType::P2wpkh => Box::new(SegwitV0Signer::new(ctx)),
        AddressType::P2shP2wpkh => Box::new(NestedSegwitSigner::new(ctx)),
        AddressType::P2tr => Box::new(TaprootSigner::new(ctx)),
    }
}

/// Signs every input of a transaction with the wallet key
pub struct TransactionSigner<'a> {
    ctx: &'a WalletContext,
}

impl<'a> TransactionSigner<'a> {
    pub fn new(ctx: &'a WalletContext) -> Self {
        Self { ctx }
    }

    /// Sign all inputs of `tx`, which spends `coins` in input order
    ///
    /// On error `tx` is left untouched.
    pub fn sign(
        &self,
        tx: &mut Transaction,
        family: AddressType,
        coins: &[Coin],
    ) -> Result<(), WalletError> {
        if coins.len() != tx.input.len() {
            return Err(WalletError::signing(
                coins.len(),
                format!(
                    "transaction has {} inputs but {} coins were supplied",
                    tx.input.len(),
                    coins.len()
                ),
            ));
        }

        let prev_script = wallet_locking_script(self.ctx, family)
            .map_err(|e| WalletError::signing(0, e.to_string()))?;
        let strategy = signing_strategy(self.ctx, family);

        let mut signed = tx.clone();
        for index in 0..tx.input.len() {
            let unlocking = strategy
                .compute_digest(tx, index, coins, &prev_script)
                .and_then(|digest| strategy.build_unlocking_data(&digest))
                .map_err(|e| at_input(index, e))?;

            signed.input[index].script_sig = unlocking.script_sig;
            signed.input[index].witness = unlocking.witness;
            log_security(
                LogLevel::Debug,
                &format!("{}_input_signed", family),
                Some(json!({ "input": index })),
            );
        }

        *tx = signed;
        // The sanitizer masks short string params
        log_security(
            LogLevel::Info,
            &format!("{}_transaction_signed", family),
            Some(json!({
                "inputs": tx.input.len(),
                "segwit": family.is_segwit(),
            })),
        );
        Ok(())
    }
}

/// Script code used by BIP-143 for a p2wpkh program
///
/// Returns `None` when `script` is not `OP_0 <20 bytes>`.
pub fn p2wpkh_script_code(script: &Script) -> Option<ScriptBuf> {
    if !script.is_v0_p2wpkh() {
        return None;
    }
    let hash = PubkeyHash::from_slice(&script.as_bytes()[2..22]).ok()?;
    Some(ScriptBuf::new_p2pkh(&hash))
}

fn segwit_v0_digest(
    tx: &Transaction,
    index: usize,
    coins: &[Coin],
    script_code: &Script,
) -> Result<Message, WalletError> {
    let value = coins
        .get(index)
        .map(|coin| coin.value)
        .ok_or_else(|| WalletError::signing(index, "no coin for input"))?;

    let sighash = SighashCache::new(tx)
        .segwit_signature_hash(index, script_code, value, EcdsaSighashType::All)
        .map_err(|e| WalletError::signing(index, format!("segwit sighash: {}", e)))?;
    to_message(index, sighash.as_byte_array())
}

fn to_message(index: usize, digest: &[u8]) -> Result<Message, WalletError> {
    Message::from_slice(digest).map_err(|e| WalletError::signing(index, e.to_string()))
}

/// DER signature followed by the SIGHASH_ALL byte
fn ecdsa_signature(ctx: &WalletContext, digest: &Message) -> Vec<u8> {
    let sig = ctx.secp().sign_ecdsa(digest, ctx.secret_key());
    bitcoin::ecdsa::Signature {
        sig,
        hash_ty: EcdsaSighashType::All,
    }
    .to_vec()
}

fn ecdsa_witness(ctx: &WalletContext, digest: &Message) -> Witness {
    let mut witness = Witness::new();
    witness.push(ecdsa_signature(ctx, digest));
    witness.push(ctx.public_key().to_bytes());
    witness
}

fn push_bytes(bytes: Vec<u8>) -> Result<PushBytesBuf, WalletError> {
    PushBytesBuf::try_from(bytes)
        .map_err(|e| WalletError::Encoding(format!("push data too large: {:?}", e)))
}

// Keep errors that already name an input; attach the index to everything else
fn at_input(index: usize, err: WalletError) -> WalletError {
    match err {
        WalletError::Signing { .. } => err,
        other => WalletError::signing(index, other.to_string()),
    }
}
