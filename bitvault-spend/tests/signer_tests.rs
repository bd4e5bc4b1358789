mod common;

use bitcoin::hashes::Hash;
use bitcoin::key::TapTweak;
use bitcoin::script::{Builder, Instruction, PushBytesBuf};
use bitcoin::secp256k1::{ecdsa, schnorr, Message, Secp256k1};
use bitcoin::sighash::{EcdsaSighashType, Prevouts, SighashCache, TapSighashType};
use bitcoin::{Network, ScriptBuf, Transaction, TxOut};
use bitvault_spend::address::decode_address_script;
use bitvault_spend::builder::build_transaction;
use bitvault_spend::codec::{decode_transaction_hex, encode_transaction_hex};
use bitvault_spend::context::WalletContext;
use bitvault_spend::error::WalletError;
use bitvault_spend::signer::{
    p2wpkh_script_code, signing_strategy, SigningStrategy, TaprootSigner, TransactionSigner,
};
use bitvault_spend::types::{AddressType, Coin, ResolvedOutput};
use common::{coin, own_script, setup, test_context, TESTNET_P2WPKH};

fn coins() -> Vec<Coin> {
    vec![coin(0x01, 0, 20_000), coin(0x02, 1, 30_000)]
}

fn unsigned(ctx: &WalletContext, family: AddressType) -> Transaction {
    let outputs = vec![ResolvedOutput {
        script_pubkey: decode_address_script(TESTNET_P2WPKH, Network::Testnet).unwrap(),
        amount: 25_000,
    }];
    build_transaction(ctx, family, &coins(), &outputs, 24_000).unwrap()
}

fn signed(ctx: &WalletContext, family: AddressType) -> (Transaction, Transaction) {
    let unsigned = unsigned(ctx, family);
    let mut tx = unsigned.clone();
    TransactionSigner::new(ctx)
        .sign(&mut tx, family, &coins())
        .unwrap();
    (unsigned, tx)
}

fn pushes(script: &ScriptBuf) -> Vec<Vec<u8>> {
    script
        .instructions()
        .map(|ins| match ins.unwrap() {
            Instruction::PushBytes(bytes) => bytes.as_bytes().to_vec(),
            Instruction::Op(op) => panic!("unexpected opcode {:?}", op),
        })
        .collect()
}

fn split_ecdsa(sig: &[u8]) -> ecdsa::Signature {
    assert_eq!(*sig.last().unwrap(), 0x01, "SIGHASH_ALL byte");
    ecdsa::Signature::from_der(&sig[..sig.len() - 1]).unwrap()
}

fn verify_segwit_v0(ctx: &WalletContext, unsigned: &Transaction, signed: &Transaction) {
    let secp = Secp256k1::new();
    let script_code = ScriptBuf::new_p2pkh(&ctx.public_key().pubkey_hash());

    for (index, input) in signed.input.iter().enumerate() {
        assert_eq!(input.witness.len(), 2);
        let sig = split_ecdsa(input.witness.nth(0).unwrap());
        assert_eq!(input.witness.nth(1).unwrap(), &ctx.public_key().to_bytes()[..]);

        let sighash = SighashCache::new(unsigned)
            .segwit_signature_hash(index, &script_code, coins()[index].value, EcdsaSighashType::All)
            .unwrap();
        let msg = Message::from_slice(sighash.as_byte_array()).unwrap();
        assert!(secp.verify_ecdsa(&msg, &sig, &ctx.public_key().inner).is_ok());
    }
}

#[test]
fn test_legacy_signatures_verify() {
    setup();
    let ctx = test_context(1);
    let (unsigned, tx) = signed(&ctx, AddressType::P2pkh);
    let secp = Secp256k1::new();
    let prev_script = own_script(&ctx, AddressType::P2pkh);

    for (index, input) in tx.input.iter().enumerate() {
        assert!(input.witness.is_empty());
        let items = pushes(&input.script_sig);
        assert_eq!(items.len(), 2);
        assert_eq!(items[1], ctx.public_key().to_bytes());

        let sig = split_ecdsa(&items[0]);
        let sighash = SighashCache::new(&unsigned)
            .legacy_signature_hash(index, &prev_script, EcdsaSighashType::All.to_u32())
            .unwrap();
        let msg = Message::from_slice(sighash.as_byte_array()).unwrap();
        assert!(secp.verify_ecdsa(&msg, &sig, &ctx.public_key().inner).is_ok());
    }
}

#[test]
fn test_segwit_v0_signatures_verify() {
    setup();
    let ctx = test_context(1);
    let (unsigned, tx) = signed(&ctx, AddressType::P2wpkh);

    for input in &tx.input {
        assert!(input.script_sig.is_empty());
    }
    verify_segwit_v0(&ctx, &unsigned, &tx);
}

#[test]
fn test_nested_segwit_carries_both() {
    setup();
    let ctx = test_context(1);
    let (unsigned, tx) = signed(&ctx, AddressType::P2shP2wpkh);

    let redeem = ScriptBuf::new_v0_p2wpkh(&ctx.public_key().wpubkey_hash().unwrap());
    let expected_script_sig = Builder::new()
        .push_slice(PushBytesBuf::try_from(redeem.to_bytes()).unwrap())
        .into_script();

    for input in &tx.input {
        assert!(!input.script_sig.is_empty());
        assert_eq!(input.script_sig, expected_script_sig);
        assert_eq!(input.witness.len(), 2);
    }
    verify_segwit_v0(&ctx, &unsigned, &tx);
}

#[test]
fn test_taproot_signatures_verify() {
    setup();
    let ctx = test_context(1);
    let (unsigned, tx) = signed(&ctx, AddressType::P2tr);
    let secp = Secp256k1::new();

    let internal = ctx.x_only_public_key();
    let (tweaked, _) = internal.tap_tweak(&secp, None);
    let output_key = tweaked.to_inner();

    let own = ScriptBuf::new_v1_p2tr(&secp, internal, None);
    assert_eq!(own, own_script(&ctx, AddressType::P2tr));
    let prevouts: Vec<TxOut> = coins()
        .iter()
        .map(|c| TxOut {
            value: c.value,
            script_pubkey: own.clone(),
        })
        .collect();

    for (index, input) in tx.input.iter().enumerate() {
        assert!(input.script_sig.is_empty());
        assert_eq!(input.witness.len(), 1);
        let raw = input.witness.nth(0).unwrap();
        assert_eq!(raw.len(), 64, "default sighash adds no trailing byte");

        let sig = schnorr::Signature::from_slice(raw).unwrap();
        let sighash = SighashCache::new(&unsigned)
            .taproot_key_spend_signature_hash(index, &Prevouts::All(&prevouts), TapSighashType::Default)
            .unwrap();
        let msg = Message::from_slice(sighash.as_byte_array()).unwrap();
        assert!(secp.verify_schnorr(&sig, &msg, &output_key).is_ok());
    }
}

#[test]
fn test_taproot_ignores_supplied_script() {
    setup();
    let ctx = test_context(1);
    let tx = unsigned(&ctx, AddressType::P2tr);
    let signer = TaprootSigner::new(&ctx);

    let bogus = ScriptBuf::from_bytes(vec![0x6a, 0x00]);
    let own = own_script(&ctx, AddressType::P2tr);
    assert_eq!(
        signer.compute_digest(&tx, 0, &coins(), &bogus).unwrap(),
        signer.compute_digest(&tx, 0, &coins(), &own).unwrap()
    );
}

#[test]
fn test_segwit_strategy_rejects_non_p2wpkh_script() {
    setup();
    let ctx = test_context(1);
    let tx = unsigned(&ctx, AddressType::P2wpkh);
    let strategy = signing_strategy(&ctx, AddressType::P2wpkh);
    assert_eq!(strategy.address_type(), AddressType::P2wpkh);

    let legacy = own_script(&ctx, AddressType::P2pkh);
    assert!(matches!(
        strategy.compute_digest(&tx, 1, &coins(), &legacy),
        Err(WalletError::Signing { input_index: 1, .. })
    ));
    assert!(p2wpkh_script_code(&legacy).is_none());
}

#[test]
fn test_signing_is_deterministic() {
    setup();
    let ctx = test_context(1);

    for family in AddressType::ALL {
        let (_, first) = signed(&ctx, family);
        let (_, second) = signed(&ctx, family);
        assert_eq!(encode_transaction_hex(&first), encode_transaction_hex(&second));
    }
}

#[test]
fn test_coin_count_mismatch_leaves_tx_untouched() {
    setup();
    let ctx = test_context(1);
    let original = unsigned(&ctx, AddressType::P2wpkh);
    let mut tx = original.clone();

    let result = TransactionSigner::new(&ctx).sign(&mut tx, AddressType::P2wpkh, &coins()[..1]);
    assert!(matches!(
        result,
        Err(WalletError::Signing { input_index: 1, .. })
    ));
    assert_eq!(tx, original);
}

#[test]
fn test_only_nested_inputs_carry_both_fields() {
    setup();
    let ctx = test_context(1);

    for family in AddressType::ALL {
        let (_, tx) = signed(&ctx, family);
        for input in &tx.input {
            let both = !input.script_sig.is_empty() && !input.witness.is_empty();
            assert_eq!(both, family == AddressType::P2shP2wpkh, "{}", family);
        }
    }
}

#[test]
fn test_signed_txid_is_stable_for_segwit() {
    setup();
    let ctx = test_context(1);

    // Witness data does not change the txid of a native segwit spend
    let (unsigned, tx) = signed(&ctx, AddressType::P2wpkh);
    assert_eq!(unsigned.txid(), tx.txid());
    assert_ne!(unsigned.wtxid(), tx.wtxid());
}

#[test]
fn test_signed_transactions_survive_hex_round_trip() {
    setup();
    let ctx = test_context(1);

    for family in AddressType::ALL {
        let (unsigned, tx) = signed(&ctx, family);
        assert_eq!(tx.input.len(), 2);

        let decoded = decode_transaction_hex(&encode_transaction_hex(&tx)).unwrap();
        assert_eq!(decoded, tx, "{}", family);
        assert_eq!(
            decode_transaction_hex(&encode_transaction_hex(&unsigned)).unwrap(),
            unsigned
        );

        let has_witness = decoded.input.iter().all(|input| !input.witness.is_empty());
        assert_eq!(has_witness, family.is_segwit(), "{}", family);
    }
}
