//! Weighted sigops cost for bare, P2SH and witness spends

use secp256k1::{PublicKey, Secp256k1, SecretKey};
use utxo_consensus::flags::{VERIFY_P2SH, VERIFY_WITNESS};
use utxo_consensus::opcodes::OP_0;
use utxo_consensus::script::hash160;
use utxo_consensus::*;

const FLAGS: u32 = VERIFY_WITNESS | VERIFY_P2SH;

struct SigopContext {
    fund: Transaction,
    spend: Transaction,
    view: CoinView,
}

/// A coinbase funding `script_pubkey` and a transaction spending it
fn sigop_context(script_sig: Script, witness: Witness, script_pubkey: Script) -> SigopContext {
    let fund = Transaction::new(
        1,
        vec![TransactionInput {
            prevout: OutPoint::null(),
            script_sig: Script::new(),
            witness: vec![],
            sequence: 0xffffffff,
        }],
        vec![TransactionOutput {
            value: 1,
            script_pubkey,
        }],
        0,
    );

    let spend = Transaction::new(
        1,
        vec![TransactionInput {
            prevout: OutPoint::new(fund.hash(), 0),
            script_sig,
            witness,
            sequence: 0xffffffff,
        }],
        vec![TransactionOutput {
            value: 1,
            script_pubkey: Script::new(),
        }],
        0,
    );

    let mut view = CoinView::new();
    view.add_tx(&fund, 0);

    SigopContext { fund, spend, view }
}

fn public_key() -> Vec<u8> {
    let secp = Secp256k1::new();
    let secret = SecretKey::from_slice(&[0x11; 32]).unwrap();
    PublicKey::from_secret_key(&secp, &secret).serialize().to_vec()
}

fn multisig_1_of_2() -> Script {
    let key = public_key();
    Script::from_multisig(1, 2, &[key.clone(), key]).unwrap()
}

fn key_hash() -> [u8; 20] {
    hash160(&public_key())
}

#[test]
fn test_sigops_bare_multisig() {
    let script_sig = Script::new().push_opcode(OP_0).push_opcode(OP_0);
    let ctx = sigop_context(script_sig, vec![], multisig_1_of_2());

    assert_eq!(ctx.spend.get_sigops_cost(&ctx.view, FLAGS), 0);
    assert_eq!(
        ctx.fund.get_sigops_cost(&ctx.view, FLAGS),
        MAX_MULTISIG_PUBKEYS * WITNESS_SCALE_FACTOR
    );
}

#[test]
fn test_sigops_p2sh_multisig() {
    let redeem = multisig_1_of_2();
    let script_pubkey = Script::from_scripthash(&redeem.hash160());
    let script_sig = Script::new()
        .push_opcode(OP_0)
        .push_opcode(OP_0)
        .push_slice(redeem.as_bytes());
    let ctx = sigop_context(script_sig, vec![], script_pubkey);

    assert_eq!(ctx.spend.get_sigops_cost(&ctx.view, FLAGS), 2 * WITNESS_SCALE_FACTOR);
    assert_eq!(ctx.spend.get_sigops_cost(&ctx.view, VERIFY_WITNESS), 0);
}

#[test]
fn test_sigops_p2wpkh() {
    let witness = vec![vec![0u8], vec![0u8]];

    let script_pubkey = Script::from_program(0, &key_hash()).unwrap();
    let ctx = sigop_context(Script::new(), witness.clone(), script_pubkey.clone());
    assert_eq!(ctx.spend.get_sigops_cost(&ctx.view, FLAGS), 1);
    assert_eq!(ctx.spend.get_sigops_cost(&ctx.view, FLAGS & !VERIFY_WITNESS), 0);

    let future = Script::from_program(1, &key_hash()).unwrap();
    let ctx = sigop_context(Script::new(), witness.clone(), future);
    assert_eq!(ctx.spend.get_sigops_cost(&ctx.view, FLAGS), 0);

    // spending the null outpoint turns the spend into a coinbase
    let mut ctx = sigop_context(Script::new(), witness, script_pubkey);
    ctx.spend.inputs[0].prevout = OutPoint::null();
    ctx.spend.refresh();
    assert_eq!(ctx.spend.get_sigops_cost(&ctx.view, FLAGS), 0);
}

#[test]
fn test_sigops_nested_p2wpkh() {
    let redeem = Script::from_program(0, &key_hash()).unwrap();
    let script_pubkey = Script::from_scripthash(&redeem.hash160());
    let script_sig = Script::new().push_slice(redeem.as_bytes());
    let ctx = sigop_context(script_sig, vec![vec![0u8], vec![0u8]], script_pubkey);

    assert_eq!(ctx.spend.get_sigops_cost(&ctx.view, FLAGS), 1);
}

#[test]
fn test_sigops_p2wsh() {
    let redeem = multisig_1_of_2();
    let script_pubkey = Script::from_program(0, &redeem.sha256()).unwrap();
    let witness = vec![vec![0u8], vec![0u8], redeem.as_bytes().to_vec()];
    let ctx = sigop_context(Script::new(), witness, script_pubkey);

    assert_eq!(ctx.spend.get_sigops_cost(&ctx.view, FLAGS), 2);
    assert_eq!(ctx.spend.get_sigops_cost(&ctx.view, FLAGS & !VERIFY_WITNESS), 0);
}

#[test]
fn test_sigops_nested_p2wsh() {
    let witness_script = multisig_1_of_2();
    let redeem = Script::from_program(0, &witness_script.sha256()).unwrap();
    let script_pubkey = Script::from_scripthash(&redeem.hash160());
    let script_sig = Script::new().push_slice(redeem.as_bytes());
    let witness = vec![vec![0u8], vec![0u8], witness_script.as_bytes().to_vec()];
    let ctx = sigop_context(script_sig, witness, script_pubkey);

    assert_eq!(ctx.spend.get_sigops_cost(&ctx.view, FLAGS), 2);
}
