//! Signature operation counting and the weighted sigops cost

use crate::coins::CoinView;
use crate::constants::WITNESS_SCALE_FACTOR;
use crate::flags::{VERIFY_P2SH, VERIFY_WITNESS};
use crate::script::Script;
use crate::segwit::Witness;
use crate::types::*;

/// Sigops in every scriptSig and scriptPubKey, counted inaccurately
pub fn get_legacy_sigop_count(tx: &Transaction) -> usize {
    let inputs: usize = tx.inputs.iter().map(|input| input.script_sig.count_sigops(false)).sum();
    let outputs: usize = tx.outputs.iter().map(|output| output.script_pubkey.count_sigops(false)).sum();
    inputs + outputs
}

/// Sigops in the redeem scripts of P2SH coins spent by `tx`
///
/// Inputs whose coin is missing from `view` contribute nothing.
pub fn get_p2sh_sigop_count(tx: &Transaction, view: &CoinView) -> usize {
    if tx.is_coinbase() {
        return 0;
    }
    tx.inputs
        .iter()
        .filter_map(|input| {
            let coin = view.get_output(input)?;
            if !coin.script.is_p2sh() {
                return None;
            }
            Some(input.script_sig.get_redeem()?.count_sigops(true))
        })
        .sum()
}

fn witness_program_sigops(version: u8, program: &[u8], witness: &Witness) -> usize {
    if version != 0 {
        return 0;
    }
    match program.len() {
        20 => 1,
        32 => witness
            .last()
            .map_or(0, |script| Script::from_raw(script).count_sigops(true)),
        _ => 0,
    }
}

/// Witness sigops for spending `script_pubkey` with the given scriptSig and witness
pub fn count_witness_sigops(script_sig: &Script, script_pubkey: &Script, witness: &Witness, flags: u32) -> usize {
    if flags & VERIFY_WITNESS == 0 {
        return 0;
    }

    if let Some((version, program)) = script_pubkey.witness_program() {
        return witness_program_sigops(version, program, witness);
    }

    if script_pubkey.is_p2sh() {
        if let Some(redeem) = script_sig.get_redeem() {
            if let Some((version, program)) = redeem.witness_program() {
                return witness_program_sigops(version, program, witness);
            }
        }
    }

    0
}

/// SigOpsCost: 𝒯𝒳 × 𝒞𝒱 × ℕ₃₂ → ℕ
///
/// Legacy and P2SH sigops are scaled by the witness factor; witness sigops
/// count once. A coinbase only pays for its legacy sigops.
pub fn get_sigops_cost(tx: &Transaction, view: &CoinView, flags: u32) -> usize {
    let mut cost = get_legacy_sigop_count(tx) * WITNESS_SCALE_FACTOR;

    if tx.is_coinbase() {
        return cost;
    }

    if flags & VERIFY_P2SH != 0 {
        cost += get_p2sh_sigop_count(tx, view) * WITNESS_SCALE_FACTOR;
    }

    for input in &tx.inputs {
        if let Some(coin) = view.get_output(input) {
            cost += count_witness_sigops(&input.script_sig, &coin.script, &input.witness, flags);
        }
    }

    cost
}
