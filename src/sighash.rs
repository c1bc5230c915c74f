//! Signature hash engine for legacy and witness v0 spends

use crate::constants::*;
use crate::error::{ConsensusError, Result};
use crate::script::Script;
use crate::serialization::{finish_sha256d, serialize_outpoint, serialize_output, Encoder};
use crate::types::*;
use bitcoin_hashes::{sha256d, Hash as BitcoinHash};

/// Which signature hash algorithm a spend uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigVersion {
    /// Pre-segwit re-serialization algorithm
    Base,
    /// BIP143 algorithm for witness version 0 programs
    WitnessV0,
}

/// Per-transaction BIP143 digests shared by every input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WitnessMidstate {
    pub hash_prevouts: Hash,
    pub hash_sequence: Hash,
    pub hash_outputs: Hash,
}

impl WitnessMidstate {
    pub fn new(tx: &Transaction) -> Self {
        let mut prevouts = sha256d::Hash::engine();
        let mut sequences = sha256d::Hash::engine();
        for input in &tx.inputs {
            serialize_outpoint(&input.prevout, &mut prevouts);
            sequences.put_u32(input.sequence);
        }

        let mut outputs = sha256d::Hash::engine();
        for output in &tx.outputs {
            serialize_output(output, &mut outputs);
        }

        Self {
            hash_prevouts: finish_sha256d(prevouts),
            hash_sequence: finish_sha256d(sequences),
            hash_outputs: finish_sha256d(outputs),
        }
    }
}

/// SignatureHash: 𝒯𝒳 × ℕ × 𝕊 × ℤ × ℕ₃₂ × 𝒱 → ℍ
///
/// `subscript` must already be cut at the last executed code separator and,
/// for legacy spends, stripped of separators. `value` is only committed to
/// by the witness algorithm. The low five bits of `sighash_type` select
/// ALL/NONE/SINGLE and bit 0x80 is ANYONECANPAY; the full 32-bit value is
/// appended to the preimage.
///
/// Returns an error only when `index` does not name an input.
pub fn signature_hash(
    tx: &Transaction,
    index: usize,
    subscript: &Script,
    value: Integer,
    sighash_type: u32,
    version: SigVersion,
) -> Result<Hash> {
    if index >= tx.inputs.len() {
        return Err(ConsensusError::InputIndexOutOfRange {
            index,
            count: tx.inputs.len(),
        });
    }

    Ok(match version {
        SigVersion::Base => legacy_signature_hash(tx, index, subscript, sighash_type),
        SigVersion::WitnessV0 => {
            witness_v0_signature_hash(tx, index, subscript, value, sighash_type)
        }
    })
}

/// Re-serializes the whole transaction for every call.
fn legacy_signature_hash(tx: &Transaction, index: usize, subscript: &Script, sighash_type: u32) -> Hash {
    let base_type = sighash_type & 0x1f;
    let anyone_can_pay = sighash_type & SIGHASH_ANYONECANPAY != 0;

    // Historical behaviour: signing SINGLE without a matching output commits to 1.
    if base_type == SIGHASH_SINGLE && index >= tx.outputs.len() {
        return SIGHASH_ONE;
    }

    let mut engine = sha256d::Hash::engine();
    engine.put_i32(tx.version);

    if anyone_can_pay {
        let input = &tx.inputs[index];
        engine.put_varint(1);
        serialize_outpoint(&input.prevout, &mut engine);
        engine.put_var_bytes(subscript.as_bytes());
        engine.put_u32(input.sequence);
    } else {
        engine.put_varint(tx.inputs.len() as u64);
        for (i, input) in tx.inputs.iter().enumerate() {
            serialize_outpoint(&input.prevout, &mut engine);
            if i == index {
                engine.put_var_bytes(subscript.as_bytes());
                engine.put_u32(input.sequence);
            } else {
                engine.put_varint(0);
                if base_type == SIGHASH_NONE || base_type == SIGHASH_SINGLE {
                    engine.put_u32(0);
                } else {
                    engine.put_u32(input.sequence);
                }
            }
        }
    }

    match base_type {
        SIGHASH_NONE => engine.put_varint(0),
        SIGHASH_SINGLE => {
            engine.put_varint(index as u64 + 1);
            for _ in 0..index {
                engine.put_i64(-1);
                engine.put_varint(0);
            }
            serialize_output(&tx.outputs[index], &mut engine);
        }
        _ => {
            engine.put_varint(tx.outputs.len() as u64);
            for output in &tx.outputs {
                serialize_output(output, &mut engine);
            }
        }
    }

    engine.put_u32(tx.lock_time);
    engine.put_u32(sighash_type);
    finish_sha256d(engine)
}

fn witness_v0_signature_hash(
    tx: &Transaction,
    index: usize,
    subscript: &Script,
    value: Integer,
    sighash_type: u32,
) -> Hash {
    let base_type = sighash_type & 0x1f;
    let anyone_can_pay = sighash_type & SIGHASH_ANYONECANPAY != 0;
    let midstate = tx.witness_midstate();
    let zero = [0u8; 32];

    let hash_prevouts = if anyone_can_pay { zero } else { midstate.hash_prevouts };

    let hash_sequence = if anyone_can_pay || base_type == SIGHASH_NONE || base_type == SIGHASH_SINGLE {
        zero
    } else {
        midstate.hash_sequence
    };

    let hash_outputs = if base_type != SIGHASH_NONE && base_type != SIGHASH_SINGLE {
        midstate.hash_outputs
    } else if base_type == SIGHASH_SINGLE && index < tx.outputs.len() {
        let mut single = sha256d::Hash::engine();
        serialize_output(&tx.outputs[index], &mut single);
        finish_sha256d(single)
    } else {
        zero
    };

    let input = &tx.inputs[index];
    let mut engine = sha256d::Hash::engine();
    engine.put_i32(tx.version);
    engine.put(&hash_prevouts);
    engine.put(&hash_sequence);
    serialize_outpoint(&input.prevout, &mut engine);
    engine.put_var_bytes(subscript.as_bytes());
    engine.put_i64(value);
    engine.put_u32(input.sequence);
    engine.put(&hash_outputs);
    engine.put_u32(tx.lock_time);
    engine.put_u32(sighash_type);
    finish_sha256d(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::sha256d_hash;

    fn create_test_transaction(inputs: usize, outputs: usize) -> Transaction {
        Transaction::new(
            1,
            (0..inputs)
                .map(|i| TransactionInput {
                    prevout: OutPoint::new([i as u8 + 1; 32], i as u32),
                    script_sig: Script::from_raw(&[0x51, 0x52]),
                    witness: vec![],
                    sequence: 0xfffffff0 + i as u32,
                })
                .collect(),
            (0..outputs)
                .map(|i| TransactionOutput {
                    value: 1000 * (i as i64 + 1),
                    script_pubkey: Script::from_raw(&[0x76, i as u8]),
                })
                .collect(),
            7,
        )
    }

    #[test]
    fn test_bip143_native_p2wpkh_vector() {
        // Second input of the BIP143 native P2WPKH example
        let raw = hex::decode(
            "0100000002fff7f7881a8099afa6940d42d1e7f6362bec38171ea3edf433541db4e4ad969f0000000000eeffffffef51e1b804cc89d182d279655c3aa89e815b1b309fe287d9b2b55d57b90ec68a0100000000ffffffff02202cb206000000001976a9148280b37df378db99f66f85c95a783a76ac7a6d5988ac9093510d000000001976a9143bde42dbee7e4dbe6a21b2d50ce2f0167faa815988ac11000000",
        )
        .unwrap();
        let tx = Transaction::from_raw(&raw).unwrap();
        let script_code = Script::from_raw(&hex::decode("76a9141d0f172a0ecb48aee1be1f2687d2963ae33f71a188ac").unwrap());

        let hash = signature_hash(&tx, 1, &script_code, 600_000_000, SIGHASH_ALL, SigVersion::WitnessV0).unwrap();
        assert_eq!(
            hex::encode(hash),
            "c37af31116d1b27caf68aae9e3ac82f1477929014d5b917657d0eb49478cb670"
        );
    }

    #[test]
    fn test_midstate_matches_manual_serialization() {
        let tx = create_test_transaction(2, 2);
        let midstate = WitnessMidstate::new(&tx);

        let mut prevouts = Vec::new();
        for input in &tx.inputs {
            prevouts.extend_from_slice(&input.prevout.hash);
            prevouts.extend_from_slice(&input.prevout.index.to_le_bytes());
        }
        assert_eq!(midstate.hash_prevouts, sha256d_hash(&prevouts));

        let sequences: Vec<u8> = tx.inputs.iter().flat_map(|i| i.sequence.to_le_bytes()).collect();
        assert_eq!(midstate.hash_sequence, sha256d_hash(&sequences));
    }

    #[test]
    fn test_legacy_single_without_output_is_one() {
        let tx = create_test_transaction(3, 1);
        let hash = signature_hash(&tx, 2, &Script::new(), 0, SIGHASH_SINGLE, SigVersion::Base).unwrap();
        assert_eq!(hash, SIGHASH_ONE);

        let acp = signature_hash(&tx, 2, &Script::new(), 0, SIGHASH_SINGLE | SIGHASH_ANYONECANPAY, SigVersion::Base).unwrap();
        assert_eq!(acp, SIGHASH_ONE);
    }

    #[test]
    fn test_witness_single_without_output_is_not_one() {
        let tx = create_test_transaction(3, 1);
        let hash = signature_hash(&tx, 2, &Script::new(), 0, SIGHASH_SINGLE, SigVersion::WitnessV0).unwrap();
        assert_ne!(hash, SIGHASH_ONE);
    }

    #[test]
    fn test_index_out_of_range() {
        let tx = create_test_transaction(1, 1);
        let result = signature_hash(&tx, 1, &Script::new(), 0, SIGHASH_ALL, SigVersion::Base);
        assert_eq!(result, Err(ConsensusError::InputIndexOutOfRange { index: 1, count: 1 }));
    }

    #[test]
    fn test_legacy_all_commits_to_every_output() {
        let tx = create_test_transaction(2, 2);
        let before = signature_hash(&tx, 0, &Script::new(), 0, SIGHASH_ALL, SigVersion::Base).unwrap();

        let mut changed = tx.clone();
        changed.outputs[1].value += 1;
        let after = signature_hash(&changed, 0, &Script::new(), 0, SIGHASH_ALL, SigVersion::Base).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_legacy_none_ignores_outputs_and_other_sequences() {
        let tx = create_test_transaction(2, 2);
        let before = signature_hash(&tx, 0, &Script::new(), 0, SIGHASH_NONE, SigVersion::Base).unwrap();

        let mut changed = tx.clone();
        changed.outputs[0].value += 1;
        changed.inputs[1].sequence = 0;
        let after = signature_hash(&changed, 0, &Script::new(), 0, SIGHASH_NONE, SigVersion::Base).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_legacy_single_commits_to_matching_output_only() {
        let tx = create_test_transaction(2, 2);
        let before = signature_hash(&tx, 1, &Script::new(), 0, SIGHASH_SINGLE, SigVersion::Base).unwrap();

        let mut changed = tx.clone();
        changed.outputs[0].value += 1;
        let after = signature_hash(&changed, 1, &Script::new(), 0, SIGHASH_SINGLE, SigVersion::Base).unwrap();
        assert_eq!(before, after);

        changed.outputs[1].value += 1;
        let changed_match = signature_hash(&changed, 1, &Script::new(), 0, SIGHASH_SINGLE, SigVersion::Base).unwrap();
        assert_ne!(before, changed_match);
    }

    #[test]
    fn test_anyonecanpay_ignores_other_inputs() {
        let tx = create_test_transaction(2, 2);
        let hash_type = SIGHASH_ALL | SIGHASH_ANYONECANPAY;
        let mut changed = tx.clone();
        changed.inputs[1].prevout.index = 99;

        for version in [SigVersion::Base, SigVersion::WitnessV0] {
            let before = signature_hash(&tx, 0, &Script::new(), 5, hash_type, version).unwrap();
            let after = signature_hash(&changed, 0, &Script::new(), 5, hash_type, version).unwrap();
            assert_eq!(before, after);
        }
    }

    #[test]
    fn test_witness_commits_to_value() {
        let tx = create_test_transaction(1, 1);
        let a = signature_hash(&tx, 0, &Script::new(), 1000, SIGHASH_ALL, SigVersion::WitnessV0).unwrap();
        let b = signature_hash(&tx, 0, &Script::new(), 1001, SIGHASH_ALL, SigVersion::WitnessV0).unwrap();
        assert_ne!(a, b);

        let legacy_a = signature_hash(&tx, 0, &Script::new(), 1000, SIGHASH_ALL, SigVersion::Base).unwrap();
        let legacy_b = signature_hash(&tx, 0, &Script::new(), 1001, SIGHASH_ALL, SigVersion::Base).unwrap();
        assert_eq!(legacy_a, legacy_b);
    }

    #[test]
    fn test_full_type_is_committed() {
        let tx = create_test_transaction(1, 1);
        let a = signature_hash(&tx, 0, &Script::new(), 0, 0x01, SigVersion::Base).unwrap();
        let b = signature_hash(&tx, 0, &Script::new(), 0, 0x41, SigVersion::Base).unwrap();
        assert_ne!(a, b);
    }
}
