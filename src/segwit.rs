//! Segregated witness sizing: base size, total size, weight and virtual size

use crate::constants::WITNESS_SCALE_FACTOR;
use crate::serialization::{serialize_transaction, varint_size, witness_serialized_size};
use crate::types::*;

/// Witness Data: 𝒲 = 𝕊* (stack of witness elements)
pub type Witness = Vec<ByteString>;

/// Size of the serialization without witness data
pub fn calculate_base_size(tx: &Transaction) -> usize {
    let inputs: usize = tx
        .inputs
        .iter()
        .map(|input| {
            let script = input.script_sig.len();
            32 + 4 + varint_size(script as u64) + script + 4
        })
        .sum();
    let outputs: usize = tx
        .outputs
        .iter()
        .map(|output| {
            let script = output.script_pubkey.len();
            8 + varint_size(script as u64) + script
        })
        .sum();

    4 + varint_size(tx.inputs.len() as u64)
        + inputs
        + varint_size(tx.outputs.len() as u64)
        + outputs
        + 4
}

/// Size of the marker, flag and witness stacks, zero when no envelope is written
pub fn calculate_witness_size(tx: &Transaction) -> usize {
    if !tx.uses_witness_envelope() {
        return 0;
    }
    2 + tx
        .inputs
        .iter()
        .map(|input| witness_serialized_size(&input.witness))
        .sum::<usize>()
}

/// Weight(tx) = 3 × |Serialize(tx ∖ witness)| + |Serialize(tx)|
pub fn calculate_transaction_weight(tx: &Transaction) -> usize {
    let base = calculate_base_size(tx);
    let total = base + calculate_witness_size(tx);
    base * (WITNESS_SCALE_FACTOR - 1) + total
}

/// Virtual size: weight divided by the scale factor, rounded up
pub fn calculate_virtual_size(tx: &Transaction) -> usize {
    (calculate_transaction_weight(tx) + WITNESS_SCALE_FACTOR - 1) / WITNESS_SCALE_FACTOR
}

impl Transaction {
    /// Serialized size including any witness envelope
    pub fn get_size(&self) -> usize {
        calculate_base_size(self) + calculate_witness_size(self)
    }

    /// Serialized size without witness data
    pub fn get_base_size(&self) -> usize {
        calculate_base_size(self)
    }

    pub fn get_weight(&self) -> usize {
        calculate_transaction_weight(self)
    }

    pub fn get_virtual_size(&self) -> usize {
        calculate_virtual_size(self)
    }

    /// True iff any input carries a non-empty witness stack
    pub fn has_witness(&self) -> bool {
        self.inputs.iter().any(|input| !input.witness.is_empty())
    }

    /// Whether the encoder writes the marker/flag envelope for this transaction
    pub fn uses_witness_envelope(&self) -> bool {
        self.witness_flag || self.has_witness()
    }

    /// Full wire encoding, witness envelope included when present
    pub fn to_raw(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.get_size());
        serialize_transaction(self, &mut out, self.uses_witness_envelope());
        out
    }

    /// Wire encoding without witness data
    pub fn to_base_raw(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.get_base_size());
        serialize_transaction(self, &mut out, false);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Script;

    fn create_test_transaction(witness: Witness) -> Transaction {
        Transaction::new(
            1,
            vec![TransactionInput {
                prevout: OutPoint { hash: [1u8; 32], index: 0 },
                script_sig: Script::new(),
                witness,
                sequence: 0xffffffff,
            }],
            vec![TransactionOutput {
                value: 1000,
                script_pubkey: Script::from_raw(&[0x00, 0x14]),
            }],
            0,
        )
    }

    #[test]
    fn test_calculate_base_size() {
        let tx = create_test_transaction(vec![]);
        assert_eq!(calculate_base_size(&tx), 4 + 1 + 41 + 1 + 11 + 4);
        assert_eq!(calculate_base_size(&tx), tx.to_base_raw().len());
    }

    #[test]
    fn test_calculate_witness_size() {
        let tx = create_test_transaction(vec![vec![0u8; 71], vec![0u8; 33]]);
        assert_eq!(calculate_witness_size(&tx), 2 + 1 + 1 + 71 + 1 + 33);
        assert_eq!(tx.get_size(), tx.to_raw().len());
    }

    #[test]
    fn test_calculate_witness_size_flag_without_items() {
        let mut tx = create_test_transaction(vec![]);
        assert_eq!(calculate_witness_size(&tx), 0);
        tx.witness_flag = true;
        assert_eq!(calculate_witness_size(&tx), 3);
        assert_eq!(tx.get_size(), tx.to_raw().len());
    }

    #[test]
    fn test_calculate_transaction_weight_no_witness() {
        let tx = create_test_transaction(vec![]);
        assert_eq!(tx.get_weight(), tx.get_base_size() * 4);
        assert_eq!(tx.get_virtual_size(), tx.get_base_size());
    }

    #[test]
    fn test_calculate_transaction_weight_with_witness() {
        let tx = create_test_transaction(vec![vec![0u8; 71], vec![0u8; 33]]);
        let base = tx.get_base_size();
        let total = tx.get_size();
        assert_eq!(tx.get_weight(), base * 3 + total);
        assert_eq!(tx.get_virtual_size(), (base * 3 + total + 3) / 4);
    }

    #[test]
    fn test_has_witness() {
        assert!(!create_test_transaction(vec![]).has_witness());
        assert!(create_test_transaction(vec![vec![]]).has_witness());
    }
}
