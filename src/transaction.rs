//! Transaction identity, sanity and input checks, and script verification
//!
//! The identity hashes and the witness sighash midstate are memoized on the
//! transaction. Call [`Transaction::refresh`] after mutating any field.

use crate::coins::{Coin, CoinView};
use crate::constants::*;
use crate::error::{ConsensusError, Result, ScriptError};
use crate::flags::STANDARD_VERIFY_FLAGS;
use crate::interpreter::{verify_script, TransactionSignatureChecker};
use crate::script::Script;
use crate::serialization::{deserialize_transaction, finish_sha256d, serialize_transaction};
use crate::sighash::{signature_hash, SigVersion, WitnessMidstate};
use crate::sigops::get_sigops_cost;
use crate::types::*;
use bitcoin_hashes::{sha256d, Hash as BitcoinHash};
use log::{debug, trace};
use std::collections::HashSet;

impl Transaction {
    /// Decodes a transaction from its wire bytes
    pub fn from_raw(data: &[u8]) -> Result<Self> {
        deserialize_transaction(data)
    }

    /// Decodes a transaction from hex-encoded wire bytes
    ///
    /// # Examples
    ///
    /// ```
    /// use utxo_consensus::Transaction;
    ///
    /// let raw = "01000000000000000000";
    /// let tx = Transaction::from_hex(raw).unwrap();
    /// assert!(tx.inputs.is_empty());
    /// assert_eq!(tx.to_hex(), raw);
    /// assert!(Transaction::from_hex("0100").is_err());
    /// ```
    pub fn from_hex(data: &str) -> Result<Self> {
        let raw = hex::decode(data.trim())
            .map_err(|e| ConsensusError::Serialization(format!("Invalid hex: {}", e)))?;
        Self::from_raw(&raw)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_raw())
    }

    /// Double SHA-256 of the serialization without witness data
    pub fn hash(&self) -> Hash {
        *self.cache.hash.get_or_init(|| {
            let mut engine = sha256d::Hash::engine();
            serialize_transaction(self, &mut engine, false);
            finish_sha256d(engine)
        })
    }

    /// Double SHA-256 of the full serialization; equals [`Transaction::hash`]
    /// when no input carries witness data
    pub fn witness_hash(&self) -> Hash {
        if !self.has_witness() {
            return self.hash();
        }
        *self.cache.witness_hash.get_or_init(|| {
            let mut engine = sha256d::Hash::engine();
            serialize_transaction(self, &mut engine, true);
            finish_sha256d(engine)
        })
    }

    /// BIP143 digests of prevouts, sequences and outputs
    pub fn witness_midstate(&self) -> &WitnessMidstate {
        self.cache
            .witness_midstate
            .get_or_init(|| WitnessMidstate::new(self))
    }

    /// Drops every memoized digest
    pub fn refresh(&mut self) {
        self.cache = HashCache::default();
    }

    /// Exactly one input, spending the null outpoint
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].prevout.is_null()
    }

    /// CheckTransaction: 𝒯𝒳 → {valid, invalid}
    ///
    /// Context-free structural checks:
    /// 1. |ins| > 0 ∧ |outs| > 0
    /// 2. |tx ∖ witness| ≤ M_max_tx_size
    /// 3. ∀o ∈ outs: 0 ≤ o.value ≤ M_max and Σ o.value ≤ M_max
    /// 4. no two inputs spend the same outpoint
    /// 5. coinbase: 2 ≤ |scriptSig| ≤ 100; otherwise no input spends the null outpoint
    pub fn check_sanity(&self) -> ValidationResult {
        let result = self.sanity_reason().map_or(ValidationResult::Valid, |reason| {
            ValidationResult::Invalid(reason.to_string())
        });
        if let ValidationResult::Invalid(reason) = &result {
            debug!("transaction failed sanity check: {}", reason);
        }
        result
    }

    pub fn is_sane(&self) -> bool {
        self.check_sanity().is_valid()
    }

    fn sanity_reason(&self) -> Option<&'static str> {
        if self.inputs.is_empty() {
            return Some("bad-txns-vin-empty");
        }
        if self.outputs.is_empty() {
            return Some("bad-txns-vout-empty");
        }
        if self.get_base_size() > MAX_TX_SIZE {
            return Some("bad-txns-oversize");
        }

        let mut total: Integer = 0;
        for output in &self.outputs {
            if output.value < 0 {
                return Some("bad-txns-vout-negative");
            }
            if output.value > MAX_MONEY {
                return Some("bad-txns-vout-toolarge");
            }
            total = match total.checked_add(output.value) {
                Some(sum) if sum <= MAX_MONEY => sum,
                _ => return Some("bad-txns-txouttotal-toolarge"),
            };
        }

        let mut seen = HashSet::with_capacity(self.inputs.len());
        if !self.inputs.iter().all(|input| seen.insert(input.prevout)) {
            return Some("bad-txns-inputs-duplicate");
        }

        if self.is_coinbase() {
            let size = self.inputs[0].script_sig.len();
            if !(2..=100).contains(&size) {
                return Some("bad-cb-length");
            }
        } else if self.inputs.iter().any(|input| input.prevout.is_null()) {
            return Some("bad-txns-prevout-null");
        }

        None
    }

    /// CheckTxInputs: 𝒯𝒳 × 𝒞𝒱 × ℕ → {valid, invalid}
    ///
    /// Every input must resolve to a coin, coinbase coins must be mature at
    /// `spend_height` (skipped when either height is -1), and both the input
    /// and output sums must stay within `[0, MAX_MONEY]` at every step.
    /// The fee, inputs minus outputs, must not be negative.
    pub fn check_inputs(&self, view: &CoinView, spend_height: i32) -> bool {
        match self.check_inputs_reason(view, spend_height) {
            None => true,
            Some(reason) => {
                debug!("transaction {} failed input check: {}", hex::encode(self.hash()), reason);
                false
            }
        }
    }

    fn check_inputs_reason(&self, view: &CoinView, spend_height: i32) -> Option<&'static str> {
        let mut total_in: Integer = 0;
        for input in &self.inputs {
            let Some(coin) = view.get_output(input) else {
                return Some("bad-txns-inputs-missingorspent");
            };

            if coin.coinbase
                && spend_height != -1
                && coin.height != -1
                && spend_height - coin.height < COINBASE_MATURITY
            {
                return Some("bad-txns-premature-spend-of-coinbase");
            }

            if !(0..=MAX_MONEY).contains(&coin.value) {
                return Some("bad-txns-inputvalues-outofrange");
            }
            total_in = match total_in.checked_add(coin.value) {
                Some(sum) if sum <= MAX_MONEY => sum,
                _ => return Some("bad-txns-inputvalues-outofrange"),
            };
        }

        let mut total_out: Integer = 0;
        for output in &self.outputs {
            if !(0..=MAX_MONEY).contains(&output.value) {
                return Some("bad-txns-vout-outofrange");
            }
            total_out = match total_out.checked_add(output.value) {
                Some(sum) if sum <= MAX_MONEY => sum,
                _ => return Some("bad-txns-txouttotal-toolarge"),
            };
        }

        if total_in < total_out {
            return Some("bad-txns-in-belowout");
        }
        if total_in - total_out > MAX_MONEY {
            return Some("bad-txns-fee-outofrange");
        }

        None
    }

    /// Sum of output values, `None` on overflow
    pub fn get_output_value(&self) -> Option<Integer> {
        self.outputs
            .iter()
            .try_fold(0i64, |total, output| total.checked_add(output.value))
    }

    /// Sum of the spent coin values, `None` if a coin is missing or on overflow
    pub fn get_input_value(&self, view: &CoinView) -> Option<Integer> {
        self.inputs.iter().try_fold(0i64, |total, input| {
            total.checked_add(view.get_output(input)?.value)
        })
    }

    /// Inputs minus outputs; may be negative for an overspending transaction
    pub fn get_fee(&self, view: &CoinView) -> Option<Integer> {
        self.get_input_value(view)?
            .checked_sub(self.get_output_value()?)
    }

    /// Verifies every input whose coin is in `view`
    ///
    /// A transaction without inputs never verifies. A coinbase always does.
    /// Inputs whose coin is missing are skipped.
    pub fn verify(&self, view: &CoinView, flags: u32) -> bool {
        if self.inputs.is_empty() {
            return false;
        }
        if self.is_coinbase() {
            return true;
        }

        for (index, input) in self.inputs.iter().enumerate() {
            let Some(coin) = view.get_output(input) else {
                trace!("input {} spends a coin missing from the view, skipping", index);
                continue;
            };
            if !self.verify_input(index, coin, flags) {
                return false;
            }
        }
        true
    }

    /// [`Transaction::verify`] under the standard rule set
    pub fn verify_standard(&self, view: &CoinView) -> bool {
        self.verify(view, STANDARD_VERIFY_FLAGS)
    }

    pub fn verify_input(&self, index: usize, coin: &Coin, flags: u32) -> bool {
        match self.verify_input_detailed(index, coin, flags) {
            Ok(()) => true,
            Err(err) => {
                trace!("input {} of {} failed: {}", index, hex::encode(self.hash()), err);
                false
            }
        }
    }

    /// Like [`Transaction::verify_input`] but reports why the script failed
    pub fn verify_input_detailed(
        &self,
        index: usize,
        coin: &Coin,
        flags: u32,
    ) -> std::result::Result<(), ScriptError> {
        let input = self.inputs.get(index).ok_or(ScriptError::UnknownError)?;
        let checker = TransactionSignatureChecker::new(self, index, coin.value);
        verify_script(&input.script_sig, &coin.script, &input.witness, flags, &checker)
    }

    pub fn get_sigops_cost(&self, view: &CoinView, flags: u32) -> usize {
        get_sigops_cost(self, view, flags)
    }

    pub fn signature_hash(
        &self,
        index: usize,
        subscript: &Script,
        value: Integer,
        sighash_type: u32,
        version: SigVersion,
    ) -> Result<Hash> {
        signature_hash(self, index, subscript, value, sighash_type, version)
    }
}
