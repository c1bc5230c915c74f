//! # UTXO-Consensus
//!
//! Transaction validation core for a UTXO ledger with Script locking
//! conditions and segregated witness.
//!
//! The crate decodes and encodes transactions, computes their identity
//! hashes and signature hashes, runs context-free sanity checks, checks
//! input values against a [`CoinView`], counts signature operations and
//! executes the script interpreter for every input.
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: validation never mutates the transaction or the view
//! 2. **Exact Version Pinning**: consensus-critical cryptography is pinned to exact versions
//! 3. **Booleans for Validity**: an invalid transaction is an answer, not an error;
//!    [`ConsensusError`] is reserved for malformed input and misuse
//!
//! ## Usage
//!
//! ```rust
//! use utxo_consensus::TxValidator;
//! use utxo_consensus::types::*;
//! use utxo_consensus::{CoinView, Script};
//!
//! let validator = TxValidator::new();
//! let tx = Transaction::new(
//!     1,
//!     vec![TransactionInput {
//!         prevout: OutPoint::new([1; 32], 0),
//!         script_sig: Script::new().push_int(1),
//!         witness: vec![],
//!         sequence: 0xffffffff,
//!     }],
//!     vec![TransactionOutput {
//!         value: 1000,
//!         script_pubkey: Script::new(),
//!     }],
//!     0,
//! );
//!
//! let mut view = CoinView::new();
//! view.add_output(
//!     OutPoint::new([1; 32], 0),
//!     &TransactionOutput { value: 1500, script_pubkey: Script::new() },
//! );
//!
//! assert_eq!(validator.check_sanity(&tx), ValidationResult::Valid);
//! assert!(validator.check_inputs(&tx, &view, -1));
//! assert!(validator.verify(&tx, &view, utxo_consensus::flags::STANDARD_VERIFY_FLAGS));
//! ```

pub mod types;
pub mod constants;
pub mod error;
pub mod serialization;
pub mod opcodes;
pub mod script;
pub mod flags;
pub mod coins;
pub mod sighash;
pub mod interpreter;
pub mod sigops;
pub mod transaction;
pub mod segwit;

// Re-export commonly used types
pub use types::*;
pub use constants::*;
pub use error::{ConsensusError, Result, ScriptError};
pub use script::Script;
pub use segwit::Witness;
pub use coins::{Coin, CoinView};
pub use sighash::SigVersion;

/// Stateless entry point over the validation rules
///
/// # Examples
///
/// ```
/// use utxo_consensus::TxValidator;
///
/// let validator = TxValidator::new();
/// let tx = validator.decode_transaction("01000000000000000000").unwrap();
/// assert!(!validator.is_sane(&tx));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TxValidator;

impl TxValidator {
    /// Create a new validator instance
    ///
    /// # Examples
    ///
    /// ```
    /// use utxo_consensus::TxValidator;
    ///
    /// let validator = TxValidator::new();
    /// ```
    pub fn new() -> Self {
        Self
    }

    /// Decode a transaction from hex-encoded wire bytes
    pub fn decode_transaction(&self, hex: &str) -> Result<Transaction> {
        Transaction::from_hex(hex)
    }

    /// Encode a transaction, including witness data when present
    pub fn encode_transaction(&self, tx: &Transaction) -> Vec<u8> {
        tx.to_raw()
    }

    /// Context-free structural checks
    ///
    /// # Examples
    ///
    /// ```
    /// use utxo_consensus::{TxValidator, Script, MAX_MONEY};
    /// use utxo_consensus::types::*;
    ///
    /// let validator = TxValidator::new();
    /// let tx = Transaction::new(
    ///     1,
    ///     vec![TransactionInput {
    ///         prevout: OutPoint::new([1; 32], 0),
    ///         script_sig: Script::new(),
    ///         witness: vec![],
    ///         sequence: 0xffffffff,
    ///     }],
    ///     vec![TransactionOutput { value: MAX_MONEY + 1, script_pubkey: Script::new() }],
    ///     0,
    /// );
    ///
    /// assert_eq!(
    ///     validator.check_sanity(&tx),
    ///     ValidationResult::Invalid("bad-txns-vout-toolarge".to_string())
    /// );
    /// ```
    pub fn check_sanity(&self, tx: &Transaction) -> ValidationResult {
        tx.check_sanity()
    }

    /// Boolean form of [`TxValidator::check_sanity`]
    pub fn is_sane(&self, tx: &Transaction) -> bool {
        tx.is_sane()
    }

    /// Check input values and coinbase maturity against the coin view
    pub fn check_inputs(&self, tx: &Transaction, view: &CoinView, spend_height: i32) -> bool {
        tx.check_inputs(view, spend_height)
    }

    /// Fee paid by `tx`, `None` when a coin is missing
    pub fn get_fee(&self, tx: &Transaction, view: &CoinView) -> Option<Integer> {
        tx.get_fee(view)
    }

    /// Run the script interpreter for every input with a coin in `view`
    ///
    /// # Examples
    ///
    /// ```
    /// use utxo_consensus::{TxValidator, CoinView, Script};
    /// use utxo_consensus::flags::VERIFY_P2SH;
    /// use utxo_consensus::types::*;
    ///
    /// let validator = TxValidator::new();
    /// let prevout = OutPoint::new([7; 32], 0);
    /// let tx = Transaction::new(
    ///     1,
    ///     vec![TransactionInput {
    ///         prevout,
    ///         script_sig: Script::from_string("1 1").unwrap(),
    ///         witness: vec![],
    ///         sequence: 0xffffffff,
    ///     }],
    ///     vec![TransactionOutput { value: 0, script_pubkey: Script::new() }],
    ///     0,
    /// );
    ///
    /// let mut view = CoinView::new();
    /// view.add_output(prevout, &TransactionOutput {
    ///     value: 0,
    ///     script_pubkey: Script::from_string("EQUAL").unwrap(),
    /// });
    /// assert!(validator.verify(&tx, &view, VERIFY_P2SH));
    /// ```
    pub fn verify(&self, tx: &Transaction, view: &CoinView, flags: u32) -> bool {
        tx.verify(view, flags)
    }

    /// Verify one input against an explicit coin
    pub fn verify_input(&self, tx: &Transaction, index: usize, coin: &Coin, flags: u32) -> bool {
        tx.verify_input(index, coin, flags)
    }

    /// Execute a scriptSig/scriptPubKey/witness triple against a checker
    pub fn verify_script(
        &self,
        script_sig: &Script,
        script_pubkey: &Script,
        witness: &Witness,
        flags: u32,
        checker: &dyn interpreter::SignatureChecker,
    ) -> std::result::Result<(), ScriptError> {
        interpreter::verify_script(script_sig, script_pubkey, witness, flags, checker)
    }

    /// Weighted signature operation cost
    pub fn get_sigops_cost(&self, tx: &Transaction, view: &CoinView, flags: u32) -> usize {
        tx.get_sigops_cost(view, flags)
    }

    /// Digest signed by input `index`
    pub fn signature_hash(
        &self,
        tx: &Transaction,
        index: usize,
        subscript: &Script,
        value: Integer,
        sighash_type: u32,
        version: SigVersion,
    ) -> Result<Hash> {
        sighash::signature_hash(tx, index, subscript, value, sighash_type, version)
    }

    /// Parse a comma-separated list of flag names
    ///
    /// # Examples
    ///
    /// ```
    /// use utxo_consensus::TxValidator;
    /// use utxo_consensus::flags::{VERIFY_P2SH, VERIFY_WITNESS};
    ///
    /// let validator = TxValidator::new();
    /// assert_eq!(validator.parse_flags("P2SH,WITNESS").unwrap(), VERIFY_P2SH | VERIFY_WITNESS);
    /// assert!(validator.parse_flags("BOGUS").is_err());
    /// ```
    pub fn parse_flags(&self, text: &str) -> Result<u32> {
        flags::parse_flags(text)
    }
}
