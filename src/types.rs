//! Core transaction types for consensus validation

use crate::error::{ConsensusError, Result};
use crate::script::Script;
use crate::segwit::Witness;
use crate::sighash::WitnessMidstate;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Hash type: 256-bit hash
pub type Hash = [u8; 32];

/// Byte string type
pub type ByteString = Vec<u8>;

/// Integer type used for monetary values
pub type Integer = i64;

/// OutPoint: 𝒪 = ℍ × ℕ₃₂
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub hash: Hash,
    pub index: u32,
}

impl OutPoint {
    pub fn new(hash: Hash, index: u32) -> Self {
        Self { hash, index }
    }

    /// Sentinel outpoint carried by a coinbase input
    pub fn null() -> Self {
        Self { hash: [0u8; 32], index: 0xffffffff }
    }

    pub fn is_null(&self) -> bool {
        self.index == 0xffffffff && self.hash == [0u8; 32]
    }
}

/// Transaction Input: ℐ = 𝒪 × 𝕊 × 𝒲 × ℕ₃₂
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub prevout: OutPoint,
    pub script_sig: Script,
    pub witness: Witness,
    pub sequence: u32,
}

/// Transaction Output: 𝒯 = ℤ × 𝕊
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub value: Integer,
    pub script_pubkey: Script,
}

/// Transaction: 𝒯𝒳 = ℤ₃₂ × ℐ* × 𝒯* × ℕ₃₂
///
/// Identity hashes and witness sighash midstates are memoized on first use.
/// After mutating any field call [`Transaction::refresh`] so the next read
/// recomputes them. Cloning yields a transaction with an empty cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u32,
    /// Set when the source encoding carried the witness marker and flag
    pub witness_flag: bool,
    #[serde(skip)]
    pub(crate) cache: HashCache,
}

impl Transaction {
    pub fn new(
        version: i32,
        inputs: Vec<TransactionInput>,
        outputs: Vec<TransactionOutput>,
        lock_time: u32,
    ) -> Self {
        Self {
            version,
            inputs,
            outputs,
            lock_time,
            witness_flag: false,
            cache: HashCache::default(),
        }
    }
}

/// Lazily computed per-transaction digests.
#[derive(Debug, Default)]
pub(crate) struct HashCache {
    pub(crate) hash: OnceLock<Hash>,
    pub(crate) witness_hash: OnceLock<Hash>,
    pub(crate) witness_midstate: OnceLock<WitnessMidstate>,
}

impl HashCache {
    pub(crate) fn is_empty(&self) -> bool {
        self.hash.get().is_none()
            && self.witness_hash.get().is_none()
            && self.witness_midstate.get().is_none()
    }
}

// A copied transaction may be mutated independently, so it starts cold.
impl Clone for HashCache {
    fn clone(&self) -> Self {
        Self::default()
    }
}

// Cached digests are derived data and never distinguish two transactions.
impl PartialEq for HashCache {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for HashCache {}

/// Validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(String),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// Turns a rejection into [`ConsensusError::TransactionValidation`]
    pub fn into_result(self) -> Result<()> {
        match self {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Invalid(reason) => Err(ConsensusError::TransactionValidation(reason)),
        }
    }
}
