//! Transaction wire format serialization/deserialization
//!
//! Layout (little-endian integers):
//! - Version (4 bytes, signed)
//! - Optional marker 0x00 and flag 0x01 when witness data follows
//! - Input count (VarInt), inputs
//! - Output count (VarInt), outputs
//! - One witness stack per input when the marker is present
//! - Lock time (4 bytes)
//!
//! Decoding is strict: any buffer that does not re-encode to exactly the same
//! bytes is rejected with [`ConsensusError::Serialization`].

use crate::constants::MAX_SAFE_INTEGER;
use crate::error::{ConsensusError, Result};
use crate::script::Script;
use crate::segwit::Witness;
use crate::types::*;
use bitcoin_hashes::{sha256, sha256d, Hash as BitcoinHash, HashEngine};

/// Upper bound on any length prefix, matching the reference client's MAX_SIZE
const MAX_VECTOR_SIZE: u64 = 0x0200_0000;

/// Destination for encoded bytes: a buffer or a running hash engine.
pub trait Encoder {
    fn put(&mut self, bytes: &[u8]);

    fn put_u8(&mut self, value: u8) {
        self.put(&[value]);
    }

    fn put_u32(&mut self, value: u32) {
        self.put(&value.to_le_bytes());
    }

    fn put_i32(&mut self, value: i32) {
        self.put(&value.to_le_bytes());
    }

    fn put_i64(&mut self, value: i64) {
        self.put(&value.to_le_bytes());
    }

    fn put_varint(&mut self, value: u64) {
        if value < 0xfd {
            self.put_u8(value as u8);
        } else if value <= 0xffff {
            self.put_u8(0xfd);
            self.put(&(value as u16).to_le_bytes());
        } else if value <= 0xffff_ffff {
            self.put_u8(0xfe);
            self.put(&(value as u32).to_le_bytes());
        } else {
            self.put_u8(0xff);
            self.put(&value.to_le_bytes());
        }
    }

    fn put_var_bytes(&mut self, bytes: &[u8]) {
        self.put_varint(bytes.len() as u64);
        self.put(bytes);
    }
}

impl Encoder for Vec<u8> {
    fn put(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

impl Encoder for sha256::HashEngine {
    fn put(&mut self, bytes: &[u8]) {
        self.input(bytes);
    }
}

/// Encode a u64 value as a VarInt
///
/// # Examples
///
/// ```
/// use utxo_consensus::serialization::encode_varint;
///
/// assert_eq!(encode_varint(252), vec![252]);
/// assert_eq!(encode_varint(253), vec![0xfd, 253, 0]);
/// assert_eq!(encode_varint(65536), vec![0xfe, 0, 0, 1, 0]);
/// ```
pub fn encode_varint(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(9);
    out.put_varint(value);
    out
}

/// Number of bytes the VarInt encoding of `value` occupies
pub fn varint_size(value: u64) -> usize {
    match value {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

/// Double SHA-256 of a byte slice
pub fn sha256d_hash(data: &[u8]) -> Hash {
    sha256d::Hash::hash(data).into_inner()
}

/// Finishes an engine fed through [`Encoder`] as a double SHA-256
pub fn finish_sha256d(engine: sha256::HashEngine) -> Hash {
    sha256d::Hash::from_engine(engine).into_inner()
}

/// Cursor over a byte buffer with bounds-checked little-endian reads.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn peek_u8(&self, offset: usize) -> Option<u8> {
        self.data.get(self.pos + offset).copied()
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(ConsensusError::Serialization(format!(
                "Unexpected end of data: need {} bytes at offset {}, have {}",
                len,
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_hash(&mut self) -> Result<Hash> {
        self.read_array()
    }

    /// Reads a signed 64-bit integer that must fit in 53 bits of magnitude.
    pub fn read_safe_i64(&mut self) -> Result<i64> {
        let offset = self.pos;
        let value = i64::from_le_bytes(self.read_array()?);
        if value > MAX_SAFE_INTEGER || value < -MAX_SAFE_INTEGER {
            return Err(ConsensusError::Serialization(format!(
                "Number exceeds 2^53-1 at offset {}",
                offset
            )));
        }
        Ok(value)
    }

    /// Reads a canonically encoded VarInt.
    pub fn read_varint(&mut self) -> Result<u64> {
        let offset = self.pos;
        let (value, min) = match self.read_u8()? {
            0xfd => (self.read_u16()? as u64, 0xfd),
            0xfe => (self.read_u32()? as u64, 0x1_0000),
            0xff => (self.read_u64()?, 0x1_0000_0000),
            byte => (byte as u64, 0),
        };
        if value < min {
            return Err(ConsensusError::Serialization(format!(
                "Non-canonical VarInt at offset {}",
                offset
            )));
        }
        Ok(value)
    }

    /// Reads a length prefix bounded by the bytes left in the buffer.
    pub fn read_length(&mut self) -> Result<usize> {
        let len = self.read_varint()?;
        if len > MAX_VECTOR_SIZE || len > self.remaining() as u64 {
            return Err(ConsensusError::Serialization(format!(
                "Length prefix {} exceeds available data",
                len
            )));
        }
        Ok(len as usize)
    }

    pub fn read_var_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_length()?;
        self.read_bytes(len)
    }
}

/// Serialize a transaction, including the witness envelope when `witness` is set
pub fn serialize_transaction<E: Encoder>(tx: &Transaction, out: &mut E, witness: bool) {
    out.put_i32(tx.version);
    if witness {
        out.put_u8(0x00);
        out.put_u8(0x01);
    }

    out.put_varint(tx.inputs.len() as u64);
    for input in &tx.inputs {
        serialize_outpoint(&input.prevout, out);
        out.put_var_bytes(input.script_sig.as_bytes());
        out.put_u32(input.sequence);
    }

    out.put_varint(tx.outputs.len() as u64);
    for output in &tx.outputs {
        serialize_output(output, out);
    }

    if witness {
        for input in &tx.inputs {
            serialize_witness(&input.witness, out);
        }
    }

    out.put_u32(tx.lock_time);
}

pub fn serialize_outpoint<E: Encoder>(outpoint: &OutPoint, out: &mut E) {
    out.put(&outpoint.hash);
    out.put_u32(outpoint.index);
}

pub fn serialize_output<E: Encoder>(output: &TransactionOutput, out: &mut E) {
    out.put_i64(output.value);
    out.put_var_bytes(output.script_pubkey.as_bytes());
}

pub fn serialize_witness<E: Encoder>(witness: &Witness, out: &mut E) {
    out.put_varint(witness.len() as u64);
    for item in witness {
        out.put_var_bytes(item);
    }
}

/// Size in bytes of a serialized witness stack
pub fn witness_serialized_size(witness: &Witness) -> usize {
    varint_size(witness.len() as u64)
        + witness
            .iter()
            .map(|item| varint_size(item.len() as u64) + item.len())
            .sum::<usize>()
}

/// Deserialize a transaction from its wire bytes, rejecting trailing data
pub fn deserialize_transaction(data: &[u8]) -> Result<Transaction> {
    let mut reader = Reader::new(data);
    let tx = read_transaction(&mut reader)?;
    if !reader.is_empty() {
        return Err(ConsensusError::Serialization(format!(
            "{} trailing bytes after transaction",
            reader.remaining()
        )));
    }
    Ok(tx)
}

/// Read one transaction from the reader's current position
pub fn read_transaction(reader: &mut Reader<'_>) -> Result<Transaction> {
    let version = reader.read_i32()?;

    let mut witness_flag = false;
    if reader.peek_u8(0) == Some(0x00) {
        if let Some(flag) = reader.peek_u8(1) {
            if flag != 0x00 {
                if flag != 0x01 {
                    return Err(ConsensusError::Serialization(format!(
                        "Unknown transaction flag 0x{:02x}",
                        flag
                    )));
                }
                reader.read_bytes(2)?;
                witness_flag = true;
            }
        }
    }

    let input_count = reader.read_length()?;
    let mut inputs = Vec::with_capacity(input_count);
    for _ in 0..input_count {
        let hash = reader.read_hash()?;
        let index = reader.read_u32()?;
        let script_sig = Script::from_raw(reader.read_var_bytes()?);
        let sequence = reader.read_u32()?;
        inputs.push(TransactionInput {
            prevout: OutPoint { hash, index },
            script_sig,
            witness: Witness::new(),
            sequence,
        });
    }

    let output_count = reader.read_length()?;
    let mut outputs = Vec::with_capacity(output_count);
    for _ in 0..output_count {
        let value = reader.read_safe_i64()?;
        let script_pubkey = Script::from_raw(reader.read_var_bytes()?);
        outputs.push(TransactionOutput { value, script_pubkey });
    }

    if witness_flag {
        for input in inputs.iter_mut() {
            let count = reader.read_length()?;
            let mut witness = Witness::with_capacity(count);
            for _ in 0..count {
                witness.push(reader.read_var_bytes()?.to_vec());
            }
            input.witness = witness;
        }
    }

    let lock_time = reader.read_u32()?;

    let mut tx = Transaction::new(version, inputs, outputs, lock_time);
    tx.witness_flag = witness_flag;
    Ok(tx)
}
