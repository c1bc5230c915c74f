//! Script representation, parsing and standard templates
//!
//! A [`Script`] wraps the raw serialized bytes. Instructions are decoded on
//! demand by [`Script::instructions`], so a script with a malformed trailing
//! push can still be stored, hashed and re-serialized byte-for-byte. Every
//! transformation returns a new `Script`.

use crate::constants::MAX_MULTISIG_PUBKEYS;
use crate::error::{ConsensusError, Result, ScriptError};
use crate::opcodes::*;
use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Script: 𝕊 = 𝔹* (opcodes and length-prefixed pushes)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Script(Vec<u8>);

/// A decoded script element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction<'a> {
    /// A data push (OP_0 and OP_PUSHBYTES/PUSHDATA forms)
    Push { opcode: u8, data: &'a [u8] },
    /// Any other opcode, including OP_1NEGATE and OP_1..OP_16
    Op(u8),
}

impl<'a> Instruction<'a> {
    pub fn opcode(&self) -> u8 {
        match self {
            Instruction::Push { opcode, .. } => *opcode,
            Instruction::Op(op) => *op,
        }
    }

    pub fn push_data(&self) -> Option<&'a [u8]> {
        match self {
            Instruction::Push { data, .. } => Some(data),
            Instruction::Op(_) => None,
        }
    }
}

/// Iterator over `(byte offset, instruction)` pairs. Yields one error and
/// then stops when a push runs past the end of the script.
pub struct Instructions<'a> {
    bytes: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> Iterator for Instructions<'a> {
    type Item = std::result::Result<(usize, Instruction<'a>), ScriptError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.bytes.len() {
            return None;
        }
        let start = self.pos;
        match read_instruction(self.bytes, start) {
            Ok((instruction, next)) => {
                self.pos = next;
                Some(Ok((start, instruction)))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

fn read_instruction(bytes: &[u8], pos: usize) -> std::result::Result<(Instruction<'_>, usize), ScriptError> {
    let opcode = bytes[pos];
    let mut cursor = pos + 1;
    let len = match opcode {
        0x00..=0x4b => opcode as usize,
        OP_PUSHDATA1 => {
            let width = bytes.get(cursor..cursor + 1).ok_or(ScriptError::BadOpcode)?;
            cursor += 1;
            width[0] as usize
        }
        OP_PUSHDATA2 => {
            let width = bytes.get(cursor..cursor + 2).ok_or(ScriptError::BadOpcode)?;
            cursor += 2;
            u16::from_le_bytes([width[0], width[1]]) as usize
        }
        OP_PUSHDATA4 => {
            let width = bytes.get(cursor..cursor + 4).ok_or(ScriptError::BadOpcode)?;
            cursor += 4;
            u32::from_le_bytes([width[0], width[1], width[2], width[3]]) as usize
        }
        _ => return Ok((Instruction::Op(opcode), cursor)),
    };
    let end = cursor.checked_add(len).ok_or(ScriptError::BadOpcode)?;
    let data = bytes.get(cursor..end).ok_or(ScriptError::BadOpcode)?;
    Ok((Instruction::Push { opcode, data }, end))
}

impl Script {
    pub fn new() -> Self {
        Script(Vec::new())
    }

    pub fn from_raw(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn instructions(&self) -> Instructions<'_> {
        Instructions { bytes: &self.0, pos: 0, done: false }
    }

    // ------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------

    pub fn push_opcode(mut self, opcode: u8) -> Self {
        self.0.push(opcode);
        self
    }

    /// Appends `data` with the shortest length prefix for its size
    pub fn push_slice(mut self, data: &[u8]) -> Self {
        let len = data.len();
        if len < OP_PUSHDATA1 as usize {
            self.0.push(len as u8);
        } else if len <= 0xff {
            self.0.push(OP_PUSHDATA1);
            self.0.push(len as u8);
        } else if len <= 0xffff {
            self.0.push(OP_PUSHDATA2);
            self.0.extend_from_slice(&(len as u16).to_le_bytes());
        } else {
            self.0.push(OP_PUSHDATA4);
            self.0.extend_from_slice(&(len as u32).to_le_bytes());
        }
        self.0.extend_from_slice(data);
        self
    }

    /// Appends an integer as OP_1NEGATE/OP_0..OP_16 or a script number push
    pub fn push_int(self, value: i64) -> Self {
        match value {
            -1 => self.push_opcode(OP_1NEGATE),
            0 => self.push_opcode(OP_0),
            1..=16 => self.push_opcode(OP_1 + (value as u8) - 1),
            _ => self.push_slice(&ScriptNum::encode(value)),
        }
    }

    /// Parses the human-readable mnemonic language
    ///
    /// Tokens are separated by whitespace:
    /// - decimal integers push a number (`-1`, `0`..`16` use the small-int opcodes)
    /// - `0x`-prefixed hex is inserted verbatim as raw script bytes
    /// - `'text'` pushes the enclosed bytes
    /// - opcode names, with or without the `OP_` prefix
    ///
    /// # Examples
    ///
    /// ```
    /// use utxo_consensus::script::Script;
    ///
    /// let script = Script::from_string("DUP HASH160 0x14 0x89abcdefabbaabbaabbaabbaabbaabbaabbaabba EQUALVERIFY CHECKSIG").unwrap();
    /// assert_eq!(script.len(), 25);
    /// assert!(Script::from_string("NOT_AN_OPCODE").is_err());
    /// ```
    pub fn from_string(text: &str) -> Result<Script> {
        let mut script = Script::new();
        for token in text.split_whitespace() {
            script = if is_decimal(token) {
                let value: i64 = token.parse().map_err(|_| {
                    ConsensusError::ScriptParse(format!("Integer out of range: {}", token))
                })?;
                if !(-0xffff_ffffi64..=0xffff_ffff).contains(&value) {
                    return Err(ConsensusError::ScriptParse(format!(
                        "Integer out of range: {}",
                        token
                    )));
                }
                script.push_int(value)
            } else if let Some(digits) = token.strip_prefix("0x").filter(|h| !h.is_empty()) {
                let raw = hex::decode(digits).map_err(|_| {
                    ConsensusError::ScriptParse(format!("Invalid hex literal: {}", token))
                })?;
                script.0.extend_from_slice(&raw);
                script
            } else if token.len() >= 2 && token.starts_with('\'') && token.ends_with('\'') {
                script.push_slice(&token.as_bytes()[1..token.len() - 1])
            } else if let Some(opcode) = opcode_from_name(token) {
                script.push_opcode(opcode)
            } else {
                return Err(ConsensusError::ScriptParse(format!("Unknown token: {}", token)));
            };
        }
        Ok(script)
    }

    // ------------------------------------------------------------------
    // Standard templates
    // ------------------------------------------------------------------

    /// OP_m <pubkey>... OP_n OP_CHECKMULTISIG
    pub fn from_multisig(m: usize, n: usize, pubkeys: &[Vec<u8>]) -> Result<Script> {
        if pubkeys.len() != n {
            return Err(ConsensusError::ScriptParse(format!(
                "Multisig expects {} keys, got {}",
                n,
                pubkeys.len()
            )));
        }
        if m < 1 || m > n || n > 16 {
            return Err(ConsensusError::ScriptParse(format!(
                "Invalid multisig parameters {}-of-{}",
                m, n
            )));
        }
        let mut script = Script::new().push_int(m as i64);
        for key in pubkeys {
            script = script.push_slice(key);
        }
        Ok(script.push_int(n as i64).push_opcode(OP_CHECKMULTISIG))
    }

    /// OP_HASH160 <20 bytes> OP_EQUAL
    pub fn from_scripthash(hash: &[u8; 20]) -> Script {
        Script::new()
            .push_opcode(OP_HASH160)
            .push_slice(hash)
            .push_opcode(OP_EQUAL)
    }

    /// OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG
    pub fn from_pubkeyhash(hash: &[u8]) -> Script {
        Script::new()
            .push_opcode(OP_DUP)
            .push_opcode(OP_HASH160)
            .push_slice(hash)
            .push_opcode(OP_EQUALVERIFY)
            .push_opcode(OP_CHECKSIG)
    }

    /// <version> <program>, the witness program output template
    pub fn from_program(version: u8, program: &[u8]) -> Result<Script> {
        let version_op = encode_op_n(version).ok_or_else(|| {
            ConsensusError::ScriptParse(format!("Invalid witness version {}", version))
        })?;
        if !(2..=40).contains(&program.len()) {
            return Err(ConsensusError::ScriptParse(format!(
                "Invalid witness program length {}",
                program.len()
            )));
        }
        Ok(Script::new().push_opcode(version_op).push_slice(program))
    }

    // ------------------------------------------------------------------
    // Transforms
    // ------------------------------------------------------------------

    /// Script from the instruction at `index` onward
    ///
    /// The interpreter passes the position just past the last executed
    /// OP_CODESEPARATOR; `0` yields the whole script.
    pub fn get_subscript(&self, index: usize) -> Script {
        if index == 0 {
            return self.clone();
        }
        match self.instructions().nth(index) {
            Some(Ok((offset, _))) => Script(self.0[offset..].to_vec()),
            Some(Err(_)) | None => Script::new(),
        }
    }

    /// Copy with every OP_CODESEPARATOR removed
    pub fn remove_separators(&self) -> Script {
        let mut out = Vec::with_capacity(self.0.len());
        let mut pos = 0;
        while pos < self.0.len() {
            match read_instruction(&self.0, pos) {
                Ok((instruction, next)) => {
                    if instruction.opcode() != OP_CODESEPARATOR {
                        out.extend_from_slice(&self.0[pos..next]);
                    }
                    pos = next;
                }
                Err(_) => {
                    out.extend_from_slice(&self.0[pos..]);
                    break;
                }
            }
        }
        Script(out)
    }

    /// Removes every instruction-aligned occurrence of `pattern`.
    /// Returns the new script and how many occurrences were removed.
    pub fn find_and_delete(&self, pattern: &Script) -> (Script, usize) {
        let needle = pattern.as_bytes();
        if needle.is_empty() {
            return (self.clone(), 0);
        }

        let bytes = &self.0;
        let mut result = Vec::with_capacity(bytes.len());
        let mut found = 0;
        let mut pc = 0;
        let mut copied_to = 0;
        loop {
            result.extend_from_slice(&bytes[copied_to..pc]);
            while bytes.len() - pc >= needle.len() && &bytes[pc..pc + needle.len()] == needle {
                pc += needle.len();
                found += 1;
            }
            copied_to = pc;
            if pc >= bytes.len() {
                break;
            }
            match read_instruction(bytes, pc) {
                Ok((_, next)) => pc = next,
                Err(_) => break,
            }
        }

        if found == 0 {
            return (self.clone(), 0);
        }
        result.extend_from_slice(&bytes[copied_to..]);
        (Script(result), found)
    }

    // ------------------------------------------------------------------
    // Hashing and template recognition
    // ------------------------------------------------------------------

    /// RIPEMD160(SHA256(script))
    pub fn hash160(&self) -> [u8; 20] {
        hash160(&self.0)
    }

    pub fn sha256(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&Sha256::digest(&self.0));
        out
    }

    /// OP_HASH160 <20 bytes> OP_EQUAL
    pub fn is_p2sh(&self) -> bool {
        self.0.len() == 23 && self.0[0] == OP_HASH160 && self.0[1] == 0x14 && self.0[22] == OP_EQUAL
    }

    /// Version and program of a witness program output, if this is one
    pub fn witness_program(&self) -> Option<(u8, &[u8])> {
        let bytes = &self.0;
        if bytes.len() < 4 || bytes.len() > 42 {
            return None;
        }
        if bytes[0] != OP_0 && !(OP_1..=OP_16).contains(&bytes[0]) {
            return None;
        }
        if bytes[1] as usize + 2 != bytes.len() {
            return None;
        }
        let version = decode_op_n(bytes[0])?;
        Some((version, &bytes[2..]))
    }

    pub fn is_witness_program(&self) -> bool {
        self.witness_program().is_some()
    }

    /// True when every instruction is a push or a small-integer opcode
    pub fn is_push_only(&self) -> bool {
        self.instructions().all(|item| match item {
            Ok((_, instruction)) => instruction.opcode() <= OP_16,
            Err(_) => false,
        })
    }

    /// The last element a push-only script leaves on the stack, as a script
    pub fn get_redeem(&self) -> Option<Script> {
        let mut last = None;
        for item in self.instructions() {
            let (_, instruction) = item.ok()?;
            if instruction.opcode() > OP_16 {
                return None;
            }
            last = Some(instruction);
        }
        last.map(|instruction| Script::from_raw(instruction.push_data().unwrap_or(&[])))
    }

    /// Counts signature operations
    ///
    /// CHECKSIG counts one. CHECKMULTISIG counts the preceding OP_1..OP_16
    /// when `accurate` is set, otherwise (or after any other opcode,
    /// OP_0 included) the maximum of 20.
    pub fn count_sigops(&self, accurate: bool) -> usize {
        let mut total = 0;
        let mut last_opcode = OP_INVALIDOPCODE;
        for item in self.instructions() {
            let Ok((_, instruction)) = item else {
                break;
            };
            let opcode = instruction.opcode();
            match opcode {
                OP_CHECKSIG | OP_CHECKSIGVERIFY => total += 1,
                OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => {
                    if accurate && (OP_1..=OP_16).contains(&last_opcode) {
                        total += (last_opcode - OP_1 + 1) as usize;
                    } else {
                        total += MAX_MULTISIG_PUBKEYS;
                    }
                }
                _ => {}
            }
            last_opcode = opcode;
        }
        total
    }
}

impl From<Vec<u8>> for Script {
    fn from(bytes: Vec<u8>) -> Self {
        Script(bytes)
    }
}

impl AsRef<[u8]> for Script {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Renders the mnemonic form accepted by [`Script::from_string`]
impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut consumed = 0;
        for item in self.instructions() {
            if consumed > 0 {
                f.write_str(" ")?;
            }
            let (offset, instruction) = match item {
                Ok(pair) => pair,
                Err(_) => return write!(f, "0x{}", hex::encode(&self.0[consumed..])),
            };
            match instruction {
                Instruction::Push { opcode, data } if opcode != OP_0 => {
                    let header = &self.0[offset..offset + header_len(opcode)];
                    write!(f, "0x{}", hex::encode(header))?;
                    if !data.is_empty() {
                        write!(f, " 0x{}", hex::encode(data))?;
                    }
                }
                _ => match opcode_name(instruction.opcode()) {
                    Some(name) => f.write_str(name)?,
                    None => write!(f, "0x{:02x}", instruction.opcode())?,
                },
            }
            consumed = offset + instruction_len(&instruction);
        }
        Ok(())
    }
}

fn header_len(opcode: u8) -> usize {
    match opcode {
        OP_PUSHDATA1 => 2,
        OP_PUSHDATA2 => 3,
        OP_PUSHDATA4 => 5,
        _ => 1,
    }
}

fn instruction_len(instruction: &Instruction<'_>) -> usize {
    match instruction {
        Instruction::Push { opcode, data } => header_len(*opcode) + data.len(),
        Instruction::Op(_) => 1,
    }
}

fn is_decimal(token: &str) -> bool {
    let digits = token.strip_prefix('-').unwrap_or(token);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// RIPEMD160(SHA256(data))
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    let mut out = [0u8; 20];
    out.copy_from_slice(&Ripemd160::digest(sha));
    out
}

/// Little-endian sign-magnitude integers used by arithmetic opcodes.
pub struct ScriptNum;

impl ScriptNum {
    /// Default operand size for arithmetic opcodes
    pub const DEFAULT_MAX_LEN: usize = 4;
    /// Operand size for the lock-time opcodes
    pub const LOCKTIME_MAX_LEN: usize = 5;

    pub fn encode(value: i64) -> Vec<u8> {
        if value == 0 {
            return Vec::new();
        }

        let negative = value < 0;
        let mut abs = value.unsigned_abs();
        let mut result = Vec::with_capacity(9);
        while abs > 0 {
            result.push((abs & 0xff) as u8);
            abs >>= 8;
        }

        // The top bit carries the sign; add a byte when it is already used.
        if let Some(last) = result.last_mut() {
            if *last & 0x80 != 0 {
                result.push(if negative { 0x80 } else { 0x00 });
            } else if negative {
                *last |= 0x80;
            }
        }
        result
    }

    pub fn decode(
        bytes: &[u8],
        require_minimal: bool,
        max_len: usize,
    ) -> std::result::Result<i64, ScriptError> {
        if bytes.len() > max_len {
            return Err(ScriptError::UnknownError);
        }
        if require_minimal && !Self::is_minimally_encoded(bytes) {
            return Err(ScriptError::UnknownError);
        }
        if bytes.is_empty() {
            return Ok(0);
        }

        let mut result: i64 = 0;
        for (i, &byte) in bytes.iter().enumerate() {
            result |= (byte as i64) << (8 * i);
        }

        let last = bytes[bytes.len() - 1];
        if last & 0x80 != 0 {
            let mask = !(0x80i64 << (8 * (bytes.len() - 1)));
            Ok(-(result & mask))
        } else {
            Ok(result)
        }
    }

    pub fn is_minimally_encoded(bytes: &[u8]) -> bool {
        match bytes.last() {
            None => true,
            Some(&last) if last & 0x7f == 0 => {
                bytes.len() > 1 && bytes[bytes.len() - 2] & 0x80 != 0
            }
            Some(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instructions_decode_pushes_and_ops() {
        let script = Script::from_raw(&[0x00, 0x02, 0xaa, 0xbb, 0x4c, 0x01, 0xcc, 0x51, 0xac]);
        let items: Vec<_> = script.instructions().map(|i| i.unwrap()).collect();
        assert_eq!(items.len(), 5);
        assert_eq!(items[0], (0, Instruction::Push { opcode: 0x00, data: &[] }));
        assert_eq!(items[1], (1, Instruction::Push { opcode: 0x02, data: &[0xaa, 0xbb] }));
        assert_eq!(items[2], (4, Instruction::Push { opcode: OP_PUSHDATA1, data: &[0xcc] }));
        assert_eq!(items[3], (7, Instruction::Op(OP_1)));
        assert_eq!(items[4], (8, Instruction::Op(OP_CHECKSIG)));
    }

    #[test]
    fn test_instructions_truncated_push() {
        let script = Script::from_raw(&[0x51, 0x05, 0x01]);
        let items: Vec<_> = script.instructions().collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1], Err(ScriptError::BadOpcode));
    }

    #[test]
    fn test_push_slice_prefixes() {
        assert_eq!(Script::new().push_slice(&[]).as_bytes(), &[0x00]);
        assert_eq!(Script::new().push_slice(&[5]).as_bytes(), &[0x01, 5]);
        assert_eq!(Script::new().push_slice(&[0u8; 75]).as_bytes()[0], 75);
        assert_eq!(&Script::new().push_slice(&[0u8; 76]).as_bytes()[..2], &[OP_PUSHDATA1, 76]);
        assert_eq!(&Script::new().push_slice(&[0u8; 256]).as_bytes()[..3], &[OP_PUSHDATA2, 0, 1]);
    }

    #[test]
    fn test_push_int() {
        assert_eq!(Script::new().push_int(-1).as_bytes(), &[OP_1NEGATE]);
        assert_eq!(Script::new().push_int(0).as_bytes(), &[OP_0]);
        assert_eq!(Script::new().push_int(16).as_bytes(), &[OP_16]);
        assert_eq!(Script::new().push_int(17).as_bytes(), &[0x01, 0x11]);
        assert_eq!(Script::new().push_int(-2).as_bytes(), &[0x01, 0x82]);
        assert_eq!(Script::new().push_int(128).as_bytes(), &[0x02, 0x80, 0x00]);
    }

    #[test]
    fn test_from_string_tokens() {
        let script = Script::from_string("0 1 -1 100 0x02 0xabcd 'hi' OP_DUP CHECKSIG").unwrap();
        assert_eq!(
            script.as_bytes(),
            &[0x00, 0x51, 0x4f, 0x01, 0x64, 0x02, 0xab, 0xcd, 0x02, b'h', b'i', OP_DUP, OP_CHECKSIG]
        );
    }

    #[test]
    fn test_from_string_errors() {
        assert!(matches!(Script::from_string("FOO"), Err(ConsensusError::ScriptParse(_))));
        assert!(Script::from_string("0xabc").is_err());
        assert!(Script::from_string("0xzz").is_err());
        assert!(Script::from_string("4294967296").is_err());
    }

    #[test]
    fn test_from_string_empty() {
        assert!(Script::from_string("").unwrap().is_empty());
        assert!(Script::from_string("   \n\t ").unwrap().is_empty());
    }

    #[test]
    fn test_display_round_trip() {
        let text = "DUP HASH160 0x14 0x0000000000000000000000000000000000000000 EQUALVERIFY CHECKSIG";
        let script = Script::from_string(text).unwrap();
        assert_eq!(script.to_string(), text);
        assert_eq!(Script::from_string(&script.to_string()).unwrap(), script);
    }

    #[test]
    fn test_display_truncated_push() {
        let script = Script::from_raw(&[0x51, 0x05, 0x01]);
        assert_eq!(script.to_string(), "1 0x0501");
    }

    #[test]
    fn test_from_multisig() {
        let keys = vec![vec![2u8; 33], vec![3u8; 33]];
        let script = Script::from_multisig(1, 2, &keys).unwrap();
        assert_eq!(script.len(), 1 + 34 * 2 + 1 + 1);
        assert_eq!(script.as_bytes()[0], OP_1);
        assert_eq!(script.as_bytes()[script.len() - 2], OP_2);
        assert_eq!(script.as_bytes()[script.len() - 1], OP_CHECKMULTISIG);

        assert!(Script::from_multisig(3, 2, &keys).is_err());
        assert!(Script::from_multisig(0, 2, &keys).is_err());
        assert!(Script::from_multisig(1, 3, &keys).is_err());
    }

    #[test]
    fn test_from_scripthash_is_p2sh() {
        let script = Script::from_scripthash(&[0xab; 20]);
        assert!(script.is_p2sh());
        assert!(!Script::from_pubkeyhash(&[0xab; 20]).is_p2sh());
    }

    #[test]
    fn test_from_program_and_witness_program() {
        let script = Script::from_program(0, &[7u8; 20]).unwrap();
        assert_eq!(script.witness_program(), Some((0, &[7u8; 20][..])));

        let v1 = Script::from_program(1, &[7u8; 32]).unwrap();
        assert_eq!(v1.witness_program().map(|(v, p)| (v, p.len())), Some((1, 32)));

        assert!(Script::from_program(17, &[0u8; 20]).is_err());
        assert!(Script::from_program(0, &[0u8; 41]).is_err());
        assert!(Script::from_raw(&[OP_1NEGATE, 0x02, 0, 0]).witness_program().is_none());
        assert!(Script::from_raw(&[OP_0, 0x03, 0, 0]).witness_program().is_none());
    }

    #[test]
    fn test_get_subscript() {
        let script = Script::from_raw(&[OP_1, OP_CODESEPARATOR, 0x01, 0xab, OP_CHECKSIG]);
        assert_eq!(script.get_subscript(0), script);
        assert_eq!(script.get_subscript(2).as_bytes(), &[0x01, 0xab, OP_CHECKSIG]);
        assert!(script.get_subscript(10).is_empty());
    }

    #[test]
    fn test_remove_separators_is_instruction_aligned() {
        // 0xab inside push data must survive
        let script = Script::from_raw(&[OP_CODESEPARATOR, 0x01, 0xab, OP_CODESEPARATOR, OP_CHECKSIG]);
        assert_eq!(script.remove_separators().as_bytes(), &[0x01, 0xab, OP_CHECKSIG]);
    }

    #[test]
    fn test_find_and_delete() {
        let sig = Script::new().push_slice(&[0xde, 0xad]);
        let script = Script::from_raw(&[0x02, 0xde, 0xad, OP_DUP, 0x02, 0xde, 0xad, OP_CHECKSIG]);
        let (cleaned, found) = script.find_and_delete(&sig);
        assert_eq!(found, 2);
        assert_eq!(cleaned.as_bytes(), &[OP_DUP, OP_CHECKSIG]);
    }

    #[test]
    fn test_find_and_delete_not_aligned() {
        // the pattern appears only inside a larger push
        let pattern = Script::from_raw(&[0x01, 0x51]);
        let script = Script::from_raw(&[0x02, 0x01, 0x51]);
        let (cleaned, found) = script.find_and_delete(&pattern);
        assert_eq!(found, 0);
        assert_eq!(cleaned, script);
    }

    #[test]
    fn test_is_push_only() {
        assert!(Script::from_raw(&[0x00, 0x01, 0x02, OP_16, OP_1NEGATE]).is_push_only());
        assert!(!Script::from_raw(&[0x01, 0x02, OP_DUP]).is_push_only());
        assert!(!Script::from_raw(&[0x05]).is_push_only());
        assert!(Script::new().is_push_only());
    }

    #[test]
    fn test_get_redeem() {
        let redeem = Script::from_raw(&[OP_1, OP_CHECKSIG]);
        let script_sig = Script::new().push_opcode(OP_0).push_slice(redeem.as_bytes());
        assert_eq!(script_sig.get_redeem(), Some(redeem));
        assert_eq!(Script::from_raw(&[OP_DUP]).get_redeem(), None);
        assert_eq!(Script::new().get_redeem(), None);
    }

    #[test]
    fn test_count_sigops() {
        let keys = vec![vec![2u8; 33], vec![3u8; 33]];
        let multisig = Script::from_multisig(1, 2, &keys).unwrap();
        assert_eq!(multisig.count_sigops(true), 2);
        assert_eq!(multisig.count_sigops(false), 20);

        let zero = Script::from_raw(&[OP_0, OP_CHECKMULTISIG]);
        assert_eq!(zero.count_sigops(true), 20);

        let checksigs = Script::from_raw(&[OP_CHECKSIG, OP_CHECKSIGVERIFY, 0x05]);
        assert_eq!(checksigs.count_sigops(true), 2);
    }

    #[test]
    fn test_hash160_known_vector() {
        // hash160 of the empty string
        assert_eq!(
            Script::new().hash160(),
            [
                0xb4, 0x72, 0xa2, 0x66, 0xd0, 0xbd, 0x89, 0xc1, 0x37, 0x06, 0xa4, 0x13, 0x2c, 0xcf,
                0xb1, 0x6f, 0x7c, 0x3b, 0x9f, 0xcb
            ]
        );
    }

    #[test]
    fn test_script_num_encode() {
        assert_eq!(ScriptNum::encode(0), Vec::<u8>::new());
        assert_eq!(ScriptNum::encode(1), vec![0x01]);
        assert_eq!(ScriptNum::encode(-1), vec![0x81]);
        assert_eq!(ScriptNum::encode(127), vec![0x7f]);
        assert_eq!(ScriptNum::encode(128), vec![0x80, 0x00]);
        assert_eq!(ScriptNum::encode(-128), vec![0x80, 0x80]);
        assert_eq!(ScriptNum::encode(255), vec![0xff, 0x00]);
        assert_eq!(ScriptNum::encode(256), vec![0x00, 0x01]);
    }

    #[test]
    fn test_script_num_decode() {
        assert_eq!(ScriptNum::decode(&[], true, 4), Ok(0));
        assert_eq!(ScriptNum::decode(&[0x81], true, 4), Ok(-1));
        assert_eq!(ScriptNum::decode(&[0x80, 0x00], true, 4), Ok(128));
        assert_eq!(ScriptNum::decode(&[0xff, 0xff, 0xff, 0x7f], true, 4), Ok(0x7fffffff));
        assert!(ScriptNum::decode(&[0, 0, 0, 0, 1], true, 4).is_err());
        assert_eq!(ScriptNum::decode(&[0, 0, 0, 0, 1], true, 5), Ok(1 << 32));
    }

    #[test]
    fn test_script_num_minimal() {
        assert!(ScriptNum::decode(&[0x00], true, 4).is_err());
        assert_eq!(ScriptNum::decode(&[0x00], false, 4), Ok(0));
        assert!(ScriptNum::decode(&[0x01, 0x00], true, 4).is_err());
        assert!(ScriptNum::decode(&[0x80], true, 4).is_err());
        assert_eq!(ScriptNum::decode(&[0x80], false, 4), Ok(0));
        assert!(ScriptNum::is_minimally_encoded(&[0xff, 0x00]));
    }
}
