//! Script interpreter and verifier
//!
//! [`eval_script`] runs one script against a stack. [`verify_script`] drives
//! a full spend: scriptSig, scriptPubKey, the P2SH redeem script and witness
//! programs, under a set of [`flags`](crate::flags).

use crate::constants::*;
use crate::error::ScriptError;
use crate::flags::*;
use crate::opcodes::*;
use crate::script::{hash160, Instruction, Script, ScriptNum};
use crate::segwit::Witness;
use crate::sighash::{signature_hash, SigVersion};
use crate::types::*;
use bitcoin_hashes::{sha1, sha256, sha256d, Hash as BitcoinHash};
use ripemd::{Digest, Ripemd160};
use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, Secp256k1, VerifyOnly};
use std::sync::OnceLock;

/// Script evaluation stack
pub type Stack = Vec<Vec<u8>>;

type EvalResult<T = ()> = std::result::Result<T, ScriptError>;

static SECP256K1: OnceLock<Secp256k1<VerifyOnly>> = OnceLock::new();

fn secp() -> &'static Secp256k1<VerifyOnly> {
    SECP256K1.get_or_init(Secp256k1::verification_only)
}

/// Transaction-dependent checks the interpreter delegates to its caller
pub trait SignatureChecker {
    /// `sig` carries the trailing hash type byte
    fn check_sig(&self, sig: &[u8], pubkey: &[u8], script_code: &Script, version: SigVersion) -> bool;

    fn check_lock_time(&self, lock_time: i64) -> bool;

    fn check_sequence(&self, sequence: i64) -> bool;
}

/// Checker for scripts evaluated outside a transaction; every check fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSignatureChecker;

impl SignatureChecker for NullSignatureChecker {
    fn check_sig(&self, _sig: &[u8], _pubkey: &[u8], _script_code: &Script, _version: SigVersion) -> bool {
        false
    }

    fn check_lock_time(&self, _lock_time: i64) -> bool {
        false
    }

    fn check_sequence(&self, _sequence: i64) -> bool {
        false
    }
}

/// Checks signatures and lock times against input `index` of `tx`
pub struct TransactionSignatureChecker<'a> {
    tx: &'a Transaction,
    index: usize,
    value: Integer,
}

impl<'a> TransactionSignatureChecker<'a> {
    /// `value` is the amount of the coin being spent
    pub fn new(tx: &'a Transaction, index: usize, value: Integer) -> Self {
        Self { tx, index, value }
    }
}

impl SignatureChecker for TransactionSignatureChecker<'_> {
    fn check_sig(&self, sig: &[u8], pubkey: &[u8], script_code: &Script, version: SigVersion) -> bool {
        let Ok(pubkey) = PublicKey::from_slice(pubkey) else {
            return false;
        };
        let Some((&hash_type, der)) = sig.split_last() else {
            return false;
        };
        let Ok(hash) = signature_hash(self.tx, self.index, script_code, self.value, hash_type as u32, version) else {
            return false;
        };
        let Ok(mut signature) = Signature::from_der_lax(der) else {
            return false;
        };
        // libsecp256k1 only accepts low-S; high-S is policed by LOW_S instead.
        signature.normalize_s();
        let Ok(message) = Message::from_digest_slice(&hash) else {
            return false;
        };
        secp().verify_ecdsa(&message, &signature, &pubkey).is_ok()
    }

    fn check_lock_time(&self, lock_time: i64) -> bool {
        let Some(input) = self.tx.inputs.get(self.index) else {
            return false;
        };
        let tx_lock_time = self.tx.lock_time as i64;
        let threshold = LOCKTIME_THRESHOLD as i64;

        // Height-based and time-based lock times are not comparable.
        if (tx_lock_time < threshold) != (lock_time < threshold) {
            return false;
        }
        if lock_time > tx_lock_time {
            return false;
        }
        // A final input would let the lock time be bypassed.
        input.sequence != SEQUENCE_FINAL
    }

    fn check_sequence(&self, sequence: i64) -> bool {
        let Some(input) = self.tx.inputs.get(self.index) else {
            return false;
        };
        let tx_sequence = input.sequence as i64;

        if (self.tx.version as u32) < 2 {
            return false;
        }
        if tx_sequence & SEQUENCE_LOCKTIME_DISABLE_FLAG as i64 != 0 {
            return false;
        }

        let mask = (SEQUENCE_LOCKTIME_TYPE_FLAG | SEQUENCE_LOCKTIME_MASK) as i64;
        let type_flag = SEQUENCE_LOCKTIME_TYPE_FLAG as i64;
        let tx_masked = tx_sequence & mask;
        let masked = sequence & mask;

        if (tx_masked < type_flag) != (masked < type_flag) {
            return false;
        }
        masked <= tx_masked
    }
}

/// Stack element truthiness: any non-zero byte except a lone trailing sign bit
pub fn cast_to_bool(data: &[u8]) -> bool {
    for (i, &byte) in data.iter().enumerate() {
        if byte != 0 {
            return !(i == data.len() - 1 && byte == 0x80);
        }
    }
    false
}

/// True when `data` was pushed with the shortest possible opcode
pub fn is_minimal_push(opcode: u8, data: &[u8]) -> bool {
    match data.len() {
        0 => opcode == OP_0,
        1 if (1..=16).contains(&data[0]) => opcode == OP_1 + data[0] - 1,
        1 if data[0] == 0x81 => opcode == OP_1NEGATE,
        len if len <= 75 => opcode as usize == len,
        len if len <= 0xff => opcode == OP_PUSHDATA1,
        len if len <= 0xffff => opcode == OP_PUSHDATA2,
        _ => opcode == OP_PUSHDATA4,
    }
}

/// Strict DER with a trailing hash type byte (BIP66)
pub fn is_valid_signature_encoding(sig: &[u8]) -> bool {
    // 0x30 [total-len] 0x02 [R-len] [R] 0x02 [S-len] [S] [sighash]
    let len = sig.len();
    if !(9..=73).contains(&len) || sig[0] != 0x30 || sig[1] as usize != len - 3 {
        return false;
    }

    let len_r = sig[3] as usize;
    if 5 + len_r >= len {
        return false;
    }
    let len_s = sig[5 + len_r] as usize;
    if len_r + len_s + 7 != len {
        return false;
    }

    if sig[2] != 0x02 || len_r == 0 || sig[4] & 0x80 != 0 {
        return false;
    }
    if len_r > 1 && sig[4] == 0x00 && sig[5] & 0x80 == 0 {
        return false;
    }

    if sig[len_r + 4] != 0x02 || len_s == 0 || sig[len_r + 6] & 0x80 != 0 {
        return false;
    }
    if len_s > 1 && sig[len_r + 6] == 0x00 && sig[len_r + 7] & 0x80 == 0 {
        return false;
    }
    true
}

fn check_low_s(sig: &[u8]) -> EvalResult {
    if !is_valid_signature_encoding(sig) {
        return Err(ScriptError::SigDer);
    }
    let Ok(signature) = Signature::from_der_lax(&sig[..sig.len() - 1]) else {
        return Err(ScriptError::SigHighS);
    };
    let mut normalized = signature;
    normalized.normalize_s();
    if normalized != signature {
        return Err(ScriptError::SigHighS);
    }
    Ok(())
}

fn is_defined_hash_type(sig: &[u8]) -> bool {
    match sig.last() {
        Some(&hash_type) => {
            let base = hash_type as u32 & !SIGHASH_ANYONECANPAY;
            (SIGHASH_ALL..=SIGHASH_SINGLE).contains(&base)
        }
        None => false,
    }
}

/// Applies the DERSIG, LOW_S and STRICTENC rules. The empty signature
/// always passes so that a failed CHECKSIG stays expressible.
pub fn check_signature_encoding(sig: &[u8], flags: u32) -> EvalResult {
    if sig.is_empty() {
        return Ok(());
    }
    if flags & (VERIFY_DERSIG | VERIFY_LOW_S | VERIFY_STRICTENC) != 0 && !is_valid_signature_encoding(sig) {
        return Err(ScriptError::SigDer);
    }
    if flags & VERIFY_LOW_S != 0 {
        check_low_s(sig)?;
    }
    if flags & VERIFY_STRICTENC != 0 && !is_defined_hash_type(sig) {
        return Err(ScriptError::SigHashType);
    }
    Ok(())
}

fn is_compressed_pubkey(pubkey: &[u8]) -> bool {
    pubkey.len() == 33 && matches!(pubkey[0], 0x02 | 0x03)
}

fn is_valid_pubkey_encoding(pubkey: &[u8]) -> bool {
    is_compressed_pubkey(pubkey) || (pubkey.len() == 65 && pubkey[0] == 0x04)
}

/// Applies the STRICTENC and WITNESS_PUBKEYTYPE rules
pub fn check_pubkey_encoding(pubkey: &[u8], flags: u32, version: SigVersion) -> EvalResult {
    if flags & VERIFY_STRICTENC != 0 && !is_valid_pubkey_encoding(pubkey) {
        return Err(ScriptError::PubkeyType);
    }
    if flags & VERIFY_WITNESS_PUBKEYTYPE != 0 && version == SigVersion::WitnessV0 && !is_compressed_pubkey(pubkey) {
        return Err(ScriptError::WitnessPubkeyType);
    }
    Ok(())
}

fn encode_bool(value: bool) -> Vec<u8> {
    if value {
        vec![1]
    } else {
        Vec::new()
    }
}

/// Execution state for one script
struct Machine<'a> {
    stack: &'a mut Stack,
    altstack: Stack,
    exec: Vec<bool>,
    op_count: usize,
    code_separator: usize,
    script: &'a Script,
    flags: u32,
    checker: &'a dyn SignatureChecker,
    version: SigVersion,
}

impl Machine<'_> {
    fn executing(&self) -> bool {
        self.exec.iter().all(|branch| *branch)
    }

    fn require(&self, depth: usize) -> EvalResult {
        if self.stack.len() < depth {
            return Err(ScriptError::InvalidStackOperation);
        }
        Ok(())
    }

    /// Element `depth` positions from the top, 1 being the top
    fn top(&self, depth: usize) -> EvalResult<&Vec<u8>> {
        self.require(depth)?;
        Ok(&self.stack[self.stack.len() - depth])
    }

    fn pop(&mut self) -> EvalResult<Vec<u8>> {
        self.stack.pop().ok_or(ScriptError::InvalidStackOperation)
    }

    fn push(&mut self, data: Vec<u8>) {
        self.stack.push(data);
    }

    fn require_minimal(&self) -> bool {
        self.flags & VERIFY_MINIMALDATA != 0
    }

    fn pop_num(&mut self) -> EvalResult<i64> {
        let top = self.pop()?;
        ScriptNum::decode(&top, self.require_minimal(), ScriptNum::DEFAULT_MAX_LEN)
    }

    fn peek_num(&self, max_len: usize) -> EvalResult<i64> {
        ScriptNum::decode(self.top(1)?, self.require_minimal(), max_len)
    }

    fn num_at(&self, depth: usize) -> EvalResult<i64> {
        ScriptNum::decode(self.top(depth)?, self.require_minimal(), ScriptNum::DEFAULT_MAX_LEN)
    }

    fn count_ops(&mut self, count: usize) -> EvalResult {
        self.op_count += count;
        if self.op_count > MAX_SCRIPT_OPS {
            return Err(ScriptError::OpCount);
        }
        Ok(())
    }

    fn run(&mut self) -> EvalResult {
        let script = self.script;
        if script.len() > MAX_SCRIPT_SIZE {
            return Err(ScriptError::ScriptSize);
        }

        for (op_index, item) in script.instructions().enumerate() {
            let (_, instruction) = item?;
            let opcode = instruction.opcode();
            let executing = self.executing();

            if let Some(data) = instruction.push_data() {
                if data.len() > MAX_SCRIPT_ELEMENT_SIZE {
                    return Err(ScriptError::PushSize);
                }
            }
            if opcode > OP_16 {
                self.count_ops(1)?;
            }
            // Disabled opcodes fail even in an unexecuted branch.
            if is_disabled(opcode) {
                return Err(ScriptError::DisabledOpcode);
            }

            match instruction {
                Instruction::Push { opcode, data } => {
                    if executing {
                        if self.require_minimal() && !is_minimal_push(opcode, data) {
                            return Err(ScriptError::MinimalData);
                        }
                        self.push(data.to_vec());
                    }
                }
                Instruction::Op(opcode) => {
                    if executing || (OP_IF..=OP_ENDIF).contains(&opcode) {
                        self.step(op_index, opcode, executing)?;
                    }
                }
            }

            if self.stack.len() + self.altstack.len() > MAX_STACK_SIZE {
                return Err(ScriptError::StackSize);
            }
        }

        if !self.exec.is_empty() {
            return Err(ScriptError::UnbalancedConditional);
        }
        Ok(())
    }

    fn step(&mut self, op_index: usize, opcode: u8, executing: bool) -> EvalResult {
        match opcode {
            OP_1NEGATE | OP_1..=OP_16 => {
                let value = opcode as i64 - (OP_1 as i64 - 1);
                self.push(ScriptNum::encode(value));
            }

            // Control
            OP_NOP => {}
            OP_CHECKLOCKTIMEVERIFY => {
                if self.flags & VERIFY_CHECKLOCKTIMEVERIFY == 0 {
                    return self.upgradable_nop();
                }
                let lock_time = self.peek_num(ScriptNum::LOCKTIME_MAX_LEN)?;
                if lock_time < 0 {
                    return Err(ScriptError::NegativeLockTime);
                }
                if !self.checker.check_lock_time(lock_time) {
                    return Err(ScriptError::UnsatisfiedLockTime);
                }
            }
            OP_CHECKSEQUENCEVERIFY => {
                if self.flags & VERIFY_CHECKSEQUENCEVERIFY == 0 {
                    return self.upgradable_nop();
                }
                let sequence = self.peek_num(ScriptNum::LOCKTIME_MAX_LEN)?;
                if sequence < 0 {
                    return Err(ScriptError::NegativeLockTime);
                }
                if sequence & SEQUENCE_LOCKTIME_DISABLE_FLAG as i64 != 0 {
                    return Ok(());
                }
                if !self.checker.check_sequence(sequence) {
                    return Err(ScriptError::UnsatisfiedLockTime);
                }
            }
            OP_NOP1 | OP_NOP4..=OP_NOP10 => self.upgradable_nop()?,
            OP_IF | OP_NOTIF => {
                let mut value = false;
                if executing {
                    let top = self.stack.last().ok_or(ScriptError::UnbalancedConditional)?;
                    if self.version == SigVersion::WitnessV0
                        && self.flags & VERIFY_MINIMALIF != 0
                        && (top.len() > 1 || (top.len() == 1 && top[0] != 1))
                    {
                        return Err(ScriptError::MinimalIf);
                    }
                    value = cast_to_bool(top);
                    if opcode == OP_NOTIF {
                        value = !value;
                    }
                    self.pop()?;
                }
                self.exec.push(value);
            }
            OP_ELSE => {
                let branch = self.exec.last_mut().ok_or(ScriptError::UnbalancedConditional)?;
                *branch = !*branch;
            }
            OP_ENDIF => {
                self.exec.pop().ok_or(ScriptError::UnbalancedConditional)?;
            }
            OP_VERIFY => {
                if !cast_to_bool(self.top(1)?) {
                    return Err(ScriptError::Verify);
                }
                self.pop()?;
            }
            OP_RETURN => return Err(ScriptError::OpReturn),

            // Stack
            OP_TOALTSTACK => {
                let top = self.pop()?;
                self.altstack.push(top);
            }
            OP_FROMALTSTACK => {
                let top = self.altstack.pop().ok_or(ScriptError::InvalidAltstackOperation)?;
                self.push(top);
            }
            OP_2DROP => {
                self.require(2)?;
                self.stack.truncate(self.stack.len() - 2);
            }
            OP_2DUP => {
                let (a, b) = (self.top(2)?.clone(), self.top(1)?.clone());
                self.push(a);
                self.push(b);
            }
            OP_3DUP => {
                let (a, b, c) = (self.top(3)?.clone(), self.top(2)?.clone(), self.top(1)?.clone());
                self.push(a);
                self.push(b);
                self.push(c);
            }
            OP_2OVER => {
                let (a, b) = (self.top(4)?.clone(), self.top(3)?.clone());
                self.push(a);
                self.push(b);
            }
            OP_2ROT => {
                self.require(6)?;
                let at = self.stack.len() - 6;
                let a = self.stack.remove(at);
                let b = self.stack.remove(at);
                self.push(a);
                self.push(b);
            }
            OP_2SWAP => {
                self.require(4)?;
                let len = self.stack.len();
                self.stack.swap(len - 4, len - 2);
                self.stack.swap(len - 3, len - 1);
            }
            OP_IFDUP => {
                let top = self.top(1)?;
                if cast_to_bool(top) {
                    let copy = top.clone();
                    self.push(copy);
                }
            }
            OP_DEPTH => {
                let depth = self.stack.len() as i64;
                self.push(ScriptNum::encode(depth));
            }
            OP_DROP => {
                self.pop()?;
            }
            OP_DUP => {
                let top = self.top(1)?.clone();
                self.push(top);
            }
            OP_NIP => {
                self.require(2)?;
                let at = self.stack.len() - 2;
                self.stack.remove(at);
            }
            OP_OVER => {
                let second = self.top(2)?.clone();
                self.push(second);
            }
            OP_PICK | OP_ROLL => {
                self.require(2)?;
                let n = self.pop_num()?;
                if n < 0 || n as usize >= self.stack.len() {
                    return Err(ScriptError::InvalidStackOperation);
                }
                let at = self.stack.len() - 1 - n as usize;
                let item = if opcode == OP_ROLL {
                    self.stack.remove(at)
                } else {
                    self.stack[at].clone()
                };
                self.push(item);
            }
            OP_ROT => {
                self.require(3)?;
                let len = self.stack.len();
                self.stack.swap(len - 3, len - 2);
                self.stack.swap(len - 2, len - 1);
            }
            OP_SWAP => {
                self.require(2)?;
                let len = self.stack.len();
                self.stack.swap(len - 2, len - 1);
            }
            OP_TUCK => {
                let top = self.top(1)?.clone();
                self.require(2)?;
                let at = self.stack.len() - 2;
                self.stack.insert(at, top);
            }
            OP_SIZE => {
                let size = self.top(1)?.len() as i64;
                self.push(ScriptNum::encode(size));
            }

            // Bitwise logic
            OP_EQUAL | OP_EQUALVERIFY => {
                self.require(2)?;
                let b = self.pop()?;
                let a = self.pop()?;
                let equal = a == b;
                self.push(encode_bool(equal));
                if opcode == OP_EQUALVERIFY {
                    if !equal {
                        return Err(ScriptError::EqualVerify);
                    }
                    self.pop()?;
                }
            }

            // Numeric
            OP_1ADD | OP_1SUB | OP_NEGATE | OP_ABS | OP_NOT | OP_0NOTEQUAL => {
                let n = self.pop_num()?;
                let result = match opcode {
                    OP_1ADD => n + 1,
                    OP_1SUB => n - 1,
                    OP_NEGATE => -n,
                    OP_ABS => n.abs(),
                    OP_NOT => (n == 0) as i64,
                    _ => (n != 0) as i64,
                };
                self.push(ScriptNum::encode(result));
            }
            OP_ADD
            | OP_SUB
            | OP_BOOLAND
            | OP_BOOLOR
            | OP_NUMEQUAL
            | OP_NUMEQUALVERIFY
            | OP_NUMNOTEQUAL
            | OP_LESSTHAN
            | OP_GREATERTHAN
            | OP_LESSTHANOREQUAL
            | OP_GREATERTHANOREQUAL
            | OP_MIN
            | OP_MAX => {
                self.require(2)?;
                let a = self.num_at(2)?;
                let b = self.num_at(1)?;
                self.stack.truncate(self.stack.len() - 2);
                let result = match opcode {
                    OP_ADD => a + b,
                    OP_SUB => a - b,
                    OP_BOOLAND => (a != 0 && b != 0) as i64,
                    OP_BOOLOR => (a != 0 || b != 0) as i64,
                    OP_NUMEQUAL | OP_NUMEQUALVERIFY => (a == b) as i64,
                    OP_NUMNOTEQUAL => (a != b) as i64,
                    OP_LESSTHAN => (a < b) as i64,
                    OP_GREATERTHAN => (a > b) as i64,
                    OP_LESSTHANOREQUAL => (a <= b) as i64,
                    OP_GREATERTHANOREQUAL => (a >= b) as i64,
                    OP_MIN => a.min(b),
                    _ => a.max(b),
                };
                self.push(ScriptNum::encode(result));
                if opcode == OP_NUMEQUALVERIFY {
                    if result == 0 {
                        return Err(ScriptError::NumEqualVerify);
                    }
                    self.pop()?;
                }
            }
            OP_WITHIN => {
                self.require(3)?;
                let x = self.num_at(3)?;
                let min = self.num_at(2)?;
                let max = self.num_at(1)?;
                self.stack.truncate(self.stack.len() - 3);
                self.push(encode_bool(min <= x && x < max));
            }

            // Crypto
            OP_RIPEMD160 => {
                let data = self.pop()?;
                self.push(Ripemd160::digest(&data).to_vec());
            }
            OP_SHA1 => {
                let data = self.pop()?;
                self.push(sha1::Hash::hash(&data).into_inner().to_vec());
            }
            OP_SHA256 => {
                let data = self.pop()?;
                self.push(sha256::Hash::hash(&data).into_inner().to_vec());
            }
            OP_HASH160 => {
                let data = self.pop()?;
                self.push(hash160(&data).to_vec());
            }
            OP_HASH256 => {
                let data = self.pop()?;
                self.push(sha256d::Hash::hash(&data).into_inner().to_vec());
            }
            OP_CODESEPARATOR => self.code_separator = op_index + 1,
            OP_CHECKSIG | OP_CHECKSIGVERIFY => self.check_sig(opcode == OP_CHECKSIGVERIFY)?,
            OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => {
                self.check_multisig(opcode == OP_CHECKMULTISIGVERIFY)?
            }

            _ => return Err(ScriptError::BadOpcode),
        }
        Ok(())
    }

    fn upgradable_nop(&self) -> EvalResult {
        if self.flags & VERIFY_DISCOURAGE_UPGRADABLE_NOPS != 0 {
            return Err(ScriptError::DiscourageUpgradableNops);
        }
        Ok(())
    }

    /// Script committed to by signatures: everything after the last executed
    /// OP_CODESEPARATOR, minus the given signatures for legacy spends.
    fn script_code(&self, sigs: &[Vec<u8>]) -> Script {
        let mut code = self.script.get_subscript(self.code_separator);
        if self.version == SigVersion::Base {
            for sig in sigs {
                code = code.find_and_delete(&Script::new().push_slice(sig)).0;
            }
            code = code.remove_separators();
        }
        code
    }

    fn check_sig(&mut self, verify: bool) -> EvalResult {
        let sig = self.top(2)?.clone();
        let pubkey = self.top(1)?.clone();
        let script_code = self.script_code(std::slice::from_ref(&sig));

        check_signature_encoding(&sig, self.flags)?;
        check_pubkey_encoding(&pubkey, self.flags, self.version)?;
        let success = self.checker.check_sig(&sig, &pubkey, &script_code, self.version);

        if !success && self.flags & VERIFY_NULLFAIL != 0 && !sig.is_empty() {
            return Err(ScriptError::NullFail);
        }

        self.stack.truncate(self.stack.len() - 2);
        self.push(encode_bool(success));
        if verify {
            if !success {
                return Err(ScriptError::CheckSigVerify);
            }
            self.pop()?;
        }
        Ok(())
    }

    fn check_multisig(&mut self, verify: bool) -> EvalResult {
        // Stack: <dummy> <sig>... <m> <pubkey>... <n>
        let mut i = 1;
        let key_count = self.num_at(i)?;
        if key_count < 0 || key_count as usize > MAX_MULTISIG_PUBKEYS {
            return Err(ScriptError::PubkeyCount);
        }
        let mut keys_left = key_count as usize;
        self.count_ops(keys_left)?;

        i += 1;
        let mut ikey = i;
        // Elements still to be checked by NULLFAIL during cleanup.
        let mut ikey2 = keys_left + 2;
        i += keys_left;

        let sig_count = self.num_at(i)?;
        if sig_count < 0 || sig_count as usize > keys_left {
            return Err(ScriptError::SigCount);
        }
        let mut sigs_left = sig_count as usize;

        i += 1;
        let mut isig = i;
        i += sigs_left;
        self.require(i)?;

        let sigs: Vec<Vec<u8>> = (0..sigs_left)
            .map(|k| self.stack[self.stack.len() - isig - k].clone())
            .collect();
        let script_code = self.script_code(&sigs);

        let mut success = true;
        while success && sigs_left > 0 {
            let sig = self.top(isig)?;
            let pubkey = self.top(ikey)?;

            // Encoding is only checked for pairs actually compared.
            check_signature_encoding(sig, self.flags)?;
            check_pubkey_encoding(pubkey, self.flags, self.version)?;

            if self.checker.check_sig(sig, pubkey, &script_code, self.version) {
                isig += 1;
                sigs_left -= 1;
            }
            ikey += 1;
            keys_left -= 1;

            // More signatures left than keys means failure.
            if sigs_left > keys_left {
                success = false;
            }
        }

        while i > 1 {
            i -= 1;
            if !success && self.flags & VERIFY_NULLFAIL != 0 && ikey2 == 0 && !self.top(1)?.is_empty() {
                return Err(ScriptError::NullFail);
            }
            if ikey2 > 0 {
                ikey2 -= 1;
            }
            self.pop()?;
        }

        // CHECKMULTISIG consumes one extra element.
        let dummy = self.top(1)?;
        if self.flags & VERIFY_NULLDUMMY != 0 && !dummy.is_empty() {
            return Err(ScriptError::SigNullDummy);
        }
        self.pop()?;

        self.push(encode_bool(success));
        if verify {
            if !success {
                return Err(ScriptError::CheckMultiSigVerify);
            }
            self.pop()?;
        }
        Ok(())
    }
}

/// EvalScript: 𝒮𝒯 × 𝕊 × ℕ₃₂ × 𝒱 → 𝒮𝒯 ∪ {⊥}
///
/// Runs `script` on `stack`, leaving the resulting stack in place. An
/// error means the script failed; the stack contents are then unspecified.
pub fn eval_script(
    stack: &mut Stack,
    script: &Script,
    flags: u32,
    checker: &dyn SignatureChecker,
    version: SigVersion,
) -> EvalResult {
    Machine {
        stack,
        altstack: Stack::new(),
        exec: Vec::new(),
        op_count: 0,
        code_separator: 0,
        script,
        flags,
        checker,
        version,
    }
    .run()
}

fn require_true_top(stack: &Stack) -> EvalResult {
    match stack.last() {
        Some(top) if cast_to_bool(top) => Ok(()),
        _ => Err(ScriptError::EvalFalse),
    }
}

/// VerifyScript: 𝕊 × 𝕊 × 𝒲 × ℕ₃₂ → {valid, invalid}
///
/// Verifies that `script_sig` and `witness` satisfy `script_pubkey`.
pub fn verify_script(
    script_sig: &Script,
    script_pubkey: &Script,
    witness: &Witness,
    flags: u32,
    checker: &dyn SignatureChecker,
) -> EvalResult {
    if flags & VERIFY_SIGPUSHONLY != 0 && !script_sig.is_push_only() {
        return Err(ScriptError::SigPushOnly);
    }

    let mut stack = Stack::new();
    eval_script(&mut stack, script_sig, flags, checker, SigVersion::Base)?;
    let p2sh_stack = if flags & VERIFY_P2SH != 0 {
        Some(stack.clone())
    } else {
        None
    };

    eval_script(&mut stack, script_pubkey, flags, checker, SigVersion::Base)?;
    require_true_top(&stack)?;

    let mut had_witness = false;
    if flags & VERIFY_WITNESS != 0 {
        if let Some((version, program)) = script_pubkey.witness_program() {
            had_witness = true;
            if !script_sig.is_empty() {
                return Err(ScriptError::WitnessMalleated);
            }
            verify_witness_program(witness, version, program, flags, checker)?;
            // Keep a single element so CLEANSTACK passes.
            stack.truncate(1);
        }
    }

    if let Some(saved) = p2sh_stack.filter(|_| script_pubkey.is_p2sh()) {
        if !script_sig.is_push_only() {
            return Err(ScriptError::SigPushOnly);
        }

        stack = saved;
        // Non-empty: the scriptPubKey above succeeded on this stack.
        let redeem = Script::from(stack.pop().ok_or(ScriptError::UnknownError)?);

        eval_script(&mut stack, &redeem, flags, checker, SigVersion::Base)?;
        require_true_top(&stack)?;

        if flags & VERIFY_WITNESS != 0 {
            if let Some((version, program)) = redeem.witness_program() {
                had_witness = true;
                if *script_sig != Script::new().push_slice(redeem.as_bytes()) {
                    return Err(ScriptError::WitnessMalleatedP2SH);
                }
                verify_witness_program(witness, version, program, flags, checker)?;
                stack.truncate(1);
            }
        }
    }

    if flags & VERIFY_CLEANSTACK != 0 && stack.len() != 1 {
        return Err(ScriptError::CleanStack);
    }

    if flags & VERIFY_WITNESS != 0 && !had_witness && !witness.is_empty() {
        return Err(ScriptError::WitnessUnexpected);
    }

    Ok(())
}

/// Verifies a witness program of the given version against its witness stack
pub fn verify_witness_program(
    witness: &Witness,
    version: u8,
    program: &[u8],
    flags: u32,
    checker: &dyn SignatureChecker,
) -> EvalResult {
    let (mut stack, script) = match (version, program.len()) {
        (0, 32) => {
            let (last, rest) = witness.split_last().ok_or(ScriptError::WitnessProgramWitnessEmpty)?;
            let script = Script::from_raw(last);
            if script.sha256()[..] != *program {
                return Err(ScriptError::WitnessProgramMismatch);
            }
            (rest.to_vec(), script)
        }
        (0, 20) => {
            if witness.len() != 2 {
                return Err(ScriptError::WitnessProgramMismatch);
            }
            (witness.clone(), Script::from_pubkeyhash(program))
        }
        (0, _) => return Err(ScriptError::WitnessProgramWrongLength),
        _ => {
            if flags & VERIFY_DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM != 0 {
                return Err(ScriptError::DiscourageUpgradableWitnessProgram);
            }
            // Unknown versions are anyone-can-spend until a soft fork defines them.
            return Ok(());
        }
    };

    if stack.iter().any(|item| item.len() > MAX_SCRIPT_ELEMENT_SIZE) {
        return Err(ScriptError::PushSize);
    }

    eval_script(&mut stack, &script, flags, checker, SigVersion::WitnessV0)?;

    // Witness scripts must leave exactly one true element.
    if stack.len() != 1 {
        return Err(ScriptError::EvalFalse);
    }
    require_true_top(&stack)
}
