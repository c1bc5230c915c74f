//! Script verification rule flags
//!
//! Flags are plain `u32` bit sets so they combine with `|`. The textual form
//! used by test vectors and configuration is a comma separated list of names,
//! each optionally prefixed with `VERIFY_`.

use crate::error::{ConsensusError, Result};

pub const VERIFY_NONE: u32 = 0;
/// Evaluate P2SH redeem scripts (BIP16)
pub const VERIFY_P2SH: u32 = 1 << 0;
/// Require strict signature and public key encodings
pub const VERIFY_STRICTENC: u32 = 1 << 1;
/// Require strict DER signatures (BIP66)
pub const VERIFY_DERSIG: u32 = 1 << 2;
/// Require the lower of the two possible S values
pub const VERIFY_LOW_S: u32 = 1 << 3;
/// CHECKMULTISIG dummy argument must be empty
pub const VERIFY_NULLDUMMY: u32 = 1 << 4;
/// scriptSig must be push-only
pub const VERIFY_SIGPUSHONLY: u32 = 1 << 5;
/// Pushes and script numbers must use their shortest encoding
pub const VERIFY_MINIMALDATA: u32 = 1 << 6;
/// Reject the reserved NOP opcodes
pub const VERIFY_DISCOURAGE_UPGRADABLE_NOPS: u32 = 1 << 7;
/// Exactly one stack element must remain after evaluation
pub const VERIFY_CLEANSTACK: u32 = 1 << 8;
/// Enable OP_CHECKLOCKTIMEVERIFY (BIP65)
pub const VERIFY_CHECKLOCKTIMEVERIFY: u32 = 1 << 9;
/// Enable OP_CHECKSEQUENCEVERIFY (BIP112)
pub const VERIFY_CHECKSEQUENCEVERIFY: u32 = 1 << 10;
/// Recognize and verify witness programs (BIP141/143)
pub const VERIFY_WITNESS: u32 = 1 << 11;
/// Reject witness versions reserved for future soft forks
pub const VERIFY_DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM: u32 = 1 << 12;
/// OP_IF/NOTIF arguments in witness scripts must be empty or 0x01
pub const VERIFY_MINIMALIF: u32 = 1 << 13;
/// Failed signature checks require empty signatures
pub const VERIFY_NULLFAIL: u32 = 1 << 14;
/// Witness v0 public keys must be compressed
pub const VERIFY_WITNESS_PUBKEYTYPE: u32 = 1 << 15;

/// Rules every block must satisfy
pub const MANDATORY_VERIFY_FLAGS: u32 = VERIFY_P2SH;

/// Rules applied to transactions relayed outside blocks
pub const STANDARD_VERIFY_FLAGS: u32 = MANDATORY_VERIFY_FLAGS
    | VERIFY_DERSIG
    | VERIFY_STRICTENC
    | VERIFY_MINIMALDATA
    | VERIFY_NULLDUMMY
    | VERIFY_DISCOURAGE_UPGRADABLE_NOPS
    | VERIFY_CLEANSTACK
    | VERIFY_MINIMALIF
    | VERIFY_NULLFAIL
    | VERIFY_CHECKLOCKTIMEVERIFY
    | VERIFY_CHECKSEQUENCEVERIFY
    | VERIFY_LOW_S
    | VERIFY_WITNESS
    | VERIFY_DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM
    | VERIFY_WITNESS_PUBKEYTYPE;

const FLAG_NAMES: &[(&str, u32)] = &[
    ("NONE", VERIFY_NONE),
    ("P2SH", VERIFY_P2SH),
    ("STRICTENC", VERIFY_STRICTENC),
    ("DERSIG", VERIFY_DERSIG),
    ("LOW_S", VERIFY_LOW_S),
    ("NULLDUMMY", VERIFY_NULLDUMMY),
    ("SIGPUSHONLY", VERIFY_SIGPUSHONLY),
    ("MINIMALDATA", VERIFY_MINIMALDATA),
    ("DISCOURAGE_UPGRADABLE_NOPS", VERIFY_DISCOURAGE_UPGRADABLE_NOPS),
    ("CLEANSTACK", VERIFY_CLEANSTACK),
    ("CHECKLOCKTIMEVERIFY", VERIFY_CHECKLOCKTIMEVERIFY),
    ("CHECKSEQUENCEVERIFY", VERIFY_CHECKSEQUENCEVERIFY),
    ("WITNESS", VERIFY_WITNESS),
    ("DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM", VERIFY_DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM),
    ("MINIMALIF", VERIFY_MINIMALIF),
    ("NULLFAIL", VERIFY_NULLFAIL),
    ("WITNESS_PUBKEYTYPE", VERIFY_WITNESS_PUBKEYTYPE),
];

/// Looks up a single flag by name
pub fn flag_from_name(name: &str) -> Option<u32> {
    let bare = name.strip_prefix("VERIFY_").unwrap_or(name);
    FLAG_NAMES
        .iter()
        .find(|(n, _)| *n == bare)
        .map(|(_, bit)| *bit)
}

/// Parses a comma separated list of flag names into a bit set
///
/// # Examples
///
/// ```
/// use utxo_consensus::flags::*;
///
/// assert_eq!(parse_flags("P2SH,DERSIG").unwrap(), VERIFY_P2SH | VERIFY_DERSIG);
/// assert_eq!(parse_flags("").unwrap(), VERIFY_NONE);
/// assert!(parse_flags("P2SH,BOGUS").is_err());
/// ```
pub fn parse_flags(text: &str) -> Result<u32> {
    let mut flags = VERIFY_NONE;
    for name in text.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        flags |= flag_from_name(name).ok_or_else(|| ConsensusError::UnknownFlag(name.to_string()))?;
    }
    Ok(flags)
}

/// Names of the flags set in `flags`, in bit order
pub fn flag_names(flags: u32) -> Vec<&'static str> {
    FLAG_NAMES
        .iter()
        .filter(|(_, bit)| *bit != 0 && flags & bit != 0)
        .map(|(name, _)| *name)
        .collect()
}
