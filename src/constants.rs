//! Protocol constants used by transaction validation

/// Maximum money supply: 21,000,000 coins in satoshis
pub const MAX_MONEY: i64 = 21_000_000 * 100_000_000;

/// Largest integer the wire codec accepts for an output value (2^53 - 1)
pub const MAX_SAFE_INTEGER: i64 = 0x001f_ffff_ffff_ffff;

/// Largest value that can be added to itself without leaving the safe range (2^52 - 1)
pub const MAX_SAFE_ADDITION: i64 = 0x000f_ffff_ffff_ffff;

/// Maximum serialized transaction size without witness data: 1MB
pub const MAX_TX_SIZE: usize = 1_000_000;

/// Maximum script length
pub const MAX_SCRIPT_SIZE: usize = 10_000;

/// Maximum size of a single pushed stack element
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;

/// Maximum combined size of the main and alt stacks during script execution
pub const MAX_STACK_SIZE: usize = 1000;

/// Maximum number of non-push operations in a script
pub const MAX_SCRIPT_OPS: usize = 201;

/// Maximum number of public keys in a CHECKMULTISIG
pub const MAX_MULTISIG_PUBKEYS: usize = 20;

/// Weight multiplier applied to non-witness bytes and legacy sigops
pub const WITNESS_SCALE_FACTOR: usize = 4;

/// Number of blocks before a coinbase output can be spent
pub const COINBASE_MATURITY: i32 = 100;

/// Satoshis per coin
pub const SATOSHIS_PER_COIN: i64 = 100_000_000;

/// Lock time threshold: lock times below this are block heights
pub const LOCKTIME_THRESHOLD: u32 = 500_000_000;

/// Sequence number for a final input
pub const SEQUENCE_FINAL: u32 = 0xffffffff;

/// Relative lock time is disabled when this sequence bit is set
pub const SEQUENCE_LOCKTIME_DISABLE_FLAG: u32 = 1 << 31;

/// Relative lock time is time based when this sequence bit is set
pub const SEQUENCE_LOCKTIME_TYPE_FLAG: u32 = 1 << 22;

/// Mask extracting the relative lock time value from a sequence
pub const SEQUENCE_LOCKTIME_MASK: u32 = 0x0000ffff;

/// Sighash type: commit to every output
pub const SIGHASH_ALL: u32 = 0x01;

/// Sighash type: commit to no outputs
pub const SIGHASH_NONE: u32 = 0x02;

/// Sighash type: commit to the output with the signing input's index
pub const SIGHASH_SINGLE: u32 = 0x03;

/// Sighash modifier: commit to the signing input only
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;

/// Digest returned by the legacy algorithm for SIGHASH_SINGLE without a matching output
pub const SIGHASH_ONE: [u8; 32] = [
    0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// All-zero hash used by the coinbase sentinel outpoint
pub const NULL_HASH: [u8; 32] = [0u8; 32];
