//! Error types for transaction validation

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    #[error("Transaction validation failed: {0}")]
    TransactionValidation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Script parse error: {0}")]
    ScriptParse(String),

    #[error("Unknown verification flag: {0}")]
    UnknownFlag(String),

    #[error("Input index {index} out of range for {count} inputs")]
    InputIndexOutOfRange { index: usize, count: usize },
}

pub type Result<T> = std::result::Result<T, ConsensusError>;

/// Reason a script failed to verify.
///
/// Script failures are ordinary validation outcomes; the interpreter
/// reports them through this type and callers usually fold them to `bool`.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("unknown error")]
    UnknownError,
    #[error("script evaluated without error but finished with a false/empty top stack element")]
    EvalFalse,
    #[error("OP_RETURN was encountered")]
    OpReturn,

    #[error("script is too big")]
    ScriptSize,
    #[error("push value size limit exceeded")]
    PushSize,
    #[error("operation limit exceeded")]
    OpCount,
    #[error("stack size limit exceeded")]
    StackSize,
    #[error("signature count negative or greater than pubkey count")]
    SigCount,
    #[error("pubkey count negative or limit exceeded")]
    PubkeyCount,

    #[error("script failed an OP_VERIFY operation")]
    Verify,
    #[error("script failed an OP_EQUALVERIFY operation")]
    EqualVerify,
    #[error("script failed an OP_CHECKSIGVERIFY operation")]
    CheckSigVerify,
    #[error("script failed an OP_CHECKMULTISIGVERIFY operation")]
    CheckMultiSigVerify,
    #[error("script failed an OP_NUMEQUALVERIFY operation")]
    NumEqualVerify,

    #[error("opcode missing or not understood")]
    BadOpcode,
    #[error("attempted to use a disabled opcode")]
    DisabledOpcode,
    #[error("operation not valid with the current stack size")]
    InvalidStackOperation,
    #[error("operation not valid with the current altstack size")]
    InvalidAltstackOperation,
    #[error("invalid OP_IF construction")]
    UnbalancedConditional,

    #[error("negative locktime")]
    NegativeLockTime,
    #[error("locktime requirement not satisfied")]
    UnsatisfiedLockTime,

    #[error("signature hash type missing or not understood")]
    SigHashType,
    #[error("non-canonical DER signature")]
    SigDer,
    #[error("data push larger than necessary")]
    MinimalData,
    #[error("only push operators allowed in signatures")]
    SigPushOnly,
    #[error("non-canonical signature: S value is unnecessarily high")]
    SigHighS,
    #[error("dummy CHECKMULTISIG argument must be zero")]
    SigNullDummy,
    #[error("public key is neither compressed or uncompressed")]
    PubkeyType,
    #[error("stack size must be exactly one after execution")]
    CleanStack,
    #[error("OP_IF/NOTIF argument must be minimal")]
    MinimalIf,
    #[error("signature must be zero for failed CHECK(MULTI)SIG operation")]
    NullFail,

    #[error("NOPx reserved for soft-fork upgrades")]
    DiscourageUpgradableNops,
    #[error("witness version reserved for soft-fork upgrades")]
    DiscourageUpgradableWitnessProgram,

    #[error("witness program has incorrect length")]
    WitnessProgramWrongLength,
    #[error("witness program was passed an empty witness")]
    WitnessProgramWitnessEmpty,
    #[error("witness program hash mismatch")]
    WitnessProgramMismatch,
    #[error("witness requires empty scriptSig")]
    WitnessMalleated,
    #[error("witness requires only-redeemscript scriptSig")]
    WitnessMalleatedP2SH,
    #[error("witness provided for non-witness script")]
    WitnessUnexpected,
    #[error("using non-compressed keys in segwit")]
    WitnessPubkeyType,
}
