//! Error types for ledger validation

use thiserror::Error;

/// Failures while turning untrusted bytes back into entities
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Truncated input: needed {needed} bytes, {remaining} remaining")]
    TruncatedInput { needed: usize, remaining: usize },

    #[error("Negative element count: {0}")]
    NegativeCount(i64),

    #[error("Input of {len} bytes exceeds decode limit of {limit}")]
    InputTooLarge { len: usize, limit: usize },

    #[error("Unknown opcode: 0x{0:02x}")]
    UnknownOpcode(u8),

    #[error("Opcode 0x{opcode:02x} cannot carry {len} data bytes")]
    InvalidOperandLength { opcode: u8, len: u8 },

    #[error("{0} trailing bytes after entity")]
    TrailingBytes(usize),
}

/// Failures reported by the storage collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Storage backend failure: {0}")]
    Backend(String),
}

/// Why a script evaluated to a definite "no" without being malformed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The program had no operands at all
    EmptyProgram,
    /// OP_HASH160 found something other than a public key on top
    NotAPublicKey,
    /// OP_EQUALVERIFY compared two different byte strings
    NotEqual,
    /// OP_CHECKSIG parsed both operands but the signature does not verify
    SignatureInvalid,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            RejectReason::EmptyProgram => "empty program",
            RejectReason::NotAPublicKey => "top of stack is not a public key",
            RejectReason::NotEqual => "operands are not equal",
            RejectReason::SignatureInvalid => "signature does not verify",
        };
        f.write_str(text)
    }
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Variable-length field of {len} bytes exceeds maximum of {max}")]
    FieldTooLong { len: usize, max: usize },

    #[error("Stack underflow in {opcode}: needed {needed}, found {available}")]
    ScriptUnderflow {
        opcode: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("Type mismatch in {opcode}: expected {expected}, found {found}")]
    ScriptTypeMismatch {
        opcode: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Public key parse failed: {0}")]
    KeyParse(String),

    #[error("Signature parse failed: {0}")]
    SignatureParse(String),

    #[error("Signature validation failed")]
    SignatureInvalid,

    #[error("Script rejected at operand {position}: {reason}")]
    ScriptRejected {
        position: usize,
        reason: RejectReason,
    },

    #[error("Block must contain at least one transaction")]
    EmptyBlock,

    #[error("Merkle root in header does not match transactions")]
    MerkleRootMismatch,

    #[error("Input index {index} out of range for {count} inputs")]
    InputIndexOutOfRange { index: usize, count: usize },

    #[error("{scripts} locking scripts supplied for {inputs} inputs")]
    LockingScriptCount { inputs: usize, scripts: usize },

    #[error("Invalid private key")]
    InvalidPrivateKey,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Hex decoding failed: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
