//! Ledger kernel constants

/// Width of a double-SHA-256 digest
pub const HASH_SIZE: usize = 32;

/// Width of a RIPEMD-160(SHA-256(x)) digest
pub const PUBKEY_HASH_SIZE: usize = 20;

/// Width of a compressed secp256k1 public key
pub const COMPRESSED_PUBKEY_SIZE: usize = 33;

/// Largest length a single-byte length prefix can describe
pub const MAX_VAR_FIELD_LEN: usize = u8::MAX as usize;

/// Default ceiling on untrusted bytes handed to a decoder: 4 MiB
pub const DEFAULT_MAX_DECODE_SIZE: usize = 4 * 1024 * 1024;

/// Serialized block header: version, two hashes, timestamp, target, nonce
pub const BLOCK_HEADER_SIZE: usize = 4 + HASH_SIZE + HASH_SIZE + 8 + 4 + 4;

// Smallest encodings, used to bound element counts before allocating
/// Input with an empty unlocking script
pub const MIN_INPUT_SIZE: usize = HASH_SIZE + 4 + 1 + 4;
/// Output with an empty locking script
pub const MIN_OUTPUT_SIZE: usize = 4 + 1;
/// Transaction with no inputs and no outputs
pub const MIN_TRANSACTION_SIZE: usize = 4 + 8 + 8 + 4;

/// Address version byte for pay-to-public-key-hash (main network)
pub const P2PKH_ADDRESS_VERSION: u8 = 0x00;

/// Length of the address checksum suffix
pub const ADDRESS_CHECKSUM_SIZE: usize = 4;

/// Version byte, public-key hash, checksum
pub const ADDRESS_SIZE: usize = 1 + PUBKEY_HASH_SIZE + ADDRESS_CHECKSUM_SIZE;

/// Placeholder written in place of every unlocking script when signing
pub const SIGNING_SCRIPT_PLACEHOLDER: u8 = 0x00;

/// Storage key prefix for serialized blocks
pub const BLOCK_KEY_PREFIX: &str = "b_";

// Data-push opcodes
pub const OP_SIGNATURE: u8 = 0x01;
pub const OP_PUBKEY: u8 = 0x02;
pub const OP_PUBKEY_HASH: u8 = 0x03;

// Control opcodes
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;
