//! # Ledger Kernel
//!
//! Validation core for a small UTXO ledger: the canonical binary codec and
//! identifier hashing, Merkle commitment over a block's transactions, key and
//! address derivation, and a stack-based script machine that checks whether
//! a transaction input may spend the output it references.
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Validation is deterministic; storage is the only collaborator
//! 2. **Typed Failures**: Malformed input is an error, a well-formed "no" is a verdict
//! 3. **Exact Version Pinning**: Cryptographic dependencies are pinned to exact versions
//!
//! ## Usage
//!
//! ```rust
//! use ledger_kernel::*;
//!
//! let kernel = LedgerKernel::new();
//! let key = kernel
//!     .import_key("18e14a7b6a307f426a94f8114701e7c8e774e7f9a47e2c2035db29a206321725")
//!     .unwrap();
//! assert_eq!(key.address, "1PMycacnJaSqwwJqjawXBErnLsZ7RkXUAs");
//!
//! let locking = encode_script(&p2pkh_locking(&key.public_key_hash)).unwrap();
//! let mut tx = Transaction {
//!     version: 1,
//!     inputs: vec![TransactionInput {
//!         prev_tx_hash: [0u8; 32],
//!         output_index: 0,
//!         unlocking_script: ScriptBytes::empty(),
//!         sequence: 0xffff_ffff,
//!     }],
//!     outputs: vec![TransactionOutput {
//!         value: 50,
//!         locking_script: locking.clone(),
//!     }],
//!     lock_time: 0,
//! };
//! tx.sign_p2pkh_input(0, &key).unwrap();
//!
//! let verdict = kernel.verify_input(&tx, 0, locking.as_bytes()).unwrap();
//! assert!(verdict.is_accepted());
//! ```

pub mod types;
pub mod constants;
pub mod error;
pub mod hashes;
pub mod codec;
pub mod merkle;
pub mod keys;
pub mod script;
pub mod storage;
pub mod config;

// Re-export commonly used types
pub use types::*;
pub use constants::*;
pub use error::{DecodeError, LedgerError, RejectReason, Result, StorageError};
pub use codec::{hash_from_hex, Decodable, Encodable, Reader};
pub use merkle::{compute_merkle, MerkleTree};
pub use keys::{decode_address, encode_address, Key};
pub use script::{
    decode_script, encode_script, p2pkh_locking, p2pkh_unlocking, Operand, ScriptContext,
    ScriptVerdict, Stack,
};
pub use storage::{block_key, BlockStore, MemoryStore};
pub use config::KernelConfig;

use log::debug;

/// Entry point bundling validation operations with a [`KernelConfig`]
///
/// # Examples
///
/// ```
/// use ledger_kernel::{KernelConfig, LedgerKernel};
///
/// let config = KernelConfig::from_json_str(r#"{ "max_decode_size": 65536 }"#).unwrap();
/// let kernel = LedgerKernel::with_config(config).unwrap();
/// assert!(kernel.decode_block(&[0u8; 70000]).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct LedgerKernel {
    config: KernelConfig,
}

impl LedgerKernel {
    /// Kernel with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: KernelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Decode a block that must span all of `bytes`
    pub fn decode_block(&self, bytes: &[u8]) -> Result<Block> {
        Block::decode_exact(bytes, self.config.max_decode_size)
    }

    /// Decode a transaction that must span all of `bytes`
    pub fn decode_transaction(&self, bytes: &[u8]) -> Result<Transaction> {
        Transaction::decode_exact(bytes, self.config.max_decode_size)
    }

    /// Decode a block and check that its header commits to its transactions
    pub fn check_block(&self, bytes: &[u8]) -> Result<Block> {
        let block = self.decode_block(bytes)?;
        let tree = block.merkle()?;
        if tree.root != block.header.merkle_root {
            debug!(
                "block {} merkle root mismatch: header {}, computed {}",
                block.hash_hex(),
                hashes::to_hex(&block.header.merkle_root),
                hashes::to_hex(&tree.root)
            );
            return Err(LedgerError::MerkleRootMismatch);
        }
        Ok(block)
    }

    /// Run input `index` of `tx` against the locking script of the output it spends
    pub fn verify_input(
        &self,
        tx: &Transaction,
        index: usize,
        locking_script: &[u8],
    ) -> Result<ScriptVerdict> {
        script::verify_input(tx, index, locking_script)
    }

    /// Verify every input of `tx`, pairing input `i` with `locking_scripts[i]`
    pub fn verify_transaction(&self, tx: &Transaction, locking_scripts: &[&[u8]]) -> Result<()> {
        if locking_scripts.len() != tx.inputs.len() {
            return Err(LedgerError::LockingScriptCount {
                inputs: tx.inputs.len(),
                scripts: locking_scripts.len(),
            });
        }
        for (index, locking_script) in locking_scripts.iter().enumerate() {
            self.verify_input(tx, index, locking_script)?.into_result()?;
        }
        Ok(())
    }

    /// Import a hex private key, deriving the address with the configured version byte
    pub fn import_key(&self, private_key_hex: &str) -> Result<Key> {
        let key = Key::from_private_key_hex(private_key_hex)?;
        Ok(Key::with_version(key.secret_key, self.config.address_version))
    }

    pub fn generate_key(&self) -> Key {
        Key::with_version(Key::generate().secret_key, self.config.address_version)
    }

    /// Persist `block`; returns the hash hex it is stored under
    pub fn save_block(&self, store: &dyn BlockStore, block: &Block) -> Result<String> {
        storage::save_block(store, block)
    }

    pub fn load_block(&self, store: &dyn BlockStore, hash_hex: &str) -> Result<Block> {
        storage::load_block(store, hash_hex, self.config.max_decode_size)
    }
}
