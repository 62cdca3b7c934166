//! Block persistence through a key-value collaborator
//!
//! The kernel only needs "store bytes under a key" and "fetch bytes by key".
//! Blocks are stored in their wire encoding under `b_` plus the block hash hex.

use crate::codec::{Decodable, Encodable};
use crate::constants::BLOCK_KEY_PREFIX;
use crate::error::{Result, StorageError};
use crate::types::Block;
use log::debug;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Key-value backend for serialized blocks. Atomicity and locking are the backend's concern.
pub trait BlockStore {
    fn save(&self, key: &str, bytes: &[u8]) -> std::result::Result<(), StorageError>;

    /// Fails with `StorageError::NotFound` for unknown keys
    fn get(&self, key: &str) -> std::result::Result<Vec<u8>, StorageError>;
}

/// In-process store, safe to share between threads
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads recover the map from a poisoned lock
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }
}

impl BlockStore for MemoryStore {
    fn save(&self, key: &str, bytes: &[u8]) -> std::result::Result<(), StorageError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> std::result::Result<Vec<u8>, StorageError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        entries
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }
}

pub fn block_key(hash_hex: &str) -> String {
    format!("{}{}", BLOCK_KEY_PREFIX, hash_hex)
}

/// Store `block` under its hash; returns the hash hex it was stored under
pub fn save_block(store: &dyn BlockStore, block: &Block) -> Result<String> {
    let hash_hex = block.hash_hex();
    let key = block_key(&hash_hex);
    let bytes = block.encode();
    debug!("saving block {} ({} bytes)", key, bytes.len());
    store.save(&key, &bytes)?;
    Ok(hash_hex)
}

/// Fetch and decode the block stored under `hash_hex`, refusing more than `max_decode_size` bytes
pub fn load_block(store: &dyn BlockStore, hash_hex: &str, max_decode_size: usize) -> Result<Block> {
    let key = block_key(hash_hex);
    let bytes = store.get(&key)?;
    debug!("loaded block {} ({} bytes)", key, bytes.len());
    Block::decode_exact(&bytes, max_decode_size)
}
