//! Merkle commitment over a block's transaction identifiers

use crate::codec::Encodable;
use crate::error::{LedgerError, Result};
use crate::hashes::double_sha256_pair;
use crate::types::*;
use serde::{Deserialize, Serialize};

/// Root plus every interior hash computed on the way up, in production order.
///
/// `path` is a linear trace of the tree, not a minimal inclusion proof. Its
/// last element is always the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleTree {
    pub root: Hash,
    pub path: Vec<Hash>,
}

/// Build the tree over `hashes`.
///
/// Any level with an odd number of nodes, including the leaves, is padded
/// with one all-zero digest before pairing. Each pair hashes to
/// SHA256(SHA256(left ++ right)).
pub fn compute_merkle(hashes: &[Hash]) -> Result<MerkleTree> {
    if hashes.is_empty() {
        return Err(LedgerError::EmptyBlock);
    }

    let mut level: Vec<Hash> = hashes.to_vec();
    let mut path = Vec::new();

    loop {
        if level.len() % 2 != 0 {
            level.push([0u8; 32]);
        }

        let next_level: Vec<Hash> = level
            .chunks_exact(2)
            .map(|pair| double_sha256_pair(&pair[0], &pair[1]))
            .collect();
        path.extend_from_slice(&next_level);

        if next_level.len() == 1 {
            return Ok(MerkleTree {
                root: next_level[0],
                path,
            });
        }
        level = next_level;
    }
}

impl Block {
    /// Assemble a block, filling in the Merkle root and the informational size
    pub fn new(header: BlockHeader, transactions: Vec<Transaction>) -> Result<Self> {
        let mut block = Self {
            size: 0,
            header,
            transactions,
        };
        block.header.merkle_root = block.merkle()?.root;
        block.size = i32::try_from(block.encode().len()).unwrap_or(i32::MAX);
        Ok(block)
    }

    /// Identifiers of the block's transactions, in order
    pub fn tx_hashes(&self) -> Vec<Hash> {
        self.transactions.iter().map(Transaction::hash).collect()
    }

    pub fn merkle(&self) -> Result<MerkleTree> {
        compute_merkle(&self.tx_hashes())
    }

    /// Whether the header commits to exactly this transaction list
    pub fn verify_merkle_root(&self) -> Result<bool> {
        Ok(self.merkle()?.root == self.header.merkle_root)
    }
}
