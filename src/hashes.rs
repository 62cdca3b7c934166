//! Hash primitives shared by the codec, Merkle engine, keys and scripts

use crate::types::{Hash, PubKeyHash};
use bitcoin_hashes::{sha256d, Hash as BitcoinHash, HashEngine};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Single SHA-256. Used for the signing digest, which is hashed once.
pub fn sha256(data: &[u8]) -> Hash {
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&Sha256::digest(data));
    hash
}

/// SHA256(SHA256(x)): the identifier hash for headers, transactions and blocks
pub fn double_sha256(data: &[u8]) -> Hash {
    let mut hasher = sha256d::Hash::engine();
    hasher.input(data);
    sha256d::Hash::from_engine(hasher).into_inner()
}

/// Double hash of two concatenated digests, as used for Merkle interior nodes
pub fn double_sha256_pair(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = sha256d::Hash::engine();
    hasher.input(left);
    hasher.input(right);
    sha256d::Hash::from_engine(hasher).into_inner()
}

/// RIPEMD160(SHA256(x))
pub fn hash160(data: &[u8]) -> PubKeyHash {
    let sha256_hash = Sha256::digest(data);
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&Ripemd160::digest(&sha256_hash));
    hash
}

/// Lowercase hex, most-significant byte first, no byte reversal
pub fn to_hex(hash: &[u8]) -> String {
    hex::encode(hash)
}
