//! Key and address derivation
//!
//! A private scalar determines its compressed secp256k1 public key, the
//! public-key hash RIPEMD160(SHA256(pubkey)), and a base-58 address of
//! `version ++ hash ++ checksum`, where the checksum is the first four bytes
//! of SHA256(SHA256(version ++ hash)). This is the standard
//! pay-to-public-key-hash address scheme.

use crate::constants::*;
use crate::error::{LedgerError, Result};
use crate::hashes::{double_sha256, hash160};
use crate::types::{Hash, PubKeyHash};
use rand::rngs::OsRng;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};

/// A private key together with everything derived from it
#[derive(Debug, Clone)]
pub struct Key {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
    pub public_key_hash: PubKeyHash,
    pub address_bytes: [u8; ADDRESS_SIZE],
    pub address: String,
}

impl Key {
    /// Generate a fresh key from OS randomness
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, _) = secp.generate_keypair(&mut OsRng);
        Self::from_secret_key(secret_key)
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        Self::with_version(secret_key, P2PKH_ADDRESS_VERSION)
    }

    /// Derive with a non-default address version byte
    pub fn with_version(secret_key: SecretKey, version: u8) -> Self {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        let public_key_hash = hash160(&public_key.serialize());
        let address_bytes = address_bytes(version, &public_key_hash);
        let address = bs58::encode(address_bytes).into_string();
        Self {
            secret_key,
            public_key,
            public_key_hash,
            address_bytes,
            address,
        }
    }

    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        let secret_key = SecretKey::from_slice(bytes).map_err(|_| LedgerError::InvalidPrivateKey)?;
        Ok(Self::from_secret_key(secret_key))
    }

    pub fn from_private_key_hex(hex_key: &str) -> Result<Self> {
        let bytes = hex::decode(hex_key)?;
        Self::from_secret_bytes(&bytes)
    }

    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Compressed SEC1 encoding: parity byte plus X coordinate
    pub fn public_key_bytes(&self) -> [u8; COMPRESSED_PUBKEY_SIZE] {
        self.public_key.serialize()
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key_bytes())
    }

    pub fn public_key_hash_hex(&self) -> String {
        hex::encode(self.public_key_hash)
    }

    /// DER-encoded ECDSA signature over a 32-byte digest
    pub fn sign_digest(&self, digest: &Hash) -> Vec<u8> {
        let secp = Secp256k1::new();
        let message = Message::from_digest(*digest);
        secp.sign_ecdsa(&message, &self.secret_key)
            .serialize_der()
            .to_vec()
    }
}

fn checksum(payload: &[u8]) -> [u8; ADDRESS_CHECKSUM_SIZE] {
    let hash = double_sha256(payload);
    let mut out = [0u8; ADDRESS_CHECKSUM_SIZE];
    out.copy_from_slice(&hash[..ADDRESS_CHECKSUM_SIZE]);
    out
}

/// `version ++ hash ++ checksum(version ++ hash)`
pub fn address_bytes(version: u8, pubkey_hash: &PubKeyHash) -> [u8; ADDRESS_SIZE] {
    let mut out = [0u8; ADDRESS_SIZE];
    out[0] = version;
    out[1..1 + PUBKEY_HASH_SIZE].copy_from_slice(pubkey_hash);
    let sum = checksum(&out[..1 + PUBKEY_HASH_SIZE]);
    out[1 + PUBKEY_HASH_SIZE..].copy_from_slice(&sum);
    out
}

pub fn encode_address(version: u8, pubkey_hash: &PubKeyHash) -> String {
    bs58::encode(address_bytes(version, pubkey_hash)).into_string()
}

/// Recover `(version, public-key hash)` from an address string, checking length and checksum
pub fn decode_address(address: &str) -> Result<(u8, PubKeyHash)> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| LedgerError::InvalidAddress(e.to_string()))?;
    if bytes.len() != ADDRESS_SIZE {
        return Err(LedgerError::InvalidAddress(format!(
            "expected {} bytes, got {}",
            ADDRESS_SIZE,
            bytes.len()
        )));
    }

    let (payload, sum) = bytes.split_at(1 + PUBKEY_HASH_SIZE);
    if checksum(payload)[..] != *sum {
        return Err(LedgerError::InvalidAddress("checksum mismatch".to_string()));
    }

    let mut pubkey_hash = [0u8; PUBKEY_HASH_SIZE];
    pubkey_hash.copy_from_slice(&payload[1..]);
    Ok((payload[0], pubkey_hash))
}
