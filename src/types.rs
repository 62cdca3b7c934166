//! Core ledger types

use crate::constants::MAX_VAR_FIELD_LEN;
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};

/// Hash type: 256-bit digest
pub type Hash = [u8; 32];

/// RIPEMD160(SHA256(compressed public key))
pub type PubKeyHash = [u8; 20];

/// Byte string type
pub type ByteString = Vec<u8>;

/// A variable-length field behind a single-byte length prefix.
///
/// Construction fails above 255 bytes, so an over-long script can never be
/// encoded with a truncated length byte.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ByteString", into = "ByteString")]
pub struct ScriptBytes(ByteString);

impl ScriptBytes {
    pub fn new(bytes: ByteString) -> Result<Self> {
        if bytes.len() > MAX_VAR_FIELD_LEN {
            return Err(LedgerError::FieldTooLong {
                len: bytes.len(),
                max: MAX_VAR_FIELD_LEN,
            });
        }
        Ok(Self(bytes))
    }

    /// Bytes read behind a u8 length prefix always fit
    pub(crate) fn from_prefixed(bytes: &[u8]) -> Self {
        debug_assert!(bytes.len() <= MAX_VAR_FIELD_LEN);
        Self(bytes.to_vec())
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Fits the length prefix by construction
    pub fn len_byte(&self) -> u8 {
        self.0.len() as u8
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> ByteString {
        self.0
    }
}

impl TryFrom<ByteString> for ScriptBytes {
    type Error = LedgerError;

    fn try_from(bytes: ByteString) -> Result<Self> {
        Self::new(bytes)
    }
}

impl From<ScriptBytes> for ByteString {
    fn from(script: ScriptBytes) -> Self {
        script.0
    }
}

impl AsRef<[u8]> for ScriptBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Transaction Input: previous transaction id, output index, unlocking script, sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub prev_tx_hash: Hash,
    pub output_index: u32,
    pub unlocking_script: ScriptBytes,
    pub sequence: u32,
}

/// Transaction Output: value and locking script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub value: i32,
    pub locking_script: ScriptBytes,
}

/// Transaction. Input and output counts are the lengths of the owned lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: i32,
}

/// Block Header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: i32,
    pub prev_block_hash: Hash,
    pub merkle_root: Hash,
    pub timestamp: i64,
    pub difficulty_target: i32,
    pub nonce: i32,
}

/// Block. `size` is informational and never checked against the encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub size: i32,
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_bytes_max_len() {
        let script = ScriptBytes::new(vec![0xab; 255]).unwrap();
        assert_eq!(script.len_byte(), 255);
        assert_eq!(script.len(), 255);
    }

    #[test]
    fn test_script_bytes_too_long() {
        let result = ScriptBytes::new(vec![0xab; 256]);
        assert!(matches!(
            result,
            Err(LedgerError::FieldTooLong { len: 256, max: 255 })
        ));
    }

    #[test]
    fn test_script_bytes_serde_rejects_too_long() {
        let json = serde_json::to_string(&vec![1u8; 300]).unwrap();
        assert!(serde_json::from_str::<ScriptBytes>(&json).is_err());

        let json = serde_json::to_string(&vec![1u8; 3]).unwrap();
        let script: ScriptBytes = serde_json::from_str(&json).unwrap();
        assert_eq!(script.as_bytes(), &[1, 1, 1]);
    }

    #[test]
    fn test_script_bytes_empty() {
        let script = ScriptBytes::empty();
        assert!(script.is_empty());
        assert_eq!(script.len_byte(), 0);
    }
}
