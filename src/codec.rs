//! Fixed-layout little-endian binary codec and identifier hashing
//!
//! Every entity encodes as a concatenation of fixed-width little-endian
//! integers, raw 32-byte hashes, and single-byte length-prefixed byte
//! fields. Identifiers are the double SHA-256 of the full encoding.
//!
//! Layouts:
//! - Input:  prev tx hash (32) ++ output index (u32) ++ script len (u8) ++ script ++ sequence (u32)
//! - Output: value (i32) ++ script len (u8) ++ script
//! - Transaction: version (i32) ++ input count (i64) ++ inputs ++ output count (i64) ++ outputs ++ lock time (i32)
//! - Header: version (i32) ++ prev block hash (32) ++ merkle root (32) ++ timestamp (i64) ++ target (i32) ++ nonce (i32)
//! - Block: size (i32) ++ header ++ tx count (i64) ++ transactions

use crate::constants::*;
use crate::error::{DecodeError, LedgerError, Result};
use crate::hashes::{double_sha256, sha256, to_hex};
use crate::types::*;

/// Entities with a canonical byte encoding
pub trait Encodable {
    fn encode_to(&self, out: &mut Vec<u8>);

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_to(&mut out);
        out
    }
}

/// Entities that can be rebuilt from their canonical encoding
pub trait Decodable: Sized {
    fn decode_from(reader: &mut Reader<'_>) -> std::result::Result<Self, DecodeError>;

    /// Decode one entity from the front of `bytes`, returning it and the number of bytes consumed
    fn decode(bytes: &[u8]) -> Result<(Self, usize)> {
        Self::decode_with_limit(bytes, DEFAULT_MAX_DECODE_SIZE)
    }

    /// Like [`Decodable::decode`], refusing inputs longer than `limit` before reading anything
    fn decode_with_limit(bytes: &[u8], limit: usize) -> Result<(Self, usize)> {
        if bytes.len() > limit {
            return Err(DecodeError::InputTooLarge {
                len: bytes.len(),
                limit,
            }
            .into());
        }
        let mut reader = Reader::new(bytes);
        let value = Self::decode_from(&mut reader)?;
        Ok((value, reader.position()))
    }

    /// Decode an entity that must span all of `bytes`
    fn decode_exact(bytes: &[u8], limit: usize) -> Result<Self> {
        let (value, consumed) = Self::decode_with_limit(bytes, limit)?;
        if consumed != bytes.len() {
            return Err(DecodeError::TrailingBytes(bytes.len() - consumed).into());
        }
        Ok(value)
    }
}

/// Forward-only cursor over untrusted bytes
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn take(&mut self, needed: usize) -> std::result::Result<&'a [u8], DecodeError> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(DecodeError::TruncatedInput { needed, remaining });
        }
        let slice = &self.bytes[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> std::result::Result<[u8; N], DecodeError> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.take(N)?);
        Ok(array)
    }

    pub fn read_u8(&mut self) -> std::result::Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i32(&mut self) -> std::result::Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    pub fn read_u32(&mut self) -> std::result::Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    pub fn read_i64(&mut self) -> std::result::Result<i64, DecodeError> {
        Ok(i64::from_le_bytes(self.take_array()?))
    }

    pub fn read_hash(&mut self) -> std::result::Result<Hash, DecodeError> {
        self.take_array()
    }

    /// Single length byte followed by that many raw bytes
    pub fn read_var_bytes(&mut self) -> std::result::Result<&'a [u8], DecodeError> {
        let len = self.read_u8()? as usize;
        self.take(len)
    }

    /// An i64 element count, where each element encodes to at least
    /// `min_size` bytes. A count that cannot fit in what is left is truncated
    /// input, so the returned count is safe to pre-allocate for.
    pub fn read_count(&mut self, min_size: usize) -> std::result::Result<usize, DecodeError> {
        let count = self.read_i64()?;
        if count < 0 {
            return Err(DecodeError::NegativeCount(count));
        }
        let remaining = self.remaining();
        if count as u64 > (remaining / min_size.max(1)) as u64 {
            return Err(DecodeError::TruncatedInput {
                needed: usize::try_from(count)
                    .unwrap_or(usize::MAX)
                    .saturating_mul(min_size),
                remaining,
            });
        }
        Ok(count as usize)
    }

    fn read_script(&mut self) -> std::result::Result<ScriptBytes, DecodeError> {
        Ok(ScriptBytes::from_prefixed(self.read_var_bytes()?))
    }
}

fn write_script(out: &mut Vec<u8>, script: &ScriptBytes) {
    out.push(script.len_byte());
    out.extend_from_slice(script.as_bytes());
}

fn write_count(out: &mut Vec<u8>, count: usize) {
    out.extend_from_slice(&(count as i64).to_le_bytes());
}

impl Encodable for TransactionInput {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.prev_tx_hash);
        out.extend_from_slice(&self.output_index.to_le_bytes());
        write_script(out, &self.unlocking_script);
        out.extend_from_slice(&self.sequence.to_le_bytes());
    }
}

impl TransactionInput {
    /// Encoding committed to by signatures: the unlocking script becomes one zero byte
    pub fn encode_for_signing(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.prev_tx_hash);
        out.extend_from_slice(&self.output_index.to_le_bytes());
        out.push(SIGNING_SCRIPT_PLACEHOLDER);
        out.extend_from_slice(&self.sequence.to_le_bytes());
    }
}

impl Decodable for TransactionInput {
    fn decode_from(reader: &mut Reader<'_>) -> std::result::Result<Self, DecodeError> {
        Ok(Self {
            prev_tx_hash: reader.read_hash()?,
            output_index: reader.read_u32()?,
            unlocking_script: reader.read_script()?,
            sequence: reader.read_u32()?,
        })
    }
}

impl Encodable for TransactionOutput {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.value.to_le_bytes());
        write_script(out, &self.locking_script);
    }
}

impl Decodable for TransactionOutput {
    fn decode_from(reader: &mut Reader<'_>) -> std::result::Result<Self, DecodeError> {
        Ok(Self {
            value: reader.read_i32()?,
            locking_script: reader.read_script()?,
        })
    }
}

impl Encodable for Transaction {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.version.to_le_bytes());
        write_count(out, self.inputs.len());
        for input in &self.inputs {
            input.encode_to(out);
        }
        write_count(out, self.outputs.len());
        for output in &self.outputs {
            output.encode_to(out);
        }
        out.extend_from_slice(&self.lock_time.to_le_bytes());
    }
}

impl Decodable for Transaction {
    fn decode_from(reader: &mut Reader<'_>) -> std::result::Result<Self, DecodeError> {
        let version = reader.read_i32()?;

        let input_count = reader.read_count(MIN_INPUT_SIZE)?;
        let mut inputs = Vec::with_capacity(input_count);
        for _ in 0..input_count {
            inputs.push(TransactionInput::decode_from(reader)?);
        }

        let output_count = reader.read_count(MIN_OUTPUT_SIZE)?;
        let mut outputs = Vec::with_capacity(output_count);
        for _ in 0..output_count {
            outputs.push(TransactionOutput::decode_from(reader)?);
        }

        Ok(Self {
            version,
            inputs,
            outputs,
            lock_time: reader.read_i32()?,
        })
    }
}

impl Transaction {
    /// Transaction identifier: SHA256(SHA256(encode(tx)))
    pub fn hash(&self) -> Hash {
        double_sha256(&self.encode())
    }

    pub fn hash_hex(&self) -> String {
        to_hex(&self.hash())
    }

    /// Sign-restricted serialization: the full encoding with every unlocking
    /// script replaced by a single zero byte.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.version.to_le_bytes());
        write_count(&mut out, self.inputs.len());
        for input in &self.inputs {
            input.encode_for_signing(&mut out);
        }
        write_count(&mut out, self.outputs.len());
        for output in &self.outputs {
            output.encode_to(&mut out);
        }
        out.extend_from_slice(&self.lock_time.to_le_bytes());
        out
    }

    /// Message signed by spends: a single SHA-256 of [`Transaction::signing_bytes`]
    pub fn signing_digest(&self) -> Hash {
        sha256(&self.signing_bytes())
    }
}

impl Encodable for BlockHeader {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.prev_block_hash);
        out.extend_from_slice(&self.merkle_root);
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out.extend_from_slice(&self.difficulty_target.to_le_bytes());
        out.extend_from_slice(&self.nonce.to_le_bytes());
    }
}

impl Decodable for BlockHeader {
    fn decode_from(reader: &mut Reader<'_>) -> std::result::Result<Self, DecodeError> {
        Ok(Self {
            version: reader.read_i32()?,
            prev_block_hash: reader.read_hash()?,
            merkle_root: reader.read_hash()?,
            timestamp: reader.read_i64()?,
            difficulty_target: reader.read_i32()?,
            nonce: reader.read_i32()?,
        })
    }
}

impl BlockHeader {
    pub fn hash(&self) -> Hash {
        double_sha256(&self.encode())
    }

    pub fn hash_hex(&self) -> String {
        to_hex(&self.hash())
    }
}

impl Encodable for Block {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.size.to_le_bytes());
        self.header.encode_to(out);
        write_count(out, self.transactions.len());
        for tx in &self.transactions {
            tx.encode_to(out);
        }
    }
}

impl Decodable for Block {
    fn decode_from(reader: &mut Reader<'_>) -> std::result::Result<Self, DecodeError> {
        let size = reader.read_i32()?;
        let header = BlockHeader::decode_from(reader)?;
        let tx_count = reader.read_count(MIN_TRANSACTION_SIZE)?;
        let mut transactions = Vec::with_capacity(tx_count);
        for _ in 0..tx_count {
            transactions.push(Transaction::decode_from(reader)?);
        }
        Ok(Self {
            size,
            header,
            transactions,
        })
    }
}

impl Block {
    /// Block hash: double SHA-256 of the whole serialized block, header included by value
    pub fn hash(&self) -> Hash {
        double_sha256(&self.encode())
    }

    pub fn hash_hex(&self) -> String {
        to_hex(&self.hash())
    }
}

/// Parse a 64-character hex string into a hash
pub fn hash_from_hex(hex_str: &str) -> Result<Hash> {
    let bytes = hex::decode(hex_str)?;
    if bytes.len() != HASH_SIZE {
        return Err(LedgerError::Hex(hex::FromHexError::InvalidStringLength));
    }
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes);
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input(script: Vec<u8>) -> TransactionInput {
        TransactionInput {
            prev_tx_hash: [7u8; 32],
            output_index: 3,
            unlocking_script: ScriptBytes::new(script).unwrap(),
            sequence: 0xffff_fffe,
        }
    }

    fn sample_tx() -> Transaction {
        Transaction {
            version: 10,
            inputs: vec![sample_input(vec![1, 2, 3])],
            outputs: vec![TransactionOutput {
                value: 50,
                locking_script: ScriptBytes::new(vec![9; 30]).unwrap(),
            }],
            lock_time: 10,
        }
    }

    #[test]
    fn test_input_layout() {
        let bytes = sample_input(vec![0xaa, 0xbb]).encode();
        assert_eq!(bytes.len(), 32 + 4 + 1 + 2 + 4);
        assert_eq!(&bytes[..32], &[7u8; 32]);
        assert_eq!(&bytes[32..36], &[3, 0, 0, 0]);
        assert_eq!(bytes[36], 2);
        assert_eq!(&bytes[37..39], &[0xaa, 0xbb]);
        assert_eq!(&bytes[39..], &[0xfe, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn test_output_layout() {
        let output = TransactionOutput {
            value: -2,
            locking_script: ScriptBytes::empty(),
        };
        assert_eq!(output.encode(), vec![0xfe, 0xff, 0xff, 0xff, 0x00]);
    }

    #[test]
    fn test_header_layout() {
        let header = BlockHeader {
            version: 1,
            prev_block_hash: [0x11; 32],
            merkle_root: [0x22; 32],
            timestamp: 0x0102030405060708,
            difficulty_target: 0x1d00ffff,
            nonce: 42,
        };
        let bytes = header.encode();
        assert_eq!(bytes.len(), BLOCK_HEADER_SIZE);
        assert_eq!(&bytes[0..4], &[1, 0, 0, 0]);
        assert_eq!(&bytes[68..76], &[8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(&bytes[76..80], &[0xff, 0xff, 0x00, 0x1d]);
        assert_eq!(&bytes[80..84], &[42, 0, 0, 0]);
    }

    #[test]
    fn test_transaction_roundtrip_preserves_order() {
        let mut tx = sample_tx();
        tx.inputs.push(sample_input(vec![]));
        tx.inputs.push(sample_input(vec![0xff; 255]));
        tx.inputs[1].output_index = 99;

        let bytes = tx.encode();
        let (decoded, consumed) = Transaction::decode(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, tx);
        assert_eq!(decoded.inputs[1].output_index, 99);
    }

    #[test]
    fn test_decode_reports_bytes_consumed() {
        let tx = sample_tx();
        let mut bytes = tx.encode();
        let len = bytes.len();
        bytes.extend_from_slice(&[0xde, 0xad]);

        let (_, consumed) = Transaction::decode(&bytes).unwrap();
        assert_eq!(consumed, len);
        assert!(matches!(
            Transaction::decode_exact(&bytes, DEFAULT_MAX_DECODE_SIZE),
            Err(LedgerError::Decode(DecodeError::TrailingBytes(2)))
        ));
    }

    #[test]
    fn test_decode_truncated_fixed_field() {
        let bytes = sample_tx().encode();
        let result = Transaction::decode(&bytes[..bytes.len() - 1]);
        assert!(matches!(
            result,
            Err(LedgerError::Decode(DecodeError::TruncatedInput { needed: 4, remaining: 3 }))
        ));
    }

    #[test]
    fn test_decode_truncated_var_field() {
        let mut bytes = sample_input(vec![1, 2, 3]).encode();
        bytes.truncate(32 + 4 + 1 + 1);
        let result = TransactionInput::decode(&bytes);
        assert!(matches!(
            result,
            Err(LedgerError::Decode(DecodeError::TruncatedInput { needed: 3, remaining: 1 }))
        ));
    }

    #[test]
    fn test_decode_negative_count() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.extend_from_slice(&(-1i64).to_le_bytes());
        let result = Transaction::decode(&bytes);
        assert!(matches!(
            result,
            Err(LedgerError::Decode(DecodeError::NegativeCount(-1)))
        ));
    }

    #[test]
    fn test_decode_absurd_count_is_truncation() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.extend_from_slice(&i64::MAX.to_le_bytes());
        let result = Transaction::decode(&bytes);
        assert!(matches!(
            result,
            Err(LedgerError::Decode(DecodeError::TruncatedInput { .. }))
        ));
    }

    #[test]
    fn test_decode_count_bounded_by_min_element_size() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.extend_from_slice(&2i64.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 60]);
        let result = Transaction::decode(&bytes);
        assert!(matches!(
            result,
            Err(LedgerError::Decode(DecodeError::TruncatedInput { needed: 82, remaining: 60 }))
        ));
    }

    #[test]
    fn test_read_count_min_sizes_admit_smallest_encodings() {
        let empty_input = sample_input(vec![]).encode();
        assert_eq!(empty_input.len(), MIN_INPUT_SIZE);
        let empty_output = TransactionOutput {
            value: 0,
            locking_script: ScriptBytes::empty(),
        }
        .encode();
        assert_eq!(empty_output.len(), MIN_OUTPUT_SIZE);
        let empty_tx = Transaction {
            version: 1,
            inputs: vec![],
            outputs: vec![],
            lock_time: 0,
        }
        .encode();
        assert_eq!(empty_tx.len(), MIN_TRANSACTION_SIZE);

        let mut bytes = 3i64.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 3 * MIN_OUTPUT_SIZE]);
        let mut reader = Reader::new(&bytes);
        assert_eq!(reader.read_count(MIN_OUTPUT_SIZE).unwrap(), 3);
    }

    #[test]
    fn test_decode_limit() {
        let bytes = sample_tx().encode();
        let result = Transaction::decode_with_limit(&bytes, bytes.len() - 1);
        assert!(matches!(
            result,
            Err(LedgerError::Decode(DecodeError::InputTooLarge { .. }))
        ));
        assert!(Transaction::decode_with_limit(&bytes, bytes.len()).is_ok());
    }

    #[test]
    fn test_signing_bytes_ignore_unlocking_script() {
        let tx = sample_tx();
        let mut other = tx.clone();
        other.inputs[0].unlocking_script = ScriptBytes::new(vec![0x55; 100]).unwrap();

        assert_ne!(tx.hash(), other.hash());
        assert_eq!(tx.signing_bytes(), other.signing_bytes());
        assert_eq!(tx.signing_digest(), sha256(&tx.signing_bytes()));
    }

    #[test]
    fn test_signing_bytes_match_encoding_with_empty_scripts() {
        let mut tx = sample_tx();
        let signing = tx.signing_bytes();
        tx.inputs[0].unlocking_script = ScriptBytes::empty();
        assert_eq!(signing, tx.encode());
    }

    #[test]
    fn test_signing_bytes_commit_to_outputs() {
        let tx = sample_tx();
        let mut other = tx.clone();
        other.outputs[0].value += 1;
        assert_ne!(tx.signing_digest(), other.signing_digest());
    }

    #[test]
    fn test_hash_is_double_sha256_of_encoding() {
        let tx = sample_tx();
        assert_eq!(tx.hash(), double_sha256(&tx.encode()));
        assert_eq!(tx.hash_hex(), to_hex(&tx.hash()));
        assert_eq!(tx.hash_hex().len(), 64);
    }

    #[test]
    fn test_hash_from_hex() {
        let hash = [0x5a; 32];
        assert_eq!(hash_from_hex(&to_hex(&hash)).unwrap(), hash);
        assert!(hash_from_hex("abcd").is_err());
        assert!(hash_from_hex("zz").is_err());
    }
}
