//! Script execution engine
//!
//! Scripts are sequences of typed operands rather than raw opcode bytes.
//! Execution concatenates the unlocking program with the locking program and
//! runs every operand, in order, against one stack:
//! 1. Data pushes (signature, public key, public-key hash) push a copy of themselves
//! 2. Control opcodes check their preconditions and either pass, reject, or error
//! 3. Execution stops at the first reject or error
//! 4. A non-empty program in which every operand passed is accepted
//!
//! A reject (`StepOutcome::Fail`) means the script is well-formed and says
//! "no". An error means the script or its cryptographic material is
//! malformed. Both end execution; callers can tell them apart.

use crate::codec::Reader;
use crate::constants::*;
use crate::error::{DecodeError, LedgerError, RejectReason, Result};
use crate::hashes::hash160;
use crate::keys::Key;
use crate::types::*;
use log::{debug, trace};
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1};
use serde::{Deserialize, Serialize};

/// A single script element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// DER-encoded ECDSA signature
    Signature(ByteString),
    /// Compressed secp256k1 public key
    PublicKey(ByteString),
    /// RIPEMD160(SHA256(public key)); pushed literally or produced by OP_HASH160
    PublicKeyHash(ByteString),
    Duplicate,
    Hash160,
    EqualVerify,
    CheckSig,
}

impl Operand {
    pub fn opcode(&self) -> u8 {
        match self {
            Operand::Signature(_) => OP_SIGNATURE,
            Operand::PublicKey(_) => OP_PUBKEY,
            Operand::PublicKeyHash(_) => OP_PUBKEY_HASH,
            Operand::Duplicate => OP_DUP,
            Operand::Hash160 => OP_HASH160,
            Operand::EqualVerify => OP_EQUALVERIFY,
            Operand::CheckSig => OP_CHECKSIG,
        }
    }

    /// Payload bytes; empty for control opcodes
    pub fn data(&self) -> &[u8] {
        match self {
            Operand::Signature(bytes) | Operand::PublicKey(bytes) | Operand::PublicKeyHash(bytes) => {
                bytes.as_slice()
            }
            Operand::Duplicate | Operand::Hash160 | Operand::EqualVerify | Operand::CheckSig => &[],
        }
    }

    pub fn data_len(&self) -> usize {
        self.data().len()
    }

    pub fn is_push(&self) -> bool {
        matches!(
            self,
            Operand::Signature(_) | Operand::PublicKey(_) | Operand::PublicKeyHash(_)
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operand::Signature(_) => "SIG",
            Operand::PublicKey(_) => "PUB_KEY",
            Operand::PublicKeyHash(_) => "PUB_KEY_HASH",
            Operand::Duplicate => "OP_DUP",
            Operand::Hash160 => "OP_HASH160",
            Operand::EqualVerify => "OP_EQUALVERIFY",
            Operand::CheckSig => "OP_CHECKSIG",
        }
    }
}

/// Serialize operands as `opcode ++ data length ++ data` each, behind the
/// 255-byte script limit.
pub fn encode_script(operands: &[Operand]) -> Result<ScriptBytes> {
    let mut out = Vec::new();
    for operand in operands {
        let len = operand.data_len();
        if len > MAX_VAR_FIELD_LEN {
            return Err(LedgerError::FieldTooLong {
                len,
                max: MAX_VAR_FIELD_LEN,
            });
        }
        out.push(operand.opcode());
        out.push(len as u8);
        out.extend_from_slice(operand.data());
    }
    ScriptBytes::new(out)
}

pub fn decode_script(bytes: &[u8]) -> Result<Vec<Operand>> {
    let mut reader = Reader::new(bytes);
    let mut operands = Vec::new();
    while !reader.is_empty() {
        let opcode = reader.read_u8()?;
        let data = reader.read_var_bytes()?;
        let operand = match opcode {
            OP_SIGNATURE => Operand::Signature(data.to_vec()),
            OP_PUBKEY => Operand::PublicKey(data.to_vec()),
            OP_PUBKEY_HASH => Operand::PublicKeyHash(data.to_vec()),
            OP_DUP | OP_HASH160 | OP_EQUALVERIFY | OP_CHECKSIG if !data.is_empty() => {
                return Err(DecodeError::InvalidOperandLength {
                    opcode,
                    len: data.len() as u8,
                }
                .into());
            }
            OP_DUP => Operand::Duplicate,
            OP_HASH160 => Operand::Hash160,
            OP_EQUALVERIFY => Operand::EqualVerify,
            OP_CHECKSIG => Operand::CheckSig,
            unknown => return Err(DecodeError::UnknownOpcode(unknown).into()),
        };
        operands.push(operand);
    }
    Ok(operands)
}

/// Execution stack; the top is the last element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stack {
    items: Vec<Operand>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Operand] {
        &self.items
    }

    pub fn top(&self) -> Option<&Operand> {
        self.items.last()
    }

    pub fn second(&self) -> Option<&Operand> {
        self.items.len().checked_sub(2).map(|i| &self.items[i])
    }

    pub fn push(&mut self, operand: Operand) {
        self.items.push(operand);
    }

    pub fn pop(&mut self) -> Option<Operand> {
        self.items.pop()
    }

    /// Remove the top two elements on behalf of `opcode`, leaving the stack
    /// untouched when fewer than two are present
    pub fn pop_two(&mut self, opcode: &Operand) -> Result<()> {
        self.require(opcode, 2)?;
        self.items.truncate(self.items.len() - 2);
        Ok(())
    }

    /// Push an independent copy of the top element, which must be a public key
    pub fn duplicate_top(&mut self) -> Result<()> {
        match self.items.last() {
            None => Err(LedgerError::ScriptUnderflow {
                opcode: Operand::Duplicate.name(),
                needed: 1,
                available: 0,
            }),
            Some(Operand::PublicKey(key)) => {
                let copy = Operand::PublicKey(key.clone());
                self.items.push(copy);
                Ok(())
            }
            Some(other) => Err(LedgerError::ScriptTypeMismatch {
                opcode: Operand::Duplicate.name(),
                expected: "PUB_KEY",
                found: other.name(),
            }),
        }
    }

    /// Variant names, bottom to top
    pub fn operand_names(&self) -> Vec<&'static str> {
        self.items.iter().map(Operand::name).collect()
    }

    fn require(&self, opcode: &Operand, needed: usize) -> Result<()> {
        if self.items.len() < needed {
            return Err(LedgerError::ScriptUnderflow {
                opcode: opcode.name(),
                needed,
                available: self.items.len(),
            });
        }
        Ok(())
    }
}

/// What an executing script may ask of the transaction it authorizes
pub trait ScriptContext {
    /// Digest that OP_CHECKSIG verifies signatures against
    fn signing_digest(&self) -> Hash;
}

impl ScriptContext for Transaction {
    fn signing_digest(&self) -> Hash {
        Transaction::signing_digest(self)
    }
}

/// Result of one operand that did not error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Pass,
    Fail(RejectReason),
}

/// Final answer for a whole program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptVerdict {
    Accepted,
    Rejected {
        /// Index of the rejecting operand in the combined program
        position: usize,
        reason: RejectReason,
    },
}

impl ScriptVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ScriptVerdict::Accepted)
    }

    /// Flatten a reject into an error, keeping signature failures distinct
    pub fn into_result(self) -> Result<()> {
        match self {
            ScriptVerdict::Accepted => Ok(()),
            ScriptVerdict::Rejected {
                reason: RejectReason::SignatureInvalid,
                ..
            } => Err(LedgerError::SignatureInvalid),
            ScriptVerdict::Rejected { position, reason } => {
                Err(LedgerError::ScriptRejected { position, reason })
            }
        }
    }
}

/// Execute a single operand
pub fn execute_operand(
    operand: &Operand,
    stack: &mut Stack,
    context: &dyn ScriptContext,
) -> Result<StepOutcome> {
    match operand {
        Operand::Signature(_) | Operand::PublicKey(_) | Operand::PublicKeyHash(_) => {
            stack.push(operand.clone());
            Ok(StepOutcome::Pass)
        }

        Operand::Duplicate => {
            stack.duplicate_top()?;
            Ok(StepOutcome::Pass)
        }

        Operand::Hash160 => {
            stack.require(operand, 1)?;
            let hash = match stack.top() {
                Some(Operand::PublicKey(key)) => hash160(key),
                _ => return Ok(StepOutcome::Fail(RejectReason::NotAPublicKey)),
            };
            stack.pop();
            stack.push(Operand::PublicKeyHash(hash.to_vec()));
            Ok(StepOutcome::Pass)
        }

        Operand::EqualVerify => {
            stack.require(operand, 2)?;
            let equal = match (stack.top(), stack.second()) {
                (Some(first), Some(second)) => first.data() == second.data(),
                _ => false,
            };
            if !equal {
                return Ok(StepOutcome::Fail(RejectReason::NotEqual));
            }
            stack.pop_two(operand)?;
            Ok(StepOutcome::Pass)
        }

        Operand::CheckSig => {
            stack.require(operand, 2)?;
            let (pubkey_bytes, signature_bytes) = match (stack.top(), stack.second()) {
                (Some(Operand::PublicKey(key)), Some(Operand::Signature(sig))) => (key, sig),
                (Some(Operand::PublicKey(_)), Some(other)) => {
                    return Err(LedgerError::ScriptTypeMismatch {
                        opcode: operand.name(),
                        expected: "SIG",
                        found: other.name(),
                    })
                }
                (Some(other), Some(_)) => {
                    return Err(LedgerError::ScriptTypeMismatch {
                        opcode: operand.name(),
                        expected: "PUB_KEY",
                        found: other.name(),
                    })
                }
                _ => {
                    return Err(LedgerError::ScriptUnderflow {
                        opcode: operand.name(),
                        needed: 2,
                        available: stack.len(),
                    })
                }
            };

            if !verify_signature(pubkey_bytes, signature_bytes, &context.signing_digest())? {
                return Ok(StepOutcome::Fail(RejectReason::SignatureInvalid));
            }
            stack.pop_two(operand)?;
            Ok(StepOutcome::Pass)
        }
    }
}

/// Parse a compressed public key and a DER signature, then verify the
/// signature over `digest`. Parse failures are errors; a well-formed
/// signature that does not verify is `Ok(false)`.
pub fn verify_signature(pubkey_bytes: &[u8], signature_bytes: &[u8], digest: &Hash) -> Result<bool> {
    if pubkey_bytes.len() != COMPRESSED_PUBKEY_SIZE {
        return Err(LedgerError::KeyParse(format!(
            "expected {} byte compressed key, got {} bytes",
            COMPRESSED_PUBKEY_SIZE,
            pubkey_bytes.len()
        )));
    }
    let pubkey =
        PublicKey::from_slice(pubkey_bytes).map_err(|e| LedgerError::KeyParse(e.to_string()))?;

    let mut signature = Signature::from_der(signature_bytes)
        .map_err(|e| LedgerError::SignatureParse(e.to_string()))?;
    // libsecp256k1 only verifies low-S signatures
    signature.normalize_s();

    let secp = Secp256k1::verification_only();
    let message = Message::from_digest(*digest);
    Ok(secp.verify_ecdsa(&message, &signature, &pubkey).is_ok())
}

/// Run `program` on `stack`, halting at the first operand that rejects or errors
pub fn eval_program(
    program: &[Operand],
    stack: &mut Stack,
    context: &dyn ScriptContext,
) -> Result<ScriptVerdict> {
    if program.is_empty() {
        return Ok(ScriptVerdict::Rejected {
            position: 0,
            reason: RejectReason::EmptyProgram,
        });
    }

    for (position, operand) in program.iter().enumerate() {
        trace!("script[{}] {} on stack {:?}", position, operand.name(), stack.operand_names());
        match execute_operand(operand, stack, context)? {
            StepOutcome::Pass => {}
            StepOutcome::Fail(reason) => {
                debug!("script rejected at {} ({}): {}", position, operand.name(), reason);
                return Ok(ScriptVerdict::Rejected { position, reason });
            }
        }
    }

    Ok(ScriptVerdict::Accepted)
}

/// Execute `unlocking ++ locking` on one fresh stack
pub fn verify_script(
    unlocking: &[Operand],
    locking: &[Operand],
    context: &dyn ScriptContext,
) -> Result<ScriptVerdict> {
    let program: Vec<Operand> = unlocking.iter().chain(locking).cloned().collect();
    let mut stack = Stack::new();
    eval_program(&program, &mut stack, context)
}

/// Check input `index` of `tx` against the locking script of the output it spends.
///
/// Finding that output is the caller's job; only its locking script bytes are needed here.
pub fn verify_input(tx: &Transaction, index: usize, locking_script: &[u8]) -> Result<ScriptVerdict> {
    let input = tx.inputs.get(index).ok_or(LedgerError::InputIndexOutOfRange {
        index,
        count: tx.inputs.len(),
    })?;
    let unlocking = decode_script(input.unlocking_script.as_bytes())?;
    let locking = decode_script(locking_script)?;
    verify_script(&unlocking, &locking, tx)
}

/// `[OP_DUP, OP_HASH160, PUB_KEY_HASH(hash), OP_EQUALVERIFY, OP_CHECKSIG]`
pub fn p2pkh_locking(pubkey_hash: &PubKeyHash) -> Vec<Operand> {
    vec![
        Operand::Duplicate,
        Operand::Hash160,
        Operand::PublicKeyHash(pubkey_hash.to_vec()),
        Operand::EqualVerify,
        Operand::CheckSig,
    ]
}

/// `[SIG(signature), PUB_KEY(public_key)]`
pub fn p2pkh_unlocking(signature: ByteString, public_key: ByteString) -> Vec<Operand> {
    vec![Operand::Signature(signature), Operand::PublicKey(public_key)]
}

impl Transaction {
    /// DER signature by `key` over this transaction's signing digest
    pub fn sign_with_key(&self, key: &Key) -> ByteString {
        key.sign_digest(&self.signing_digest())
    }

    /// Fill input `index` with a pay-to-public-key-hash unlocking script for `key`.
    ///
    /// Unlocking scripts are not part of the signing digest, so inputs can be
    /// signed one after another.
    pub fn sign_p2pkh_input(&mut self, index: usize, key: &Key) -> Result<()> {
        let count = self.inputs.len();
        if index >= count {
            return Err(LedgerError::InputIndexOutOfRange { index, count });
        }
        let signature = self.sign_with_key(key);
        let unlocking = p2pkh_unlocking(signature, key.public_key_bytes().to_vec());
        self.inputs[index].unlocking_script = encode_script(&unlocking)?;
        Ok(())
    }
}
