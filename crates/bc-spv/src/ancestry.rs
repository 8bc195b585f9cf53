//! Ancestry codec: a payment transaction bundled with its ancestors.
//!
//! The binary form (version byte 1) carries the payment transaction
//! first, then a stream of `(flag, length, data)` chunks. A flag-1
//! chunk introduces a new ancestor transaction; flag-2 attaches proof
//! bytes and flag-3 a miner-callback list to the most recently
//! introduced ancestor.

use std::collections::HashMap;

use bc_block::{Bump, MerkleProof};
use bc_primitives::chainhash::Hash;
use bc_primitives::util::{ByteReader, ByteWriter, VarInt};
use bc_transaction::Transaction;

use crate::miner_callback::MinerCallback;
use crate::SpvError;

/// Chunk flag introducing an ancestor transaction.
pub(crate) const FLAG_TX: u8 = 1;
/// Chunk flag attaching proof bytes to the current ancestor.
pub(crate) const FLAG_PROOF: u8 = 2;
/// Chunk flag attaching a miner-callback list to the current ancestor.
pub(crate) const FLAG_MAPI: u8 = 3;

/// Version byte of the ancestry binary format.
pub const ANCESTRY_VERSION: u8 = 1;

/// An ancestor transaction with its optional anchor proof and miner
/// callbacks. Created during ancestry parsing, never mutated after,
/// consumed during verification.
#[derive(Clone, Debug)]
pub struct Ancestor {
    /// The ancestor transaction.
    pub tx: Transaction,
    /// Raw proof bytes: a TSC MerkleProof or a BRC-74 BUMP.
    pub proof: Option<Vec<u8>>,
    /// Miner callbacks attached to this ancestor.
    pub miner_callbacks: Vec<MinerCallback>,
}

impl Ancestor {
    /// Create an ancestor carrying just a transaction.
    pub fn new(tx: Transaction) -> Self {
        Ancestor {
            tx,
            proof: None,
            miner_callbacks: Vec::new(),
        }
    }

    /// Whether this ancestor carries an anchor proof.
    pub fn is_anchored(&self) -> bool {
        self.proof.is_some()
    }
}

/// A parsed anchor proof: either format may appear in an ancestor's
/// proof bytes.
#[derive(Clone, Debug)]
pub enum AncestorProof {
    /// A TSC Merkle proof, resolved against the block header chain.
    MerkleProof(MerkleProof),
    /// A BRC-74 BUMP, resolved against a chain tracker by height.
    Bump(Bump),
}

impl AncestorProof {
    /// Detect and parse proof bytes.
    ///
    /// Both parsers are strict (full consumption, exact field widths),
    /// so the formats do not collide in practice. The MerkleProof
    /// interpretation is tried first.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SpvError> {
        if let Ok(proof) = MerkleProof::from_bytes(bytes) {
            return Ok(AncestorProof::MerkleProof(proof));
        }
        Bump::from_bytes(bytes)
            .map(AncestorProof::Bump)
            .map_err(|_| SpvError::InvalidProof)
    }
}

/// A payment transaction and the graph of its ancestors, keyed by txid.
///
/// Ancestors keep their insertion order so serialization replays the
/// parsed stream; lookups go through a txid index.
#[derive(Clone, Debug, Default)]
pub struct Ancestry {
    /// The payment (tip) transaction this ancestry backs.
    pub payment_tx: Transaction,
    ancestors: Vec<Ancestor>,
    index: HashMap<Hash, usize>,
}

impl Ancestry {
    /// Create an ancestry for a payment with no ancestors yet.
    pub fn new(payment_tx: Transaction) -> Self {
        Ancestry {
            payment_tx,
            ancestors: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Append an ancestor, rejecting txid duplicates.
    pub fn insert(&mut self, ancestor: Ancestor) -> Result<(), SpvError> {
        let txid = ancestor.tx.tx_id();
        if self.index.contains_key(&txid) {
            return Err(SpvError::DuplicateAncestor(txid.to_string()));
        }
        self.index.insert(txid, self.ancestors.len());
        self.ancestors.push(ancestor);
        Ok(())
    }

    /// Look up an ancestor by txid.
    pub fn get(&self, txid: &Hash) -> Option<&Ancestor> {
        self.index.get(txid).map(|&i| &self.ancestors[i])
    }

    /// Fetch the parent transaction an input references.
    pub fn parent_tx(&self, txid: &Hash) -> Result<&Transaction, SpvError> {
        self.get(txid)
            .map(|ancestor| &ancestor.tx)
            .ok_or_else(|| SpvError::NotAllInputsSupplied(txid.to_string()))
    }

    /// The ancestors in insertion order.
    pub fn ancestors(&self) -> &[Ancestor] {
        &self.ancestors
    }

    /// Number of ancestors.
    pub fn len(&self) -> usize {
        self.ancestors.len()
    }

    /// Whether the ancestry holds no ancestors.
    pub fn is_empty(&self) -> bool {
        self.ancestors.is_empty()
    }

    /// Parse an ancestry from its binary form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SpvError> {
        if bytes.is_empty() {
            return Err(SpvError::NilInitialPayment);
        }
        if bytes[0] != ANCESTRY_VERSION {
            return Err(SpvError::UnsupportedVersion(bytes[0]));
        }

        let mut reader = ByteReader::new(&bytes[1..]);

        let payment_len = reader
            .read_varint()
            .map_err(|_| SpvError::Truncated("payment tx length"))?
            .value() as usize;
        let payment_bytes = reader
            .read_bytes(payment_len)
            .map_err(|_| SpvError::Truncated("payment tx"))?;
        let mut ancestry = Ancestry::new(Transaction::from_bytes(payment_bytes)?);

        while reader.remaining() > 0 {
            let flag = reader
                .read_u8()
                .map_err(|_| SpvError::Truncated("chunk flag"))?;
            let len = reader
                .read_varint()
                .map_err(|_| SpvError::Truncated("chunk length"))?
                .value() as usize;
            let data = reader
                .read_bytes(len)
                .map_err(|_| SpvError::Truncated("chunk data"))?;

            match flag {
                FLAG_TX => {
                    ancestry.insert(Ancestor::new(Transaction::from_bytes(data)?))?;
                }
                FLAG_PROOF => {
                    let current = ancestry
                        .ancestors
                        .last_mut()
                        .ok_or(SpvError::OrphanChunk(FLAG_PROOF))?;
                    current.proof = Some(data.to_vec());
                }
                FLAG_MAPI => {
                    let current = ancestry
                        .ancestors
                        .last_mut()
                        .ok_or(SpvError::OrphanChunk(FLAG_MAPI))?;
                    current.miner_callbacks = parse_miner_callbacks(data)?;
                }
                other => return Err(SpvError::InvalidFlags(other)),
            }
        }

        Ok(ancestry)
    }

    /// Parse an ancestry from hex.
    pub fn from_hex(hex_str: &str) -> Result<Self, SpvError> {
        Self::from_bytes(&hex::decode(hex_str)?)
    }

    /// Serialize the ancestry to its binary form, ancestors in
    /// insertion order.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SpvError> {
        let mut writer = ByteWriter::new();
        writer.write_u8(ANCESTRY_VERSION);

        let payment = self.payment_tx.to_bytes();
        writer.write_varint(VarInt::from(payment.len()));
        writer.write_bytes(&payment);

        for ancestor in &self.ancestors {
            let tx = ancestor.tx.to_bytes();
            writer.write_u8(FLAG_TX);
            writer.write_varint(VarInt::from(tx.len()));
            writer.write_bytes(&tx);

            if let Some(proof) = &ancestor.proof {
                writer.write_u8(FLAG_PROOF);
                writer.write_varint(VarInt::from(proof.len()));
                writer.write_bytes(proof);
            }

            if !ancestor.miner_callbacks.is_empty() {
                let payload = serialize_miner_callbacks(&ancestor.miner_callbacks)?;
                writer.write_u8(FLAG_MAPI);
                writer.write_varint(VarInt::from(payload.len()));
                writer.write_bytes(&payload);
            }
        }

        Ok(writer.into_bytes())
    }

    /// Serialize the ancestry to hex.
    pub fn to_hex(&self) -> Result<String, SpvError> {
        Ok(hex::encode(self.to_bytes()?))
    }
}

/// Parse a flag-3 payload: `u8 count` then `count` length-prefixed
/// miner-callback JSON envelopes.
fn parse_miner_callbacks(bytes: &[u8]) -> Result<Vec<MinerCallback>, SpvError> {
    if bytes.is_empty() {
        return Err(SpvError::EmptyCallbacks);
    }
    let mut reader = ByteReader::new(bytes);
    let count = reader
        .read_u8()
        .map_err(|_| SpvError::Truncated("callback count"))?;
    if count == 0 {
        return Err(SpvError::EmptyCallbacks);
    }

    let mut callbacks = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let len = reader
            .read_varint()
            .map_err(|_| SpvError::Truncated("callback length"))?
            .value() as usize;
        let data = reader
            .read_bytes(len)
            .map_err(|_| SpvError::Truncated("callback data"))?;
        callbacks.push(MinerCallback::from_bytes(data)?);
    }

    if reader.remaining() != 0 {
        return Err(SpvError::TrailingBytes(reader.remaining()));
    }
    Ok(callbacks)
}

/// Serialize a miner-callback list into a flag-3 payload.
fn serialize_miner_callbacks(callbacks: &[MinerCallback]) -> Result<Vec<u8>, SpvError> {
    let count = u8::try_from(callbacks.len())
        .map_err(|_| SpvError::TooManyCallbacks(callbacks.len()))?;
    let mut writer = ByteWriter::new();
    writer.write_u8(count);
    for callback in callbacks {
        let bytes = callback.to_bytes()?;
        writer.write_varint(VarInt::from(bytes.len()));
        writer.write_bytes(&bytes);
    }
    Ok(writer.into_bytes())
}
