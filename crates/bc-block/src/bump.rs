//! BUMP: the BRC-74 unified Merkle path.
//!
//! A BUMP compactly proves that one or many transactions of the same
//! block share one Merkle root. Level 0 holds the proven txids and
//! their siblings; every higher level holds the one sibling needed per
//! proven branch. Within a level, leaves are kept sorted by offset so
//! the binary encoding is deterministic regardless of insertion order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use bc_primitives::chainhash::Hash;
use bc_primitives::hash::sha256d;
use bc_primitives::util::{ByteReader, ByteWriter, VarInt};

use crate::endian::{bytes_from_hex_reversed, hex_from_bytes_reversed};
use crate::BlockError;

/// The payload of a BUMP leaf: a real hash, or the duplicate marker for
/// the odd-width case ("hash the working value with itself").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeafValue {
    /// A real node hash.
    Hash(Hash),
    /// Sibling of the last node of an odd-width level.
    Duplicate,
}

/// A single leaf of a BUMP level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "LeafJson", try_from = "LeafJson")]
pub struct BumpLeaf {
    /// Position offset within this tree level.
    pub offset: u64,
    /// Hash value or duplicate marker.
    pub value: LeafValue,
    /// Whether this leaf is one of the transactions the BUMP proves.
    /// Only meaningful at level 0.
    pub is_txid: bool,
}

impl BumpLeaf {
    /// The leaf's hash, if it carries one.
    pub fn hash(&self) -> Option<&Hash> {
        match &self.value {
            LeafValue::Hash(h) => Some(h),
            LeafValue::Duplicate => None,
        }
    }
}

/// JSON shape of a leaf: `{offset, hash?, txid?, duplicate?}` with
/// absent optionals omitted.
#[derive(Serialize, Deserialize)]
struct LeafJson {
    offset: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    hash: Option<Hash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    txid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duplicate: Option<bool>,
}

impl From<BumpLeaf> for LeafJson {
    fn from(leaf: BumpLeaf) -> Self {
        LeafJson {
            offset: leaf.offset,
            hash: leaf.hash().copied(),
            txid: if leaf.is_txid { Some(true) } else { None },
            duplicate: match leaf.value {
                LeafValue::Duplicate => Some(true),
                LeafValue::Hash(_) => None,
            },
        }
    }
}

impl TryFrom<LeafJson> for BumpLeaf {
    type Error = String;

    fn try_from(json: LeafJson) -> Result<Self, Self::Error> {
        let value = match (json.duplicate.unwrap_or(false), json.hash) {
            (true, None) => LeafValue::Duplicate,
            (true, Some(_)) => return Err("duplicate leaf must not carry a hash".to_string()),
            (false, Some(h)) => LeafValue::Hash(h),
            (false, None) => return Err("leaf must carry a hash or the duplicate flag".to_string()),
        };
        Ok(BumpLeaf {
            offset: json.offset,
            value,
            is_txid: json.txid.unwrap_or(false),
        })
    }
}

/// A BRC-74 BUMP: block height plus one leaf set per tree level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bump {
    /// Block height the proven transactions were mined at.
    pub block_height: u64,
    /// Path levels from the leaves (index 0) to just below the root.
    pub path: Vec<Vec<BumpLeaf>>,
}

impl Bump {
    /// Parse a BUMP from its BRC-74 binary form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BlockError> {
        if bytes.len() < 37 {
            return Err(BlockError::Truncated("BUMP"));
        }
        let mut reader = ByteReader::new(bytes);
        let bump = Self::from_reader(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(BlockError::TrailingBytes(reader.remaining()));
        }
        Ok(bump)
    }

    /// Parse a BUMP from a BRC-74 hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, BlockError> {
        Self::from_bytes(&hex::decode(hex_str)?)
    }

    /// Parse a BUMP from its JSON form.
    pub fn from_json(json_str: &str) -> Result<Self, BlockError> {
        let mut bump: Bump = serde_json::from_str(json_str)?;
        for level in &mut bump.path {
            level.sort_by_key(|leaf| leaf.offset);
        }
        Ok(bump)
    }

    /// Parse a BUMP from a reader positioned at its first byte.
    pub fn from_reader(reader: &mut ByteReader) -> Result<Self, BlockError> {
        let block_height = reader
            .read_varint()
            .map_err(|_| BlockError::Truncated("BUMP block height"))?
            .value();

        let tree_height = reader
            .read_u8()
            .map_err(|_| BlockError::Truncated("BUMP tree height"))?;

        let mut path = Vec::with_capacity(tree_height as usize);
        for level in 0..tree_height as usize {
            let n_leaves = reader
                .read_varint()
                .map_err(|_| BlockError::Truncated("BUMP leaf count"))?
                .value();
            if n_leaves == 0 {
                return Err(BlockError::MalformedBumpLevel(level));
            }

            let mut leaves = Vec::with_capacity(n_leaves as usize);
            for _ in 0..n_leaves {
                let offset = reader
                    .read_varint()
                    .map_err(|_| BlockError::Truncated("BUMP leaf offset"))?
                    .value();
                let flags = reader
                    .read_u8()
                    .map_err(|_| BlockError::Truncated("BUMP leaf flags"))?;

                let value = if flags & 1 != 0 {
                    LeafValue::Duplicate
                } else {
                    let hash_bytes = reader
                        .read_bytes(32)
                        .map_err(|_| BlockError::Truncated("BUMP leaf hash"))?;
                    LeafValue::Hash(Hash::from_bytes(hash_bytes)?)
                };

                leaves.push(BumpLeaf {
                    offset,
                    value,
                    is_txid: flags & 2 != 0,
                });
            }

            // Sort by offset for a deterministic encoding.
            leaves.sort_by_key(|leaf| leaf.offset);
            path.push(leaves);
        }

        Ok(Bump { block_height, path })
    }

    /// Serialize to the BRC-74 binary form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        writer.write_varint(VarInt(self.block_height));
        writer.write_u8(self.path.len() as u8);

        for level in &self.path {
            writer.write_varint(VarInt::from(level.len()));
            for leaf in level {
                writer.write_varint(VarInt(leaf.offset));
                let mut flags = 0u8;
                if matches!(leaf.value, LeafValue::Duplicate) {
                    flags |= 1;
                }
                if leaf.is_txid {
                    flags |= 2;
                }
                writer.write_u8(flags);
                if let LeafValue::Hash(h) = &leaf.value {
                    writer.write_bytes(h.as_bytes());
                }
            }
        }

        writer.into_bytes()
    }

    /// Serialize to BRC-74 hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Serialize to the JSON form, omitting absent optionals.
    pub fn to_json(&self) -> Result<String, BlockError> {
        Ok(serde_json::to_string(self)?)
    }

    /// The display-hex txids this BUMP proves, in sorted-offset order.
    pub fn txids(&self) -> Vec<String> {
        let Some(level0) = self.path.first() else {
            return Vec::new();
        };
        level0
            .iter()
            .filter(|leaf| leaf.is_txid)
            .filter_map(|leaf| leaf.hash().map(|h| h.to_string()))
            .collect()
    }

    /// Find the leaf at `offset` in level `height`.
    fn leaf_at(&self, height: usize, offset: u64) -> Option<&BumpLeaf> {
        self.path[height].iter().find(|leaf| leaf.offset == offset)
    }

    /// Compute the Merkle root proven for the given txid (display hex).
    ///
    /// The txid must appear at level 0. Walks the branch up, pairing
    /// the working hash with the sibling at `(index >> height) ^ 1` on
    /// every level.
    pub fn calculate_root_given_txid(&self, txid: &str) -> Result<String, BlockError> {
        if self.path.is_empty() {
            return Err(BlockError::TxidNotInBump(txid.to_string()));
        }
        // A single-transaction block is its own root.
        if self.path.len() == 1 && self.path[0].len() == 1 {
            return Ok(txid.to_string());
        }

        let index = self.path[0]
            .iter()
            .find(|leaf| leaf.hash().map(|h| h.to_string()).as_deref() == Some(txid))
            .map(|leaf| leaf.offset)
            .ok_or_else(|| BlockError::TxidNotInBump(txid.to_string()))?;

        let mut working = bytes_from_hex_reversed(txid)?;
        for height in 0..self.path.len() {
            let sibling_offset = (index >> height) ^ 1;
            let leaf = self
                .leaf_at(height, sibling_offset)
                .ok_or(BlockError::MissingSibling(height))?;

            let mut digest = Vec::with_capacity(64);
            match &leaf.value {
                LeafValue::Duplicate => {
                    digest.extend_from_slice(&working);
                    digest.extend_from_slice(&working);
                }
                LeafValue::Hash(h) => {
                    if sibling_offset % 2 != 0 {
                        digest.extend_from_slice(&working);
                        digest.extend_from_slice(h.as_bytes());
                    } else {
                        digest.extend_from_slice(h.as_bytes());
                        digest.extend_from_slice(&working);
                    }
                }
            }
            working = sha256d(&digest).to_vec();
        }

        Ok(hex_from_bytes_reversed(&working))
    }

    /// Derive the BUMP proving the transaction at `tx_index` from a
    /// flat Merkle tree store
    /// ([`crate::merkle_tree::build_merkle_tree_store`]).
    ///
    /// Level 0 carries the target (txid flag set) and its sibling;
    /// every higher level carries exactly the one sibling the branch
    /// needs. Sentinel (`None`) tree slots become duplicate leaves.
    pub fn from_merkle_tree_and_index(
        block_height: u64,
        merkle_tree: &[Option<Hash>],
        tx_index: u64,
    ) -> Result<Self, BlockError> {
        if merkle_tree.is_empty() {
            return Err(BlockError::EmptyMerkleTree);
        }

        let leaf_width = (merkle_tree.len() + 1) / 2;
        if tx_index >= leaf_width as u64 {
            return Err(BlockError::MissingSibling(0));
        }

        // One transaction in the block: no path to derive.
        if merkle_tree.len() == 1 {
            let hash = merkle_tree[0].ok_or(BlockError::EmptyMerkleTree)?;
            return Ok(Bump {
                block_height,
                path: vec![vec![BumpLeaf {
                    offset: 0,
                    value: LeafValue::Hash(hash),
                    is_txid: true,
                }]],
            });
        }

        let tree_height = leaf_width.trailing_zeros() as usize;
        let mut path = Vec::with_capacity(tree_height);
        let mut level_offset = 0;
        let mut width = leaf_width;

        for height in 0..tree_height {
            let sibling = (tx_index >> height) ^ 1;
            let mut leaves = Vec::with_capacity(2);

            let mut push = |offset: u64, is_txid: bool| {
                let value = match merkle_tree[level_offset + offset as usize] {
                    Some(h) => LeafValue::Hash(h),
                    None => LeafValue::Duplicate,
                };
                leaves.push(BumpLeaf {
                    offset,
                    value,
                    is_txid,
                });
            };

            if height == 0 {
                push(tx_index, true);
            }
            push(sibling, false);

            leaves.sort_by_key(|leaf| leaf.offset);
            path.push(leaves);

            level_offset += width;
            width >>= 1;
        }

        Ok(Bump { block_height, path })
    }

    /// The display hex of the first proven (txid-flagged) leaf, falling
    /// back to any hashed leaf at level 0.
    fn anchor_txid(&self) -> Option<String> {
        let level0 = self.path.first()?;
        level0
            .iter()
            .find(|leaf| leaf.is_txid)
            .or_else(|| level0.iter().find(|leaf| leaf.hash().is_some()))
            .and_then(|leaf| leaf.hash().map(|h| h.to_string()))
    }

    /// Merge another BUMP over the same block into this one, returning
    /// the combined BUMP.
    ///
    /// The inputs must agree on block height, tree height, and Merkle
    /// root. Per level the result is the offset-keyed union of the leaf
    /// sets; where both sides carry a leaf, the txid flags are OR'd.
    pub fn add(&self, other: &Bump) -> Result<Bump, BlockError> {
        if self.block_height != other.block_height {
            return Err(BlockError::BumpMismatch(
                "different block heights".to_string(),
            ));
        }
        if self.path.len() != other.path.len() {
            return Err(BlockError::BumpMismatch(
                "different tree heights".to_string(),
            ));
        }

        let root_a = match self.anchor_txid() {
            Some(txid) => self.calculate_root_given_txid(&txid)?,
            None => return Err(BlockError::BumpMismatch("no leaf to anchor on".to_string())),
        };
        let root_b = match other.anchor_txid() {
            Some(txid) => other.calculate_root_given_txid(&txid)?,
            None => return Err(BlockError::BumpMismatch("no leaf to anchor on".to_string())),
        };
        if root_a != root_b {
            return Err(BlockError::BumpMismatch("different roots".to_string()));
        }

        let mut path = Vec::with_capacity(self.path.len());
        for (ours, theirs) in self.path.iter().zip(&other.path) {
            let mut merged: BTreeMap<u64, BumpLeaf> = BTreeMap::new();
            for leaf in ours {
                merged.insert(leaf.offset, *leaf);
            }
            for leaf in theirs {
                merged
                    .entry(leaf.offset)
                    .and_modify(|existing| existing.is_txid |= leaf.is_txid)
                    .or_insert(*leaf);
            }
            path.push(merged.into_values().collect());
        }

        Ok(Bump {
            block_height: self.block_height,
            path,
        })
    }
}
