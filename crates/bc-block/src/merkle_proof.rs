//! Legacy TSC Merkle proof codec.
//!
//! A `MerkleProof` proves inclusion of a Bitcoin transaction in a
//! block. The JSON form keeps the TSC field names; the binary form is
//! the TSC byte layout. The `target` field carries a block hash, a full
//! 80-byte header, or a Merkle root depending on `target_type`.

use serde::{Deserialize, Serialize};

use bc_primitives::util::{ByteReader, ByteWriter, VarInt};

use crate::merkle_tree::merkle_tree_parent_str;
use crate::BlockError;

/// Flag bit: `txOrId` holds a full transaction rather than a txid.
const FLAG_FULL_TX: u8 = 1 << 0;
/// Flag bit: `target` holds an 80-byte block header.
const FLAG_TARGET_HEADER: u8 = 1 << 1;
/// Flag bit: `target` holds a 32-byte Merkle root.
const FLAG_TARGET_MERKLE_ROOT: u8 = 1 << 2;

/// Mask of the two target-type flag bits.
const TARGET_TYPE_FLAGS: u8 = FLAG_TARGET_HEADER | FLAG_TARGET_MERKLE_ROOT;

fn is_false(b: &bool) -> bool {
    !b
}

/// A structure that proves inclusion of a Bitcoin transaction in a
/// block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// The transaction's index at the lowest tree level.
    pub index: u64,
    /// Display-hex txid, or the full transaction hex.
    #[serde(rename = "txOrId")]
    pub tx_or_id: String,
    /// Block hash, block header, or Merkle root hex per `target_type`.
    pub target: String,
    /// Sibling hashes in display hex, `"*"` marking a duplicate of the
    /// working hash.
    pub nodes: Vec<String>,
    /// `"hash"` (or absent), `"header"`, or `"merkleRoot"`.
    #[serde(rename = "targetType", skip_serializing_if = "Option::is_none", default)]
    pub target_type: Option<String>,
    /// Only `"branch"` (or absent) is supported.
    #[serde(rename = "proofType", skip_serializing_if = "Option::is_none", default)]
    pub proof_type: Option<String>,
    /// Composite proofs are not supported.
    #[serde(skip_serializing_if = "is_false", default)]
    pub composite: bool,
}

impl MerkleProof {
    /// Serialize the proof into the TSC binary layout.
    pub fn to_bytes(&self) -> Result<Vec<u8>, BlockError> {
        let mut tx_or_id = hex::decode(&self.tx_or_id)?;
        tx_or_id.reverse();

        let mut flags = 0u8;
        if self.tx_or_id.len() > 64 {
            flags |= FLAG_FULL_TX;
        }

        let target = match self.target_type.as_deref() {
            Some("header") => {
                flags |= FLAG_TARGET_HEADER;
                hex::decode(&self.target)?
            }
            Some("merkleRoot") => {
                flags |= FLAG_TARGET_MERKLE_ROOT;
                let mut t = hex::decode(&self.target)?;
                t.reverse();
                t
            }
            // Absent or "hash": the target is a block hash.
            _ => {
                let mut t = hex::decode(&self.target)?;
                t.reverse();
                t
            }
        };

        let mut writer = ByteWriter::new();
        writer.write_u8(flags);
        writer.write_varint(VarInt(self.index));
        writer.write_varint(VarInt::from(tx_or_id.len()));
        writer.write_bytes(&tx_or_id);
        writer.write_bytes(&target);
        writer.write_varint(VarInt::from(self.nodes.len()));

        for node in &self.nodes {
            if node == "*" {
                writer.write_u8(1);
                continue;
            }
            writer.write_u8(0);
            let mut bytes = hex::decode(node)?;
            bytes.reverse();
            writer.write_bytes(&bytes);
        }

        Ok(writer.into_bytes())
    }

    /// Serialize the proof to TSC binary hex.
    pub fn to_hex(&self) -> Result<String, BlockError> {
        Ok(hex::encode(self.to_bytes()?))
    }

    /// Parse a proof from the TSC binary layout.
    pub fn from_bytes(proof: &[u8]) -> Result<Self, BlockError> {
        let mut reader = ByteReader::new(proof);

        let flags = reader
            .read_u8()
            .map_err(|_| BlockError::Truncated("proof flags"))?;
        if flags & !(FLAG_FULL_TX | TARGET_TYPE_FLAGS) != 0
            || flags & TARGET_TYPE_FLAGS == TARGET_TYPE_FLAGS
        {
            return Err(BlockError::InvalidFlags);
        }

        let index = reader
            .read_varint()
            .map_err(|_| BlockError::Truncated("proof index"))?
            .value();

        let tx_length = reader
            .read_varint()
            .map_err(|_| BlockError::Truncated("proof tx length"))?
            .value() as usize;
        if flags & FLAG_FULL_TX == 0 && tx_length != 32 {
            return Err(BlockError::InvalidTxOrId);
        }
        if flags & FLAG_FULL_TX != 0 && tx_length <= 32 {
            return Err(BlockError::InvalidTxOrId);
        }

        let mut tx_or_id = reader
            .read_bytes(tx_length)
            .map_err(|_| BlockError::Truncated("proof txOrId"))?
            .to_vec();
        tx_or_id.reverse();

        let (target, target_type) = match flags & TARGET_TYPE_FLAGS {
            0 => {
                let mut t = reader
                    .read_bytes(32)
                    .map_err(|_| BlockError::Truncated("proof target"))?
                    .to_vec();
                t.reverse();
                (t, None)
            }
            FLAG_TARGET_MERKLE_ROOT => {
                let mut t = reader
                    .read_bytes(32)
                    .map_err(|_| BlockError::Truncated("proof target"))?
                    .to_vec();
                t.reverse();
                (t, Some("merkleRoot".to_string()))
            }
            FLAG_TARGET_HEADER => {
                let t = reader
                    .read_bytes(80)
                    .map_err(|_| BlockError::Truncated("proof target"))?
                    .to_vec();
                (t, Some("header".to_string()))
            }
            _ => return Err(BlockError::InvalidFlags),
        };

        let node_count = reader
            .read_varint()
            .map_err(|_| BlockError::Truncated("proof node count"))?
            .value();

        let mut nodes = Vec::with_capacity(node_count as usize);
        for _ in 0..node_count {
            let node_type = reader
                .read_u8()
                .map_err(|_| BlockError::Truncated("proof node type"))?;
            match node_type {
                0 => {
                    let mut node = reader
                        .read_bytes(32)
                        .map_err(|_| BlockError::Truncated("proof node"))?
                        .to_vec();
                    node.reverse();
                    nodes.push(hex::encode(node));
                }
                1 => nodes.push("*".to_string()),
                _ => return Err(BlockError::InvalidNodes),
            }
        }

        if reader.remaining() != 0 {
            return Err(BlockError::TrailingBytes(reader.remaining()));
        }

        Ok(MerkleProof {
            index,
            tx_or_id: hex::encode(tx_or_id),
            target: hex::encode(target),
            nodes,
            target_type,
            proof_type: None,
            composite: false,
        })
    }

    /// Parse a proof from TSC binary hex.
    pub fn from_hex(hex_str: &str) -> Result<Self, BlockError> {
        Self::from_bytes(&hex::decode(hex_str)?)
    }
}

/// Run the branch computation over a proof's nodes.
///
/// `txid` is the display-hex starting hash and `index` its position at
/// the lowest level. Returns the computed root and whether the branch
/// stayed on the right edge of the tree (`is_last_in_tree`). A `"*"`
/// node substitutes the working hash and is only legal while the
/// working hash is a left child.
pub fn compute_proof_root(
    txid: &str,
    index: u64,
    nodes: &[String],
) -> Result<(String, bool), BlockError> {
    let mut c = txid.to_string();
    let mut idx = index;
    let mut is_last_in_tree = true;

    for node in nodes {
        let c_is_left = idx % 2 == 0;

        let p = if node == "*" {
            if !c_is_left {
                return Err(BlockError::InvalidNodes);
            }
            c.clone()
        } else {
            node.clone()
        };

        // Fails at least once unless the branch hugs the tree's right edge.
        if c_is_left && c != p {
            is_last_in_tree = false;
        }

        c = if c_is_left {
            merkle_tree_parent_str(&c, &p)?
        } else {
            merkle_tree_parent_str(&p, &c)?
        };

        idx /= 2;
    }

    Ok((c, is_last_in_tree))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROOF_TXID: &str = "ffeff11c25cde7c06d407490d81ef4d0db64aad6ab3d14393530701561a465ef";
    const PROOF_BLOCK_HASH: &str =
        "75edb0a69eb195cdd81e310553aa4d25e18450e08f168532a2c2e9cf447bf169";
    const PROOF_ROOT: &str = "96cbb75fd2ef98e4309eebc8a54d2386333d936ded2a0f3e06c23a91bb612f70";

    fn sample_proof() -> MerkleProof {
        MerkleProof {
            index: 12,
            tx_or_id: PROOF_TXID.to_string(),
            target: PROOF_BLOCK_HASH.to_string(),
            nodes: vec![
                "b9ef07a62553ef8b0898a79c291b92c60f7932260888bde0dab2dd2610d8668e".to_string(),
                "0fc1c12fb1b57b38140442927fbadb3d1e5a5039a5d6db355ea25486374f104d".to_string(),
                "60b0e75dd5b8d48f2d069229f20399e07766dd651ceeed55ee3c040aa2812547".to_string(),
                "c0d8dbda46366c2050b430a05508a3d96dc0ed55aea685bb3d9a993f8b97cc6f".to_string(),
                "391e62b3419d8a943f7dbc7bddc90e30ec724c033000dc0c8872253c27b03a42".to_string(),
            ],
            target_type: None,
            proof_type: None,
            composite: false,
        }
    }

    #[test]
    fn test_compute_proof_root() {
        let proof = sample_proof();
        let (root, is_last) = compute_proof_root(&proof.tx_or_id, proof.index, &proof.nodes).unwrap();
        assert_eq!(root, PROOF_ROOT);
        assert!(!is_last);
    }

    #[test]
    fn test_binary_round_trip() {
        let proof = sample_proof();
        let bytes = proof.to_bytes().unwrap();
        let parsed = MerkleProof::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, proof);
    }

    #[test]
    fn test_binary_round_trip_merkle_root_target() {
        let mut proof = sample_proof();
        proof.target = PROOF_ROOT.to_string();
        proof.target_type = Some("merkleRoot".to_string());
        let parsed = MerkleProof::from_bytes(&proof.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, proof);
    }

    #[test]
    fn test_binary_round_trip_header_target() {
        let mut proof = sample_proof();
        proof.target = "000000208e33a53195acad0ab42ddbdbe3e4d9ca081332e5b01a62e340dbd8167d1a787b702f61bb913ac2063e0f2aed6d933d3386234da5c8eb9e30e498efd25fb7cb96fff12c60ffff7f2001000000".to_string();
        proof.target_type = Some("header".to_string());
        let parsed = MerkleProof::from_bytes(&proof.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, proof);
    }

    #[test]
    fn test_json_round_trip() {
        let proof = sample_proof();
        let json = serde_json::to_string(&proof).unwrap();
        // Absent optionals are omitted.
        assert!(!json.contains("targetType"));
        assert!(!json.contains("proofType"));
        assert!(!json.contains("composite"));
        let parsed: MerkleProof = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, proof);
    }

    #[test]
    fn test_duplicate_star_node() {
        // Index 2: the working hash is a left child at level 0.
        let txid = PROOF_TXID;
        let sibling = "b9ef07a62553ef8b0898a79c291b92c60f7932260888bde0dab2dd2610d8668e";

        let level1 = merkle_tree_parent_str(txid, txid).unwrap();
        let expected = merkle_tree_parent_str(sibling, &level1).unwrap();

        let (root, is_last) =
            compute_proof_root(txid, 2, &["*".to_string(), sibling.to_string()]).unwrap();
        assert_eq!(root, expected);
        // The duplicate marks the last element of an odd layer.
        assert!(is_last);
    }

    #[test]
    fn test_star_node_on_right_child_rejected() {
        assert!(matches!(
            compute_proof_root(PROOF_TXID, 1, &["*".to_string()]),
            Err(BlockError::InvalidNodes)
        ));
    }

    #[test]
    fn test_invalid_flags_rejected() {
        let proof = sample_proof();
        let mut bytes = proof.to_bytes().unwrap();
        bytes[0] = 0x06; // both target-type bits set
        assert!(matches!(
            MerkleProof::from_bytes(&bytes),
            Err(BlockError::InvalidFlags)
        ));
    }

    #[test]
    fn test_truncated_rejected() {
        let bytes = sample_proof().to_bytes().unwrap();
        assert!(MerkleProof::from_bytes(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = sample_proof().to_bytes().unwrap();
        bytes.push(0);
        assert!(matches!(
            MerkleProof::from_bytes(&bytes),
            Err(BlockError::TrailingBytes(1))
        ));
    }
}
