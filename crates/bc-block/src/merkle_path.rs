//! Single-branch Merkle path codec (BRC-58 data model, BRC-71 binary).
//!
//! A Merkle path proves one transaction's inclusion under a Merkle root
//! by listing the sibling hash at each tree level. The transaction's
//! index at the leaf level doubles as a bitmap: bit `h` gives the side
//! the working hash sits on at height `h`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use bc_primitives::chainhash::Hash;
use bc_primitives::hash::sha256d;
use bc_primitives::util::{ByteReader, ByteWriter, VarInt};

use crate::endian::{bytes_from_hex_reversed, hex_from_bytes_reversed};
use crate::merkle_tree::merkle_tree_parent_str;
use crate::BlockError;

/// One node of a Merkle path: a sibling hash, or the duplicate marker
/// meaning "hash the working value with itself".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathNode {
    /// A real sibling hash.
    Hash(Hash),
    /// The last node of an odd-width level; the sibling is the working
    /// hash itself.
    Duplicate,
}

impl Serialize for PathNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PathNode::Hash(h) => serializer.serialize_str(&h.to_string()),
            PathNode::Duplicate => serializer.serialize_str("*"),
        }
    }
}

impl<'de> Deserialize<'de> for PathNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s == "*" {
            return Ok(PathNode::Duplicate);
        }
        Hash::from_hex(&s)
            .map(PathNode::Hash)
            .map_err(serde::de::Error::custom)
    }
}

/// A single-branch Merkle path: the transaction's position at the leaf
/// level and the sibling node for every level up to the root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerklePath {
    /// The transaction's index at the lowest tree level.
    pub index: u64,
    /// Sibling nodes, leaf level first.
    #[serde(rename = "path")]
    pub nodes: Vec<PathNode>,
}

impl MerklePath {
    /// Create a Merkle path from its parts.
    pub fn new(index: u64, nodes: Vec<PathNode>) -> Self {
        MerklePath { index, nodes }
    }

    /// Serialize to the BRC-71 binary layout:
    /// `VarInt(index) || VarInt(n_leaves) || leaf * n_leaves`, each leaf
    /// 32 bytes in internal order. A duplicate node is carried as the
    /// 32-byte zero sentinel.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(2 + 32 * self.nodes.len());
        writer.write_varint(VarInt(self.index));
        writer.write_varint(VarInt::from(self.nodes.len()));
        for node in &self.nodes {
            match node {
                PathNode::Hash(h) => writer.write_bytes(h.as_bytes()),
                PathNode::Duplicate => writer.write_bytes(&[0u8; 32]),
            }
        }
        writer.into_bytes()
    }

    /// Serialize to BRC-71 hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Parse a BRC-71 binary Merkle path.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BlockError> {
        let mut reader = ByteReader::new(bytes);
        let index = reader
            .read_varint()
            .map_err(|_| BlockError::Truncated("merkle path index"))?;
        let n_leaves = reader
            .read_varint()
            .map_err(|_| BlockError::Truncated("merkle path leaf count"))?;

        let mut nodes = Vec::with_capacity(n_leaves.value() as usize);
        for _ in 0..n_leaves.value() {
            let leaf = reader
                .read_bytes(32)
                .map_err(|_| BlockError::Truncated("merkle path leaf"))?;
            if leaf.iter().all(|&b| b == 0) {
                nodes.push(PathNode::Duplicate);
            } else {
                nodes.push(PathNode::Hash(Hash::from_bytes(leaf)?));
            }
        }

        Ok(MerklePath {
            index: index.value(),
            nodes,
        })
    }

    /// Parse a BRC-71 hex Merkle path.
    pub fn from_hex(hex_str: &str) -> Result<Self, BlockError> {
        Self::from_bytes(&hex::decode(hex_str)?)
    }

    /// Compute the Merkle root this path proves for the given txid
    /// (display-order hex). Walks leaf to root, concatenating the
    /// working hash with each sibling on the side the index bitmap
    /// dictates.
    pub fn calculate_root(&self, txid: &str) -> Result<String, BlockError> {
        let mut working = bytes_from_hex_reversed(txid)?;
        let mut lsb = self.index;

        for node in &self.nodes {
            let is_left = lsb & 1 == 0;
            let sibling = match node {
                PathNode::Hash(h) => h.as_bytes().to_vec(),
                PathNode::Duplicate => {
                    if !is_left {
                        return Err(BlockError::InvalidNodes);
                    }
                    working.clone()
                }
            };

            let mut digest = Vec::with_capacity(64);
            if is_left {
                digest.extend_from_slice(&working);
                digest.extend_from_slice(&sibling);
            } else {
                digest.extend_from_slice(&sibling);
                digest.extend_from_slice(&working);
            }
            working = sha256d(&digest).to_vec();
            lsb >>= 1;
        }

        Ok(hex_from_bytes_reversed(&working))
    }
}

/// Extract the Merkle path for the transaction at `tx_index` from a
/// flat tree store built by
/// [`crate::merkle_tree::build_merkle_tree_store`].
pub fn merkle_path_for_index(
    store: &[Option<Hash>],
    tx_index: u64,
) -> Result<MerklePath, BlockError> {
    if store.is_empty() {
        return Err(BlockError::EmptyMerkleTree);
    }
    let mut width = (store.len() + 1) / 2;
    if tx_index >= width as u64 {
        return Err(BlockError::MissingSibling(0));
    }

    let mut nodes = Vec::new();
    let mut level_offset = 0;
    let mut idx = tx_index as usize;
    while width > 1 {
        let node = match store[level_offset + (idx ^ 1)] {
            Some(h) => PathNode::Hash(h),
            None => PathNode::Duplicate,
        };
        nodes.push(node);
        level_offset += width;
        width >>= 1;
        idx >>= 1;
    }

    Ok(MerklePath::new(tx_index, nodes))
}

/// Compute a Merkle root from a txid and its branch hashes in display
/// order, `"*"` marking a duplicate of the working hash.
pub fn merkle_root_from_branches(
    txid: &str,
    index: u64,
    branches: &[String],
) -> Result<String, BlockError> {
    let mut c = txid.to_string();
    let mut idx = index;

    for branch in branches {
        let c_is_left = idx % 2 == 0;

        let p = if branch == "*" {
            if !c_is_left {
                return Err(BlockError::InvalidNodes);
            }
            c.clone()
        } else {
            branch.clone()
        };

        c = if c_is_left {
            merkle_tree_parent_str(&c, &p)?
        } else {
            merkle_tree_parent_str(&p, &c)?
        };

        idx /= 2;
    }

    Ok(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle_tree::{build_merkle_tree_store, merkle_root_from_store};

    const BRC71_HEX: &str = "88040c82025f47b31054e9ad52109ef25b00fd9aaae7153564619bab031d4112f56c3b6ea708d7b84a078179b53cf2cb2f0636162ffd60a96f81815564bbc6c073cdefac0f077fca2a10730400da62ebaebaba852bd5fc3fb7770e090a1919d9c8b41e81e396da7f63e3989a8bc9bdbefddf95c75da1eb3936944b6a55cf82d87034";

    const BRC71_PATH: [&str; 4] = [
        "6cf512411d03ab9b61643515e7aa9afd005bf29e1052ade95410b3475f02820c",
        "cd73c0c6bb645581816fa960fd2f1636062fcbf23cb57981074ab8d708a76e3b",
        "b4c8d919190a090e77b73ffcd52b85babaaeeb62da000473102aca7f070facef",
        "3470d882cf556a4b943639eba15dc795dffdbebdc98b9a98e3637fda96e3811e",
    ];

    const BLOCK_TXIDS: [&str; 8] = [
        "b6d4d13aa08bb4b6cdb3b329cef29b5a5d55d85a85c330d56fddbce78d99c7d6",
        "426f65f6a6ce79c909e54d8959c874a767db3076e76031be70942b896cc64052",
        "adc23d36cc457d5847968c2e4d5f017a6f12a2f165102d10d2843f5276cfe68e",
        "728714bbbddd81a54cae473835ae99eb92ed78191327eb11a9d7494273dcad2a",
        "e3aa0230aa81abd483023886ad12790acf070e2a9f92d7f0ae3bebd90a904361",
        "4848b9e94dd0e4f3173ebd6982ae7eb6b793de305d8450624b1d86c02a5c61d9",
        "912f77eefdd311e24f96850ed8e701381fc4943327f9cf73f9c4dec0d93a056d",
        "397fe2ae4d1d24efcc868a02daae42d1b419289d9a1ded3a5fe771efcc1219d9",
    ];

    const BLOCK_ROOT: &str = "1a1e779cd7dfc59f603b4e88842121001af822b2dc5d3b167ae66152e586a6b0";

    fn hashes(txids: &[&str]) -> Vec<Hash> {
        txids.iter().map(|s| Hash::from_hex(s).unwrap()).collect()
    }

    #[test]
    fn test_building_merkle_path_binary() {
        let path = MerklePath::new(
            136,
            BRC71_PATH
                .iter()
                .map(|s| PathNode::Hash(Hash::from_hex(s).unwrap()))
                .collect(),
        );
        assert_eq!(path.to_hex(), BRC71_HEX);
    }

    #[test]
    fn test_decoding_merkle_path_binary() {
        let path = MerklePath::from_hex(BRC71_HEX).unwrap();
        assert_eq!(path.index, 136);
        assert_eq!(path.nodes.len(), 4);
        for (node, expected) in path.nodes.iter().zip(BRC71_PATH) {
            assert_eq!(*node, PathNode::Hash(Hash::from_hex(expected).unwrap()));
        }
    }

    #[test]
    fn test_json_round_trip() {
        let path = MerklePath::from_hex(BRC71_HEX).unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert!(json.starts_with(r#"{"index":136,"path":["#));
        let decoded: MerklePath = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, path);
    }

    #[test]
    fn test_get_merkle_path() {
        let store = build_merkle_tree_store(&hashes(&BLOCK_TXIDS)).unwrap();

        // Branch for tx index 4, root via the free function.
        let path = merkle_path_for_index(&store, 4).unwrap();
        let branches: Vec<String> = path
            .nodes
            .iter()
            .map(|n| match n {
                PathNode::Hash(h) => h.to_string(),
                PathNode::Duplicate => "*".to_string(),
            })
            .collect();
        let root = merkle_root_from_branches(BLOCK_TXIDS[4], path.index, &branches).unwrap();
        assert_eq!(root, BLOCK_ROOT);

        // Branch for tx index 3, root via the path itself.
        let path = merkle_path_for_index(&store, 3).unwrap();
        assert_eq!(path.calculate_root(BLOCK_TXIDS[3]).unwrap(), BLOCK_ROOT);
    }

    #[test]
    fn test_path_with_duplicates() {
        // Five transactions: index 4 has no sibling at any level.
        let txids = hashes(&BLOCK_TXIDS[..5]);
        let store = build_merkle_tree_store(&txids).unwrap();
        let expected_root = merkle_root_from_store(&store).unwrap().to_string();

        let path = merkle_path_for_index(&store, 4).unwrap();
        assert_eq!(path.nodes[0], PathNode::Duplicate);
        assert_eq!(path.nodes[1], PathNode::Duplicate);
        assert!(matches!(path.nodes[2], PathNode::Hash(_)));
        assert_eq!(path.calculate_root(BLOCK_TXIDS[4]).unwrap(), expected_root);

        // Binary round trip keeps the duplicate sentinel.
        let decoded = MerklePath::from_bytes(&path.to_bytes()).unwrap();
        assert_eq!(decoded, path);
        assert_eq!(decoded.calculate_root(BLOCK_TXIDS[4]).unwrap(), expected_root);
    }

    #[test]
    fn test_duplicate_on_right_rejected() {
        let path = MerklePath::new(1, vec![PathNode::Duplicate]);
        assert!(matches!(
            path.calculate_root(BLOCK_TXIDS[0]),
            Err(BlockError::InvalidNodes)
        ));
    }

    #[test]
    fn test_out_of_range_index() {
        let store = build_merkle_tree_store(&hashes(&BLOCK_TXIDS)).unwrap();
        assert!(merkle_path_for_index(&store, 8).is_err());
    }

    #[test]
    fn test_truncated_binary() {
        let bytes = hex::decode(BRC71_HEX).unwrap();
        assert!(MerklePath::from_bytes(&bytes[..bytes.len() - 1]).is_err());
    }
}
