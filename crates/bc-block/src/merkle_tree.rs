//! Merkle tree construction.
//!
//! Builds the flat, level-by-level node store over a block's
//! transaction ids with the duplicate-last-node rule: when a level has
//! odd width, the last node is hashed with itself to form the parent.

use bc_primitives::chainhash::Hash;
use bc_primitives::hash::sha256d;

use crate::BlockError;

/// Compute the Merkle tree parent of two children given as `Hash`
/// values in internal byte order. The hashes are concatenated directly
/// and double-SHA-256'd.
pub fn merkle_tree_parent(left: &Hash, right: &Hash) -> Hash {
    let mut concatenated = [0u8; 64];
    concatenated[..32].copy_from_slice(left.as_bytes());
    concatenated[32..].copy_from_slice(right.as_bytes());
    Hash::new(sha256d(&concatenated))
}

/// Compute the Merkle tree parent of two children given as byte slices
/// in display order. The slices are reversed, concatenated,
/// double-SHA-256'd, and the digest reversed back.
pub fn merkle_tree_parent_bytes(left: &[u8], right: &[u8]) -> Vec<u8> {
    let mut concatenated = Vec::with_capacity(left.len() + right.len());
    concatenated.extend(left.iter().rev());
    concatenated.extend(right.iter().rev());
    let mut result = sha256d(&concatenated).to_vec();
    result.reverse();
    result
}

/// Compute the Merkle tree parent of two children given as display-order
/// hex strings.
pub fn merkle_tree_parent_str(left: &str, right: &str) -> Result<String, BlockError> {
    let l = hex::decode(left)?;
    let r = hex::decode(right)?;
    Ok(hex::encode(merkle_tree_parent_bytes(&l, &r)))
}

/// Build the flat Merkle node store over a block's transaction ids.
///
/// The leaf level is padded to the next power of two with `None`
/// sentinels, and each higher level is half the width of the one below,
/// so the store holds `2 * leaf_width - 1` slots with the root last.
/// A `None` right sibling means "duplicate the left sibling"; a `None`
/// left child propagates `None` upward.
pub fn build_merkle_tree_store(txids: &[Hash]) -> Result<Vec<Option<Hash>>, BlockError> {
    if txids.is_empty() {
        return Err(BlockError::EmptyMerkleTree);
    }

    let leaf_width = txids.len().next_power_of_two();
    let mut store: Vec<Option<Hash>> = Vec::with_capacity(2 * leaf_width - 1);
    store.extend(txids.iter().copied().map(Some));
    store.resize(leaf_width, None);

    let mut child = 0;
    while store.len() < 2 * leaf_width - 1 {
        let parent = match (store[child], store[child + 1]) {
            (None, _) => None,
            (Some(left), None) => Some(merkle_tree_parent(&left, &left)),
            (Some(left), Some(right)) => Some(merkle_tree_parent(&left, &right)),
        };
        store.push(parent);
        child += 2;
    }

    Ok(store)
}

/// The Merkle root of a store built by [`build_merkle_tree_store`].
pub fn merkle_root_from_store(store: &[Option<Hash>]) -> Result<Hash, BlockError> {
    store
        .last()
        .copied()
        .flatten()
        .ok_or(BlockError::EmptyMerkleTree)
}

/// Convenience: the Merkle root over a sequence of transaction ids.
pub fn merkle_root(txids: &[Hash]) -> Result<Hash, BlockError> {
    merkle_root_from_store(&build_merkle_tree_store(txids)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hashes(txids: &[&str]) -> Vec<Hash> {
        txids.iter().map(|s| Hash::from_hex(s).unwrap()).collect()
    }

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

    #[test]
    fn test_merkle_tree_parent_str() {
        let left = "d6c79a6ef05572f0cb8e9a450c561fc40b0a8a7d48faad95e20d93ddeb08c231";
        let right = "b1ed931b79056438b990d8981ba46fae97e5574b142445a74a44b978af284f98";
        let expected = "b0d537b3ee52e472507f453df3d69561720346118a5a8c4d85ca0de73bc792be";
        assert_eq!(merkle_tree_parent_str(left, right).unwrap(), expected);
    }

    #[test]
    fn test_merkle_tree_parent_forms_agree() {
        let left = "d6c79a6ef05572f0cb8e9a450c561fc40b0a8a7d48faad95e20d93ddeb08c231";
        let right = "b1ed931b79056438b990d8981ba46fae97e5574b142445a74a44b978af284f98";

        let bytes = merkle_tree_parent_bytes(&hex::decode(left).unwrap(), &hex::decode(right).unwrap());
        assert_eq!(hex::encode(&bytes), merkle_tree_parent_str(left, right).unwrap());

        let typed = merkle_tree_parent(&Hash::from_hex(left).unwrap(), &Hash::from_hex(right).unwrap());
        assert_eq!(typed.to_string(), merkle_tree_parent_str(left, right).unwrap());
    }

    #[test]
    fn test_build_store_eight_txids() {
        let store = build_merkle_tree_store(&hashes(&BLOCK_TXIDS)).unwrap();
        assert_eq!(store.len(), 15);
        assert!(store.iter().all(|n| n.is_some()));
        assert_eq!(merkle_root_from_store(&store).unwrap().to_string(), BLOCK_ROOT);
    }

    #[test]
    fn test_build_store_single_txid() {
        let txid = Hash::from_hex(BLOCK_TXIDS[0]).unwrap();
        let store = build_merkle_tree_store(&[txid]).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(merkle_root_from_store(&store).unwrap(), txid);
    }

    #[test]
    fn test_build_store_odd_width() {
        // Five transactions pad to eight leaves; the sixth slot onward
        // is the duplicate sentinel.
        let txids = hashes(&BLOCK_TXIDS[..5]);
        let store = build_merkle_tree_store(&txids).unwrap();
        assert_eq!(store.len(), 15);
        assert!(store[5].is_none());
        assert!(store[6].is_none());
        assert!(store[7].is_none());

        // Level 1: parent of the lone fifth leaf duplicates it, the
        // all-sentinel pair stays a sentinel.
        let dup = merkle_tree_parent(&txids[4], &txids[4]);
        assert_eq!(store[10], Some(dup));
        assert!(store[11].is_none());

        let root = merkle_root_from_store(&store).unwrap();
        let l1_0 = merkle_tree_parent(&txids[0], &txids[1]);
        let l1_1 = merkle_tree_parent(&txids[2], &txids[3]);
        let l2_0 = merkle_tree_parent(&l1_0, &l1_1);
        let l2_1 = merkle_tree_parent(&dup, &dup);
        assert_eq!(root, merkle_tree_parent(&l2_0, &l2_1));
    }

    #[test]
    fn test_empty_store_rejected() {
        assert!(matches!(
            build_merkle_tree_store(&[]),
            Err(BlockError::EmptyMerkleTree)
        ));
    }
}
