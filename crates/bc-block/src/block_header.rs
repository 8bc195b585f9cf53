//! Block header codec and proof-of-work validation.
//!
//! An 80-byte header carries the version, previous block hash, Merkle
//! root, timestamp, compact difficulty bits, and nonce. The header hash
//! (double SHA-256 of the serialized form) must not exceed the target
//! the bits expand to.

use bc_primitives::chainhash::Hash;
use bc_primitives::hash::sha256d;

use crate::difficulty::expand_target;
use crate::BlockError;

/// Serialized length of a block header in bytes.
pub const HEADER_SIZE: usize = 80;

/// A block header in the Bitcoin blockchain.
///
/// | Field            | Purpose                                  | Size |
/// |------------------|------------------------------------------|------|
/// | version          | Block version number                     | 4    |
/// | hash_prev_block  | Hash of the previous block header        | 32   |
/// | hash_merkle_root | Merkle root over the block transactions  | 32   |
/// | time             | Block timestamp (Unix seconds)           | 4    |
/// | bits             | Current target in compact format         | 4    |
/// | nonce            | 32-bit miner nonce                       | 4    |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block version number.
    pub version: u32,
    /// Hash of the previous block header.
    pub hash_prev_block: Hash,
    /// Merkle root over all transactions in the block.
    pub hash_merkle_root: Hash,
    /// Block timestamp as seconds since the Unix epoch.
    pub time: u32,
    /// Compact difficulty target, display order (e.g. `[0x1d, 0x00, 0xff, 0xff]`).
    pub bits: [u8; 4],
    /// Miner nonce.
    pub nonce: u32,
}

impl BlockHeader {
    /// Parse a block header from an 80-byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BlockError> {
        if bytes.len() != HEADER_SIZE {
            return Err(BlockError::InvalidHeaderLength);
        }

        let mut bits = [bytes[72], bytes[73], bytes[74], bytes[75]];
        bits.reverse();

        Ok(BlockHeader {
            version: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            hash_prev_block: Hash::from_bytes(&bytes[4..36])?,
            hash_merkle_root: Hash::from_bytes(&bytes[36..68])?,
            time: u32::from_le_bytes([bytes[68], bytes[69], bytes[70], bytes[71]]),
            bits,
            nonce: u32::from_le_bytes([bytes[76], bytes[77], bytes[78], bytes[79]]),
        })
    }

    /// Parse a block header from a 160-character hex string.
    pub fn from_hex(header_str: &str) -> Result<Self, BlockError> {
        if header_str.len() != HEADER_SIZE * 2 {
            return Err(BlockError::InvalidHeaderLength);
        }
        let bytes = hex::decode(header_str)?;
        Self::from_bytes(&bytes)
    }

    /// Serialize the header to its 80-byte wire form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE);
        bytes.extend_from_slice(&self.version.to_le_bytes());
        bytes.extend_from_slice(self.hash_prev_block.as_bytes());
        bytes.extend_from_slice(self.hash_merkle_root.as_bytes());
        bytes.extend_from_slice(&self.time.to_le_bytes());
        let mut bits = self.bits;
        bits.reverse();
        bytes.extend_from_slice(&bits);
        bytes.extend_from_slice(&self.nonce.to_le_bytes());
        bytes
    }

    /// Serialize the header as a 160-character hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// The compact bits field as display-order hex (e.g. `"1d00ffff"`).
    pub fn bits_hex(&self) -> String {
        hex::encode(self.bits)
    }

    /// The block hash: double SHA-256 of the serialized header.
    ///
    /// Displayed through `Hash`, this is the conventional reversed form.
    pub fn hash(&self) -> Hash {
        Hash::new(sha256d(&self.to_bytes()))
    }

    /// Check the header's proof of work: its hash, interpreted as a
    /// 256-bit little-endian number, must not exceed the target its
    /// bits field expands to.
    pub fn valid(&self) -> bool {
        let target = match expand_target(&self.bits) {
            Ok(t) => t,
            Err(_) => return false,
        };
        let mut hash_be = sha256d(&self.to_bytes());
        hash_be.reverse();
        hash_be <= target
    }
}

impl std::fmt::Display for BlockHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Extract the Merkle root of a 160-character block header hex string,
/// in display order.
pub fn extract_merkle_root_from_header(header_str: &str) -> Result<String, BlockError> {
    let header = BlockHeader::from_hex(header_str)?;
    Ok(header.hash_merkle_root.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENESIS_HEX: &str = "0100000000000000000000000000000000000000000000000000000000000000000000003ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa4b1e5e4a29ab5f49ffff001d1dac2b7c";

    #[test]
    fn test_parse_fields() {
        let header_str = "0000002074a17794e7890e9124d87e122b7f67b9d707dcb6c5b9d542b22eff3d13054678e9d8afa92026c2c0873524b18cbf2479720a8471952770c847d9ec8e1e939dfc1f593460ffff7f2000000000";
        let header = BlockHeader::from_hex(header_str).unwrap();

        assert_eq!(header.version, 536870912);
        assert_eq!(
            header.hash_prev_block.to_string(),
            "784605133dff2eb242d5b9c5b6dc07d7b9677f2b127ed824910e89e79477a174"
        );
        assert_eq!(
            header.hash_merkle_root.to_string(),
            "fc9d931e8eecd947c870279571840a727924bf8cb1243587c0c22620a9afd8e9"
        );
        assert_eq!(header.time, 1614043423);
        assert_eq!(header.bits_hex(), "207fffff");
        assert_eq!(header.nonce, 0);
    }

    #[test]
    fn test_string_and_bytes_match() {
        let header_str = "0000002074a17794e7890e9124d87e122b7f67b9d707dcb6c5b9d542b22eff3d13054678e9d8afa92026c2c0873524b18cbf2479720a8471952770c847d9ec8e1e939dfc1f593460ffff7f2000000000";
        let header = BlockHeader::from_hex(header_str).unwrap();
        assert_eq!(hex::encode(header.to_bytes()), header.to_string());
        assert_eq!(header.to_hex(), header_str);
    }

    #[test]
    fn test_invalid_length() {
        for bad in [
            "",
            // too long
            "00000020fb9eacea87c1cc294a4f1633a45b9bfb21cf9878b439c61123221312312312396b8ca3a856e3a37307cd123724eaa4ade23d29feea1358458d5c110275b6cca4e2b79cd14d98e39573460ffff7f2000000000",
            // too short
            "00000020fb9eacea87c1c3a856e3a37307cd123724eaa4ade23d29feea1358458d5c110275b6cca4e2b79cd14d98e39573460ffff7f2000000000",
        ] {
            assert!(matches!(
                BlockHeader::from_hex(bad),
                Err(BlockError::InvalidHeaderLength)
            ));
        }
        assert!(BlockHeader::from_bytes(&[0u8; 79]).is_err());
    }

    #[test]
    fn test_extract_merkle_root() {
        let header = "000000208e33a53195acad0ab42ddbdbe3e4d9ca081332e5b01a62e340dbd8167d1a787b702f61bb913ac2063e0f2aed6d933d3386234da5c8eb9e30e498efd25fb7cb96fff12c60ffff7f2001000000";
        assert_eq!(
            extract_merkle_root_from_header(header).unwrap(),
            "96cbb75fd2ef98e4309eebc8a54d2386333d936ded2a0f3e06c23a91bb612f70"
        );
    }

    #[test]
    fn test_genesis_round_trip() {
        let genesis = BlockHeader::from_hex(GENESIS_HEX).unwrap();
        assert_eq!(genesis.to_hex(), GENESIS_HEX);
        assert_eq!(
            genesis.hash().to_string(),
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
        );
    }

    #[test]
    fn test_verify_proof_of_work() {
        let mut bytes = hex::decode(GENESIS_HEX).unwrap();
        let genesis = BlockHeader::from_bytes(&bytes).unwrap();
        assert!(genesis.valid());

        // Flip one byte and the proof of work no longer holds.
        bytes[0] = 222;
        let tampered = BlockHeader::from_bytes(&bytes).unwrap();
        assert!(!tampered.valid());
    }
}
