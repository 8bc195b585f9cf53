//! Block header chain lookup.

use crate::{BlockError, BlockHeader};

/// A block header returned by a [`BlockHeaderChain`], either already
/// parsed or as its 80-byte hex.
///
/// Verifiers prefer the typed form and degrade to parsing hex when only
/// that is available.
#[derive(Clone, Debug)]
pub enum HeaderSource {
    /// A parsed block header.
    Header(BlockHeader),
    /// The 160-character hex of an 80-byte header.
    Hex(String),
}

impl HeaderSource {
    /// Resolve to a parsed header.
    pub fn into_header(self) -> Result<BlockHeader, BlockError> {
        match self {
            HeaderSource::Header(header) => Ok(header),
            HeaderSource::Hex(hex_str) => BlockHeader::from_hex(&hex_str),
        }
    }
}

/// A generic interface used to map things in the chain of block
/// headers. Lookups are keyed by the display-hex block hash; the
/// implementation decides whether to answer with a parsed header or
/// raw header hex.
///
/// Implementations must be safe to call concurrently if the host
/// program verifies multiple ancestries in parallel.
pub trait BlockHeaderChain {
    /// Get the block header for a block hash in the longest chain.
    fn block_header(&self, block_hash: &str) -> Result<HeaderSource, BlockError>;
}
