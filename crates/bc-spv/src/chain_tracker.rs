//! Chain tracker: height-addressed Merkle root verification.

use crate::SpvError;

/// Verifies that a Merkle root is valid for a given block height.
///
/// BUMPs anchor transactions by block height, which a hash-keyed header
/// store cannot resolve; implementors of this trait close that gap.
/// Must be safe to call concurrently if the host verifies multiple
/// ancestries in parallel.
pub trait ChainTracker {
    /// Whether `root` (display hex) is the Merkle root of the block at
    /// `height` in the longest chain.
    fn is_valid_root_for_height(&self, root: &str, height: u64) -> Result<bool, SpvError>;
}
