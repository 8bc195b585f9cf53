/// Error types for block, header, and Merkle structure operations.
#[derive(Debug, thiserror::Error)]
pub enum BlockError {
    /// Hex decoding error.
    #[error("hex error: {0}")]
    Hex(#[from] hex::FromHexError),

    /// Error propagated from the primitives layer.
    #[error("primitives error: {0}")]
    Primitives(#[from] bc_primitives::PrimitivesError),

    /// Error propagated from the transaction layer.
    #[error("transaction error: {0}")]
    Transaction(#[from] bc_transaction::TransactionError),

    /// A block header that is not exactly 80 bytes.
    #[error("block header should be 80 bytes long")]
    InvalidHeaderLength,

    /// Compact difficulty bits that cannot be expanded.
    #[error("invalid compact bits: {0}")]
    InvalidBits(String),

    /// Input ended before the structure was complete.
    #[error("data truncated while reading {0}")]
    Truncated(&'static str),

    /// Unconsumed bytes after a complete structure.
    #[error("unexpected trailing {0} bytes")]
    TrailingBytes(usize),

    /// A BUMP level with no leaves.
    #[error("there are no leaves at height {0} which makes this invalid")]
    MalformedBumpLevel(usize),

    /// A txid that is not present at level 0 of the BUMP.
    #[error("the BUMP does not contain the txid: {0}")]
    TxidNotInBump(String),

    /// A sibling required for root computation is absent.
    #[error("no hash for the required offset at height {0}")]
    MissingSibling(usize),

    /// Two BUMPs that cannot be merged.
    #[error("cannot merge BUMPs: {0}")]
    BumpMismatch(String),

    /// A flags byte carrying an unknown target-type combination.
    #[error("invalid flags")]
    InvalidFlags,

    /// A duplicate (`"*"`) node in a right-child position.
    #[error("invalid nodes")]
    InvalidNodes,

    /// A txOrId field that holds neither a txid nor a full transaction.
    #[error("invalid txOrId length - must be at least 64 chars (32 bytes)")]
    InvalidTxOrId,

    /// A Merkle tree built over no transactions.
    #[error("merkle tree is empty")]
    EmptyMerkleTree,

    /// JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
