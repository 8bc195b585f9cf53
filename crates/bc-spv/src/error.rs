/// Error types for ancestry parsing and SPV verification.
#[derive(Debug, thiserror::Error)]
pub enum SpvError {
    /// Error propagated from the block layer.
    #[error("block error: {0}")]
    Block(#[from] bc_block::BlockError),

    /// Error propagated from the transaction layer.
    #[error("transaction error: {0}")]
    Transaction(#[from] bc_transaction::TransactionError),

    /// Error propagated from the primitives layer.
    #[error("primitives error: {0}")]
    Primitives(#[from] bc_primitives::PrimitivesError),

    /// Hex decoding error.
    #[error("hex error: {0}")]
    Hex(#[from] hex::FromHexError),

    /// JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An ancestry binary with a version other than 1.
    #[error("can only handle version 1 of the ancestry binary format, got {0}")]
    UnsupportedVersion(u8),

    /// Input ended before the structure was complete.
    #[error("data truncated while reading {0}")]
    Truncated(&'static str),

    /// Unconsumed bytes after a complete structure.
    #[error("unexpected trailing {0} bytes")]
    TrailingBytes(usize),

    /// A proof or miner-callback chunk with no preceding transaction.
    #[error("chunk of type {0} arrived before any ancestor transaction")]
    OrphanChunk(u8),

    /// A chunk flag outside the known set (1=tx, 2=proof, 3=callbacks).
    #[error("invalid chunk flag: {0}")]
    InvalidFlags(u8),

    /// The same ancestor transaction appeared twice.
    #[error("duplicate ancestor: {0}")]
    DuplicateAncestor(String),

    /// A miner-callback list payload with no callbacks in it.
    #[error("there are no callback bytes")]
    EmptyCallbacks,

    /// A miner-callback list too long for its one-byte count prefix.
    #[error("too many miner callbacks: {0} (the count prefix holds at most 255)")]
    TooManyCallbacks(usize),

    /// A Merkle proof that failed verification.
    #[error("invalid merkle proof")]
    InvalidProof,

    /// A proof whose embedded transaction differs from the one it is
    /// attached to.
    #[error("input and proof ID mismatch: tx {envelope} proof {proof}")]
    TxIdMismatch {
        /// Txid of the transaction the proof was attached to.
        envelope: String,
        /// Txid the proof actually embeds.
        proof: String,
    },

    /// A tip transaction that is already confirmed.
    #[error("tip transaction must be unconfirmed")]
    TipTxConfirmed,

    /// An absent payment.
    #[error("initial payment cannot be nil")]
    NilInitialPayment,

    /// A transaction that can never be traced back to the chain.
    #[error("tx {0} has no confirmed/anchored tx")]
    NoConfirmedTransaction(String),

    /// An expected parent transaction that was not supplied.
    #[error("a tx input is missing its parent: {0}")]
    NotAllInputsSupplied(String),

    /// An unanchored ancestor referencing a parent outside the set.
    #[error("tx {0} has no proof and is missing an input's parent")]
    ProofOrInputMissing(String),

    /// A transaction with no inputs under script verification.
    #[error("tx {0} has no inputs to verify")]
    NoTxInputsToVerify(String),

    /// An input indexing an output beyond its parent's output count.
    #[error("tx input index into output is out of bounds")]
    InputRefsOutOfBoundsOutput,

    /// A script-engine rejection.
    #[error("payment was not verified")]
    PaymentNotVerified,

    /// Fee verification requested without a fee policy.
    #[error("no fee quote supplied for fee validation")]
    NoFeeQuoteSupplied,

    /// A fee check over inputs whose parent outputs are unknown.
    #[error("cannot calculate fee paid: missing parent output for tx {0}")]
    CannotCalculateFeePaid(String),

    /// A fee below the policy's requirement.
    #[error("not enough fees paid")]
    FeePaidNotEnough,

    /// Client construction without a block header chain.
    #[error("at least one block header chain implementation should be provided")]
    MissingBlockHeaderChain,

    /// A BUMP-anchored ancestry verified without a chain tracker.
    #[error("no chain tracker supplied for BUMP verification")]
    MissingChainTracker,

    /// A target/targetType pair outside the supported set.
    #[error("invalid TargetType or target field")]
    InvalidTargetType,

    /// A proof type other than `branch`.
    #[error("only merkle branch supported in this version")]
    InvalidProofType,

    /// A composite proof.
    #[error("only single proof supported in this version")]
    CompositeProof,

    /// Verification cancelled through its context.
    #[error("verification cancelled")]
    Cancelled,
}
