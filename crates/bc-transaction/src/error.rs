/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// The transaction structure is invalid (e.g. missing source output info).
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
    /// An error occurred during binary/hex serialization or deserialization.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// An underlying script error (forwarded from `bc-script`).
    #[error("script error: {0}")]
    Script(#[from] bc_script::ScriptError),
    /// An underlying primitives error (forwarded from `bc-primitives`).
    #[error("primitives error: {0}")]
    Primitives(#[from] bc_primitives::PrimitivesError),
}
