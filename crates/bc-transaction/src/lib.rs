//! Bitcoin transaction codec.
//!
//! Provides the Transaction type with inputs, outputs, txid computation,
//! and binary/hex serialization. This is the transaction collaborator
//! consumed by the SPV verifier: parse/serialize, `tx_id`, previous
//! outpoints, and per-output satoshis and locking scripts.

pub mod transaction;
pub mod input;
pub mod output;

mod error;
pub use error::TransactionError;
pub use input::TransactionInput;
pub use output::TransactionOutput;
pub use transaction::Transaction;
