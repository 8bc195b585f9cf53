#![deny(missing_docs)]

//! Simple Payment Verification.
//!
//! Provides the ancestry codec (a payment transaction bundled with its
//! ancestor graph, anchor proofs, and miner callbacks), Merkle proof
//! verification against a block header chain, and the payment verifier
//! that proves a payment is fully backed by on-chain anchors.

/// Error types for SPV operations.
mod error;
/// Cancellation context threaded through verification calls.
pub mod context;
/// Miner callback envelope codec.
pub mod miner_callback;
/// Chain tracker trait for height-addressed root verification.
pub mod chain_tracker;
/// Ancestry binary codec.
pub mod ancestry;
/// Ancestry JSON codec.
pub mod ancestry_json;
/// Merkle proof verification.
pub mod verify;
/// Ancestry verification and options.
pub mod verify_payment;
/// SPV client facade.
pub mod client;

pub use ancestry::{Ancestor, AncestorProof, Ancestry, ANCESTRY_VERSION};
pub use ancestry_json::{AncestryJson, AncestryJsonEntry, JsonProof};
pub use chain_tracker::ChainTracker;
pub use client::{SpvClient, SpvClientBuilder};
pub use context::Context;
pub use error::SpvError;
pub use miner_callback::MinerCallback;
pub use verify_payment::{FeePolicy, FeeQuote, ScriptEngine, ScriptParams, VerifyOptions};
