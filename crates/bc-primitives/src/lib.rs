//! Bitcoin chain primitives.
//!
//! Foundational building blocks shared by the block and SPV crates:
//! - Hash functions (SHA-256, double SHA-256)
//! - Chain hash type for transaction and block identification
//! - Variable-length integer encoding and binary cursor utilities

pub mod hash;
pub mod chainhash;
pub mod util;

mod error;
pub use error::PrimitivesError;
