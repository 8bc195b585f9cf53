#![deny(missing_docs)]

//! Bitcoin chain SDK.
//!
//! Re-exports all bc workspace components for convenient single-crate
//! usage.

pub use bc_primitives as primitives;
pub use bc_script as script;
pub use bc_transaction as transaction;
pub use bc_block as block;
pub use bc_spv as spv;
