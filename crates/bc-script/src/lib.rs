//! Bitcoin script type.
//!
//! Provides the `Script` byte-vector newtype carried by transaction
//! inputs (unlocking scripts) and outputs (locking scripts). Script
//! execution semantics live behind the `ScriptEngine` collaborator in
//! the SPV crate; this crate only models the bytes on the wire.

pub mod script;

mod error;
pub use error::ScriptError;
pub use script::Script;
