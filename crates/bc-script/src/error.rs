/// Error types for script operations.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Invalid hex string supplied for a script.
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}
