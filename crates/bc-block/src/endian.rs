//! Endian helpers for the display/internal hash boundary.
//!
//! Bitcoin-family hashes are shown in reverse byte order on screen;
//! internal computations use the raw order. Every hex conversion at an
//! API boundary crosses that line through these helpers.

use bc_primitives::hash::sha256d;

use crate::BlockError;

/// Decode a display-order hex string into internal-order bytes.
pub fn bytes_from_hex_reversed(s: &str) -> Result<Vec<u8>, BlockError> {
    let mut bytes = hex::decode(s)?;
    bytes.reverse();
    Ok(bytes)
}

/// Encode internal-order bytes as a display-order hex string.
pub fn hex_from_bytes_reversed(b: &[u8]) -> String {
    let mut rev = b.to_vec();
    rev.reverse();
    hex::encode(rev)
}

/// Double SHA-256 of a byte slice.
pub fn sha256_sha256(digest: &[u8]) -> Vec<u8> {
    sha256d(digest).to_vec()
}
