//! Miner callback envelope.
//!
//! A miner callback is the JSON receipt a miner API returns when it
//! mines (or double-spend flags) a transaction it was asked to watch.
//! The library treats it as an opaque envelope: fields round-trip, no
//! validation beyond well-formed JSON.

use serde::{Deserialize, Serialize};

use crate::SpvError;

/// A callback envelope from a miner API.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinerCallback {
    /// The callback payload, carried verbatim.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub callback_payload: Option<serde_json::Value>,
    /// Miner API version.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub api_version: Option<String>,
    /// Timestamp of the callback.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timestamp: Option<String>,
    /// Identity key of the miner.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub miner_id: Option<String>,
    /// Hash of the block the callback refers to.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub block_hash: Option<String>,
    /// Height of the block the callback refers to.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub block_height: Option<u64>,
    /// Txid the callback was registered for.
    #[serde(rename = "callbackTxId", skip_serializing_if = "Option::is_none", default)]
    pub callback_txid: Option<String>,
    /// Reason the callback fired (e.g. `merkleProof`).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub callback_reason: Option<String>,
}

impl MinerCallback {
    /// Serialize the callback to its JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SpvError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse a callback from JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SpvError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
