//! Merkle proof verification against a block header chain.

use bc_block::block_header::extract_merkle_root_from_header;
use bc_block::merkle_proof::compute_proof_root;
use bc_block::{BlockError, MerkleProof};
use bc_transaction::Transaction;

use crate::client::SpvClient;
use crate::context::Context;
use crate::SpvError;

/// Derive the display-hex txid from a `txOrId` field: a 64-char value
/// is already a txid; anything longer must parse as a full transaction.
pub(crate) fn txid_from_tx_or_id(tx_or_id: &str) -> Result<String, SpvError> {
    if tx_or_id.len() == 64 {
        return Ok(tx_or_id.to_string());
    }
    if tx_or_id.len() > 64 {
        let tx = Transaction::from_hex(tx_or_id)?;
        return Ok(tx.tx_id_hex());
    }
    Err(BlockError::InvalidTxOrId.into())
}

impl<'a> SpvClient<'a> {
    /// Resolve the Merkle root a proof's target points at, consulting
    /// the block header chain when the target is a block hash.
    fn merkle_root_from_target(
        &self,
        ctx: &Context,
        target: &str,
        target_type: Option<&str>,
    ) -> Result<String, SpvError> {
        match target_type {
            // Absent or "hash": the target is a block hash; the header
            // store maps it to a header whose root we extract.
            None | Some("hash") => {
                if target.len() != 64 {
                    return Err(SpvError::InvalidTargetType);
                }
                ctx.ensure_active()?;
                let header = self.block_header_chain().block_header(target)?.into_header()?;
                Ok(header.hash_merkle_root.to_string())
            }
            Some("header") if target.len() == 160 => {
                Ok(extract_merkle_root_from_header(target)?)
            }
            Some("merkleRoot") if target.len() == 64 => Ok(target.to_string()),
            _ => Err(SpvError::InvalidTargetType),
        }
    }

    /// Verify a Merkle proof in standard JSON form.
    ///
    /// Returns `(valid, is_last_in_tree)`.
    pub fn verify_merkle_proof_json(
        &self,
        ctx: &Context,
        proof: &MerkleProof,
    ) -> Result<(bool, bool), SpvError> {
        let txid = txid_from_tx_or_id(&proof.tx_or_id)?;

        let merkle_root =
            self.merkle_root_from_target(ctx, &proof.target, proof.target_type.as_deref())?;

        if let Some(proof_type) = proof.proof_type.as_deref() {
            if proof_type != "branch" {
                return Err(SpvError::InvalidProofType);
            }
        }
        if proof.composite {
            return Err(SpvError::CompositeProof);
        }

        let (root, is_last_in_tree) = compute_proof_root(&txid, proof.index, &proof.nodes)?;
        Ok((root == merkle_root, is_last_in_tree))
    }

    /// Verify a Merkle proof in TSC binary form.
    ///
    /// Returns `(valid, is_last_in_tree)`.
    pub fn verify_merkle_proof(
        &self,
        ctx: &Context,
        proof: &[u8],
    ) -> Result<(bool, bool), SpvError> {
        let parsed = MerkleProof::from_bytes(proof)?;
        self.verify_merkle_proof_json(ctx, &parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_txid_from_txid() {
        let txid = "3ecead27a44d013ad1aae40038acbb1883ac9242406808bb4667c15b4f164eac";
        assert_eq!(txid_from_tx_or_id(txid).unwrap(), txid);
    }

    #[test]
    fn test_txid_from_full_tx() {
        let raw = "0100000001cd4e4cac3c7b56920d1e7655e7e260d31f29d9a388d04910f1bbd72304a79029010000006b483045022100e75279a205a547c445719420aa3138bf14743e3f42618e5f86a19bde14bb95f7022064777d34776b05d816daf1699493fcdf2ef5a5ab1ad710d9c97bfb5b8f7cef3641210263e2dee22b1ddc5e11f6fab8bcd2378bdd19580d640501ea956ec0e786f93e76ffffffff013e660000000000001976a9146bfd5c7fbe21529d45803dbcf0c87dd3c71efbc288ac00000000";
        assert_eq!(
            txid_from_tx_or_id(raw).unwrap(),
            "3ecead27a44d013ad1aae40038acbb1883ac9242406808bb4667c15b4f164eac"
        );
    }

    #[test]
    fn test_txid_too_short() {
        assert!(txid_from_tx_or_id("abcd").is_err());
    }
}
