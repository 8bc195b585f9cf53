//! Ancestry JSON form.
//!
//! A leaves-first array of `{rawtx, proof?, mapiResponses?}` entries,
//! payment transaction last. Converts to and from the binary ancestry
//! form, round-trip-preserving modulo canonicalization of optional
//! fields.

use serde::{Deserialize, Serialize};

use bc_block::{Bump, MerkleProof};

use crate::ancestry::{Ancestor, AncestorProof, Ancestry};
use crate::miner_callback::MinerCallback;
use crate::SpvError;

/// A proof in JSON form; both supported formats are accepted.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonProof {
    /// A TSC Merkle proof object.
    MerkleProof(MerkleProof),
    /// A BRC-74 BUMP object.
    Bump(Bump),
}

impl JsonProof {
    fn to_proof_bytes(&self) -> Result<Vec<u8>, SpvError> {
        match self {
            JsonProof::MerkleProof(proof) => Ok(proof.to_bytes().map_err(SpvError::Block)?),
            JsonProof::Bump(bump) => Ok(bump.to_bytes()),
        }
    }

    fn from_proof_bytes(bytes: &[u8]) -> Result<Self, SpvError> {
        Ok(match AncestorProof::from_bytes(bytes)? {
            AncestorProof::MerkleProof(proof) => JsonProof::MerkleProof(proof),
            AncestorProof::Bump(bump) => JsonProof::Bump(bump),
        })
    }
}

/// One transaction of an ancestry in JSON form.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AncestryJsonEntry {
    /// The raw transaction hex.
    pub rawtx: String,
    /// Anchor proof, when the transaction is mined.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub proof: Option<JsonProof>,
    /// Miner callbacks for the transaction.
    #[serde(rename = "mapiResponses", skip_serializing_if = "Option::is_none", default)]
    pub mapi_responses: Option<Vec<MinerCallback>>,
}

/// The JSON form of an ancestry: entries ordered leaves-first, the
/// payment transaction last.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AncestryJson(
    /// The entries, leaves first, payment last.
    pub Vec<AncestryJsonEntry>,
);

impl AncestryJson {
    /// Build the JSON form from a parsed ancestry.
    pub fn from_ancestry(ancestry: &Ancestry) -> Result<Self, SpvError> {
        let mut entries = Vec::with_capacity(ancestry.len() + 1);

        for ancestor in ancestry.ancestors() {
            let proof = match &ancestor.proof {
                Some(bytes) => Some(JsonProof::from_proof_bytes(bytes)?),
                None => None,
            };
            entries.push(AncestryJsonEntry {
                rawtx: ancestor.tx.to_hex(),
                proof,
                mapi_responses: if ancestor.miner_callbacks.is_empty() {
                    None
                } else {
                    Some(ancestor.miner_callbacks.clone())
                },
            });
        }

        entries.push(AncestryJsonEntry {
            rawtx: ancestry.payment_tx.to_hex(),
            proof: None,
            mapi_responses: None,
        });

        Ok(AncestryJson(entries))
    }

    /// Rebuild the binary-form ancestry. The last entry is the payment;
    /// a payment entry carrying a proof is kept in the ancestor set so
    /// the verifier can reject it as a confirmed tip.
    pub fn to_ancestry(&self) -> Result<Ancestry, SpvError> {
        let (payment_entry, ancestor_entries) = match self.0.split_last() {
            Some(split) => split,
            None => return Err(SpvError::NilInitialPayment),
        };

        let payment_tx = bc_transaction::Transaction::from_hex(&payment_entry.rawtx)?;
        let mut ancestry = Ancestry::new(payment_tx);

        let payment_is_annotated =
            payment_entry.proof.is_some() || payment_entry.mapi_responses.is_some();
        let entries = ancestor_entries
            .iter()
            .chain(payment_is_annotated.then_some(payment_entry));

        for entry in entries {
            let mut ancestor =
                Ancestor::new(bc_transaction::Transaction::from_hex(&entry.rawtx)?);
            if let Some(proof) = &entry.proof {
                ancestor.proof = Some(proof.to_proof_bytes()?);
            }
            if let Some(callbacks) = &entry.mapi_responses {
                ancestor.miner_callbacks = callbacks.clone();
            }
            ancestry.insert(ancestor)?;
        }

        Ok(ancestry)
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, SpvError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self, SpvError> {
        Ok(serde_json::from_str(json_str)?)
    }

    /// Serialize through to the binary ancestry form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SpvError> {
        self.to_ancestry()?.to_bytes()
    }

    /// Parse from the binary ancestry form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SpvError> {
        Self::from_ancestry(&Ancestry::from_bytes(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bc_block::merkle_tree::build_merkle_tree_store;
    use bc_transaction::{Transaction, TransactionInput, TransactionOutput};

    fn coinbase_like(satoshis: u64) -> Transaction {
        let mut tx = Transaction::new();
        let mut input = TransactionInput::new();
        input.source_tx_out_index = 0xFFFF_FFFF;
        input.unlocking_script = Some(bc_script::Script::from_bytes(&[0x01, 0x02]));
        tx.add_input(input);
        tx.add_output(TransactionOutput {
            satoshis,
            locking_script: bc_script::Script::from_bytes(&[0x51]),
        });
        tx
    }

    fn spend(parent: &Transaction, satoshis: u64) -> Transaction {
        let mut tx = Transaction::new();
        let mut input = TransactionInput::new();
        input.source_txid = *parent.tx_id().as_bytes();
        input.unlocking_script = Some(bc_script::Script::from_bytes(&[0x51]));
        tx.add_input(input);
        tx.add_output(TransactionOutput {
            satoshis,
            locking_script: bc_script::Script::from_bytes(&[0x51]),
        });
        tx
    }

    #[test]
    fn test_round_trip_through_binary() {
        let anchor = coinbase_like(50_000);
        let payment = spend(&anchor, 40_000);

        let store = build_merkle_tree_store(&[anchor.tx_id()]).unwrap();
        let bump = bc_block::Bump::from_merkle_tree_and_index(1000, &store, 0).unwrap();

        let json = AncestryJson(vec![
            AncestryJsonEntry {
                rawtx: anchor.to_hex(),
                proof: Some(JsonProof::Bump(bump)),
                mapi_responses: None,
            },
            AncestryJsonEntry {
                rawtx: payment.to_hex(),
                proof: None,
                mapi_responses: None,
            },
        ]);

        let bytes = json.to_bytes().unwrap();
        let back = AncestryJson::from_bytes(&bytes).unwrap();
        assert_eq!(back.0.len(), 2);
        assert_eq!(back.0[0].rawtx, anchor.to_hex());
        assert!(matches!(back.0[0].proof, Some(JsonProof::Bump(_))));
        assert_eq!(back.0[1].rawtx, payment.to_hex());
        assert_eq!(back.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_json_string_round_trip() {
        let anchor = coinbase_like(50_000);
        let payment = spend(&anchor, 40_000);

        let proof = MerkleProof {
            index: 0,
            tx_or_id: anchor.tx_id_hex(),
            target: anchor.tx_id_hex(),
            nodes: vec![],
            target_type: Some("merkleRoot".to_string()),
            proof_type: None,
            composite: false,
        };

        let json = AncestryJson(vec![
            AncestryJsonEntry {
                rawtx: anchor.to_hex(),
                proof: Some(JsonProof::MerkleProof(proof)),
                mapi_responses: None,
            },
            AncestryJsonEntry {
                rawtx: payment.to_hex(),
                proof: None,
                mapi_responses: None,
            },
        ]);

        let text = json.to_json().unwrap();
        assert!(text.starts_with('['));
        let parsed = AncestryJson::from_json(&text).unwrap();
        assert!(matches!(parsed.0[0].proof, Some(JsonProof::MerkleProof(_))));
        assert_eq!(parsed.to_json().unwrap(), text);
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(
            AncestryJson(vec![]).to_ancestry(),
            Err(SpvError::NilInitialPayment)
        ));
    }
}
