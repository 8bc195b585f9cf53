//! Ancestry verification.
//!
//! Walks every ancestor of a payment and checks, per the enabled
//! options, that anchored ancestors carry valid Merkle proofs, that
//! each spend satisfies the script engine (with unanchored ancestors
//! required to have their inputs covered inside the set), and that
//! unanchored transactions pay enough fees. Verification stops at the
//! first failure.

use bc_primitives::chainhash::Hash;
use bc_script::Script;
use bc_transaction::{Transaction, TransactionError};

use crate::ancestry::{Ancestor, AncestorProof, Ancestry};
use crate::client::SpvClient;
use crate::context::Context;
use crate::verify::txid_from_tx_or_id;
use crate::SpvError;

/// Parameters handed to a [`ScriptEngine`] for one input.
pub struct ScriptParams<'a> {
    /// The spending transaction.
    pub tx: &'a Transaction,
    /// Index of the input being checked.
    pub input_index: usize,
    /// Locking script of the output being spent.
    pub locking_script: &'a Script,
    /// Unlocking script supplied by the input, if any.
    pub unlocking_script: Option<&'a Script>,
}

/// Executes a locking/unlocking script pair. Pure predicate: `true`
/// means the spend is authorized.
pub trait ScriptEngine {
    /// Run the scripts for one input.
    fn execute(&self, params: ScriptParams<'_>) -> bool;
}

/// Decides whether a transaction pays enough fees. The transaction's
/// inputs arrive with their source outputs attached, so input satoshis
/// are available.
pub trait FeePolicy {
    /// Whether the fee the transaction pays satisfies this policy.
    fn is_fee_paid_enough(&self, tx: &Transaction) -> Result<bool, TransactionError>;
}

/// A satoshis-per-bytes fee rate.
///
/// The default mirrors the customary standard mining rate of 0.5
/// satoshis per byte (5 satoshis per 10 bytes).
#[derive(Clone, Copy, Debug)]
pub struct FeeQuote {
    /// Satoshis charged per `bytes` of transaction size.
    pub satoshis: u64,
    /// The size unit the rate is quoted over.
    pub bytes: u64,
}

impl Default for FeeQuote {
    fn default() -> Self {
        FeeQuote {
            satoshis: 5,
            bytes: 10,
        }
    }
}

impl FeePolicy for FeeQuote {
    fn is_fee_paid_enough(&self, tx: &Transaction) -> Result<bool, TransactionError> {
        let total_in = tx.total_input_satoshis()?;
        let total_out = tx.total_output_satoshis();
        let fee_paid = match total_in.checked_sub(total_out) {
            Some(fee) => fee,
            None => return Ok(false),
        };
        let required = tx.size() as u64 * self.satoshis / self.bytes.max(1);
        Ok(fee_paid >= required)
    }
}

/// Options controlling which verification stages run.
///
/// Proof and script verification default on; fee verification defaults
/// off and requires a [`FeePolicy`].
#[derive(Clone, Copy, Default)]
pub struct VerifyOptions<'a> {
    no_proofs: bool,
    no_scripts: bool,
    fee_policy: Option<&'a dyn FeePolicy>,
    script_engine: Option<&'a dyn ScriptEngine>,
}

impl<'a> VerifyOptions<'a> {
    /// Options with every default: proofs and scripts verified, fees not.
    pub fn new() -> Self {
        VerifyOptions::default()
    }

    /// Skip Merkle proof verification; the input-coverage requirement
    /// on unanchored ancestors is waived with it.
    pub fn no_verify_proofs(mut self) -> Self {
        self.no_proofs = true;
        self
    }

    /// Skip the per-input walk: script execution and the coverage
    /// checks that ride it.
    pub fn no_verify_scripts(mut self) -> Self {
        self.no_scripts = true;
        self
    }

    /// Skip both proof and script verification.
    pub fn no_spv(self) -> Self {
        self.no_verify_proofs().no_verify_scripts()
    }

    /// Verify fees with the given policy.
    pub fn verify_fees(mut self, policy: &'a dyn FeePolicy) -> Self {
        self.fee_policy = Some(policy);
        self
    }

    /// Use the given engine for script verification. Without one, every
    /// script pair is accepted.
    pub fn with_script_engine(mut self, engine: &'a dyn ScriptEngine) -> Self {
        self.script_engine = Some(engine);
        self
    }

    fn proofs(&self) -> bool {
        !self.no_proofs
    }

    fn scripts(&self) -> bool {
        !self.no_scripts
    }

    fn fees(&self) -> bool {
        self.fee_policy.is_some()
    }
}

/// The ancestor set under verification: the ancestry plus the payment
/// transaction itself, addressable by txid.
struct AncestorSet<'v> {
    ancestry: &'v Ancestry,
    payment_txid: Hash,
    payment: &'v Ancestor,
}

impl<'v> AncestorSet<'v> {
    fn get(&self, txid: &Hash) -> Option<&'v Ancestor> {
        if let Some(found) = self.ancestry.get(txid) {
            return Some(found);
        }
        (*txid == self.payment_txid).then_some(self.payment)
    }
}

impl<'a> SpvClient<'a> {
    /// Verify that a payment is fully backed by its ancestry.
    ///
    /// The payment itself must be unanchored; on success the parsed
    /// payment transaction is returned.
    pub fn verify_payment(
        &self,
        ctx: &Context,
        ancestry: &Ancestry,
        opts: &VerifyOptions<'_>,
    ) -> Result<Transaction, SpvError> {
        ctx.ensure_active()?;

        // The tip is the transaction being verified; a proof attached
        // to it means it is already mined.
        let payment_txid = ancestry.payment_tx.tx_id();
        if let Some(tip) = ancestry.get(&payment_txid) {
            if tip.is_anchored() {
                return Err(SpvError::TipTxConfirmed);
            }
        }

        self.verify_ancestors(ctx, ancestry, opts)?;
        Ok(ancestry.payment_tx.clone())
    }

    /// Run the per-ancestor checks over the whole set, payment included.
    fn verify_ancestors(
        &self,
        ctx: &Context,
        ancestry: &Ancestry,
        opts: &VerifyOptions<'_>,
    ) -> Result<(), SpvError> {
        let payment_entry = Ancestor::new(ancestry.payment_tx.clone());
        let set = AncestorSet {
            ancestry,
            payment_txid: ancestry.payment_tx.tx_id(),
            payment: &payment_entry,
        };

        // The payment joins the walk unless the set already carries it.
        let payment_slot = if ancestry.get(&set.payment_txid).is_none() {
            Some(&payment_entry)
        } else {
            None
        };

        for ancestor in ancestry.ancestors().iter().chain(payment_slot) {
            ctx.ensure_active()?;
            let txid_hex = ancestor.tx.tx_id_hex();

            if let (Some(proof), true) = (&ancestor.proof, opts.proofs()) {
                self.verify_ancestor_proof(ctx, &ancestor.tx, proof)?;
            }

            if opts.scripts() {
                // An unconfirmed transaction without inputs can never be
                // traced back to an anchor.
                if !ancestor.is_anchored() && ancestor.tx.inputs.is_empty() {
                    if opts.proofs() {
                        return Err(SpvError::NoConfirmedTransaction(txid_hex));
                    }
                    return Err(SpvError::NoTxInputsToVerify(txid_hex));
                }
                for (vin, input) in ancestor.tx.inputs.iter().enumerate() {
                    let Some(parent) = set.get(&input.source_txid_hash()) else {
                        // An unanchored spend of a transaction outside the
                        // set leaves nothing to verify against.
                        if opts.proofs() && !ancestor.is_anchored() {
                            return Err(SpvError::ProofOrInputMissing(txid_hex));
                        }
                        continue;
                    };
                    let out_index = input.source_tx_out_index as usize;
                    let Some(output) = parent.tx.outputs.get(out_index) else {
                        return Err(SpvError::InputRefsOutOfBoundsOutput);
                    };
                    if let Some(engine) = opts.script_engine {
                        let accepted = engine.execute(ScriptParams {
                            tx: &ancestor.tx,
                            input_index: vin,
                            locking_script: &output.locking_script,
                            unlocking_script: input.unlocking_script.as_ref(),
                        });
                        if !accepted {
                            return Err(SpvError::PaymentNotVerified);
                        }
                    }
                }
            }

            if opts.fees() && !ancestor.is_anchored() {
                let policy = opts.fee_policy.ok_or(SpvError::NoFeeQuoteSupplied)?;
                let mut tx = ancestor.tx.clone();
                for input in &mut tx.inputs {
                    let source = set
                        .get(&input.source_txid_hash())
                        .and_then(|parent| {
                            parent.tx.outputs.get(input.source_tx_out_index as usize)
                        })
                        .cloned()
                        .ok_or_else(|| SpvError::CannotCalculateFeePaid(txid_hex.clone()))?;
                    input.set_source_output(Some(source));
                }
                match policy.is_fee_paid_enough(&tx) {
                    Ok(true) => {}
                    Ok(false) | Err(_) => return Err(SpvError::FeePaidNotEnough),
                }
            }
        }

        Ok(())
    }

    /// Check one ancestor's anchor proof.
    fn verify_ancestor_proof(
        &self,
        ctx: &Context,
        tx: &Transaction,
        proof_bytes: &[u8],
    ) -> Result<(), SpvError> {
        match AncestorProof::from_bytes(proof_bytes)? {
            AncestorProof::MerkleProof(proof) => {
                let proof_txid = txid_from_tx_or_id(&proof.tx_or_id)?;
                if proof_txid != tx.tx_id_hex() {
                    return Err(SpvError::TxIdMismatch {
                        envelope: tx.tx_id_hex(),
                        proof: proof_txid,
                    });
                }
                let (valid, _) = self.verify_merkle_proof_json(ctx, &proof)?;
                if !valid {
                    return Err(SpvError::InvalidProof);
                }
            }
            AncestorProof::Bump(bump) => {
                let tracker = self.chain_tracker().ok_or(SpvError::MissingChainTracker)?;
                let root = bump
                    .calculate_root_given_txid(&tx.tx_id_hex())
                    .map_err(|_| SpvError::InvalidProof)?;
                ctx.ensure_active()?;
                if !tracker.is_valid_root_for_height(&root, bump.block_height)? {
                    return Err(SpvError::InvalidProof);
                }
            }
        }
        Ok(())
    }
}
