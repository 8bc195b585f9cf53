//! SPV client facade.
//!
//! Wraps the proof verifier and the ancestry verifier behind a small
//! capability set, wired to the external collaborators at construction
//! time.

use bc_block::BlockHeaderChain;
use bc_transaction::Transaction;

use crate::ancestry::Ancestry;
use crate::chain_tracker::ChainTracker;
use crate::context::Context;
use crate::verify_payment::VerifyOptions;
use crate::SpvError;

/// A client for Simple Payment Verification.
///
/// Holds the block header chain every proof check resolves against and
/// an optional chain tracker for height-addressed BUMP anchors.
pub struct SpvClient<'a> {
    bhc: &'a dyn BlockHeaderChain,
    chain_tracker: Option<&'a dyn ChainTracker>,
}

/// Builder for [`SpvClient`].
#[derive(Default)]
pub struct SpvClientBuilder<'a> {
    bhc: Option<&'a dyn BlockHeaderChain>,
    chain_tracker: Option<&'a dyn ChainTracker>,
}

impl<'a> SpvClientBuilder<'a> {
    /// Supply the block header chain implementation. Required.
    pub fn with_block_header_chain(mut self, bhc: &'a dyn BlockHeaderChain) -> Self {
        self.bhc = Some(bhc);
        self
    }

    /// Supply a chain tracker for verifying BUMP anchors. Optional.
    pub fn with_chain_tracker(mut self, tracker: &'a dyn ChainTracker) -> Self {
        self.chain_tracker = Some(tracker);
        self
    }

    /// Build the client.
    ///
    /// Fails with [`SpvError::MissingBlockHeaderChain`] when no header
    /// chain was supplied.
    pub fn build(self) -> Result<SpvClient<'a>, SpvError> {
        let bhc = self.bhc.ok_or(SpvError::MissingBlockHeaderChain)?;
        Ok(SpvClient {
            bhc,
            chain_tracker: self.chain_tracker,
        })
    }
}

impl<'a> SpvClient<'a> {
    /// Start building a client.
    pub fn builder() -> SpvClientBuilder<'a> {
        SpvClientBuilder::default()
    }

    pub(crate) fn block_header_chain(&self) -> &dyn BlockHeaderChain {
        self.bhc
    }

    pub(crate) fn chain_tracker(&self) -> Option<&dyn ChainTracker> {
        self.chain_tracker
    }

    /// Verify a payment against a serialized ancestry.
    ///
    /// `payment` is the raw payment transaction; it must match the
    /// payment embedded in `ancestry_bytes`. Returns the parsed payment
    /// transaction on success.
    pub fn verify_payment_with_ancestry(
        &self,
        ctx: &Context,
        payment: &[u8],
        ancestry_bytes: &[u8],
        opts: &VerifyOptions<'_>,
    ) -> Result<Transaction, SpvError> {
        if payment.is_empty() {
            return Err(SpvError::NilInitialPayment);
        }
        let payment_tx = Transaction::from_bytes(payment)?;

        let ancestry = Ancestry::from_bytes(ancestry_bytes)?;
        if ancestry.payment_tx.tx_id() != payment_tx.tx_id() {
            return Err(SpvError::TxIdMismatch {
                envelope: payment_tx.tx_id_hex(),
                proof: ancestry.payment_tx.tx_id_hex(),
            });
        }

        self.verify_payment(ctx, &ancestry, opts)
    }
}
