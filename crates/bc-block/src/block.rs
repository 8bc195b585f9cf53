//! Block container: a header plus its transactions.

use bc_primitives::chainhash::Hash;
use bc_primitives::util::{ByteReader, ByteWriter, VarInt};
use bc_transaction::Transaction;

use crate::merkle_tree::merkle_root;
use crate::{BlockError, BlockHeader};

/// A block in the Bitcoin blockchain.
#[derive(Clone, Debug)]
pub struct Block {
    /// The 80-byte block header.
    pub header: BlockHeader,
    /// The block's transactions in mined order.
    pub txs: Vec<Transaction>,
}

impl Block {
    /// Serialize the block: header, VarInt transaction count, then each
    /// transaction in wire form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        writer.write_bytes(&self.header.to_bytes());
        writer.write_varint(VarInt::from(self.txs.len()));
        for tx in &self.txs {
            writer.write_bytes(&tx.to_bytes());
        }
        writer.into_bytes()
    }

    /// Serialize the block as hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Parse a block from its serialized form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BlockError> {
        let mut reader = ByteReader::new(bytes);
        let header_bytes = reader
            .read_bytes(80)
            .map_err(|_| BlockError::InvalidHeaderLength)?;
        let header = BlockHeader::from_bytes(header_bytes)?;

        let tx_count = reader
            .read_varint()
            .map_err(|_| BlockError::Truncated("block tx count"))?
            .value();

        let mut txs = Vec::with_capacity(tx_count as usize);
        for _ in 0..tx_count {
            txs.push(Transaction::read_from(&mut reader)?);
        }

        Ok(Block { header, txs })
    }

    /// Parse a block from hex.
    pub fn from_hex(block_str: &str) -> Result<Self, BlockError> {
        Self::from_bytes(&hex::decode(block_str)?)
    }

    /// The transaction ids of the block in mined order.
    pub fn tx_ids(&self) -> Vec<Hash> {
        self.txs.iter().map(|tx| tx.tx_id()).collect()
    }

    /// The Merkle root over the block's transactions.
    pub fn merkle_root(&self) -> Result<Hash, BlockError> {
        merkle_root(&self.tx_ids())
    }
}
