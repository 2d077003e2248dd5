//! Factoid blocks: opaque value-transfer transactions batched per height.

use dirchain_crypto::sha256d;
use dirchain_types::{ChainId, ChainKind, Hash32, FACTOID_CHAIN_ID};
use serde::{Deserialize, Serialize};

use crate::codec::{Decoder, Encoder};
use crate::{ChainBlock, CodecError};

/// A transaction carried verbatim. Its contents are not interpreted here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoidTransaction {
    pub raw: Vec<u8>,
}

impl FactoidTransaction {
    pub fn new(raw: Vec<u8>) -> Self {
        Self { raw }
    }

    pub fn hash(&self) -> Hash32 {
        sha256d(&self.raw)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoidBlock {
    pub prev_key_mr: Hash32,
    pub db_height: u32,
    pub transactions: Vec<FactoidTransaction>,
}

impl FactoidBlock {
    pub fn new(prev_key_mr: Hash32, db_height: u32) -> Self {
        Self {
            prev_key_mr,
            db_height,
            transactions: Vec::new(),
        }
    }

    pub fn add_transaction(&mut self, tx: FactoidTransaction) {
        self.transactions.push(tx);
    }
}

impl ChainBlock for FactoidBlock {
    const KIND: ChainKind = ChainKind::Factoid;

    fn marshal(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        enc.put_hash(&FACTOID_CHAIN_ID)
            .put_hash(&self.prev_key_mr)
            .put_u32(self.db_height)
            .put_u32(self.transactions.len() as u32);
        for tx in &self.transactions {
            enc.put_var_bytes(&tx.raw);
        }
        enc.into_bytes()
    }

    fn unmarshal(data: &[u8]) -> Result<Self, CodecError> {
        let mut dec = Decoder::new(data);
        let chain_id = dec.hash("chain_id")?;
        if chain_id != FACTOID_CHAIN_ID {
            return Err(CodecError::malformed(format!(
                "factoid block: unexpected chain id {chain_id}"
            )));
        }
        let prev_key_mr = dec.hash("prev_key_mr")?;
        let db_height = dec.u32("db_height")?;
        let count = dec.u32("tx_count")? as usize;
        let mut transactions = Vec::with_capacity(count.min(dec.remaining()));
        for _ in 0..count {
            transactions.push(FactoidTransaction::new(dec.var_bytes("transaction")?));
        }
        dec.finish("factoid block")?;
        Ok(Self {
            prev_key_mr,
            db_height,
            transactions,
        })
    }

    fn chain_id(&self) -> ChainId {
        FACTOID_CHAIN_ID
    }

    fn prev_key_mr(&self) -> Hash32 {
        self.prev_key_mr
    }

    fn db_height(&self) -> u32 {
        self.db_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let mut block = FactoidBlock::new(Hash32::new([1; 32]), 2);
        block.add_transaction(FactoidTransaction::new(vec![1, 2, 3]));
        block.add_transaction(FactoidTransaction::new(Vec::new()));
        let back = FactoidBlock::unmarshal(&block.marshal()).unwrap();
        assert_eq!(back, block);
    }

    #[test]
    fn oversized_length_prefix_rejected() {
        let mut block = FactoidBlock::new(Hash32::ZERO, 0);
        block.add_transaction(FactoidTransaction::new(vec![0xaa]));
        let mut bytes = block.marshal();
        let len_at = bytes.len() - 5;
        bytes[len_at] = 0xff;
        assert!(matches!(
            FactoidBlock::unmarshal(&bytes),
            Err(CodecError::MalformedEncoding(_))
        ));
    }
}
