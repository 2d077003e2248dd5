//! Atomic multi-block writes, so a height's sub-blocks and its directory
//! block land together or not at all.

use dirchain_ledger::{ChainBlock, Entry};
use dirchain_store::WriteBatch;
use dirchain_types::Hash32;

use crate::buckets;

#[derive(Debug, Default)]
pub struct OverlayBatch {
    inner: WriteBatch,
    blocks: usize,
}

impl OverlayBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage `block` under its KeyMR, index it, and repoint its chain head.
    /// Returns the KeyMR.
    pub fn add_block<B: ChainBlock>(&mut self, block: &B) -> Hash32 {
        let bytes = block.marshal();
        let key_mr = block.key_mr();
        self.inner
            .put(buckets::blocks(B::KIND), key_mr.as_bytes(), &bytes)
            .index_put(buckets::index(B::KIND), &block.index_key(), &key_mr)
            .index_put(buckets::HEAD, &block.head_key(), &key_mr);
        if let Some(body) = block.body_index() {
            self.inner
                .index_put(buckets::EBLOCK_BODY_INDEX, body.as_bytes(), &key_mr);
        }
        self.blocks += 1;
        key_mr
    }

    pub fn add_entry(&mut self, entry: &Entry) -> Hash32 {
        let hash = entry.hash();
        self.inner
            .put(buckets::ENTRY, hash.as_bytes(), &entry.marshal());
        hash
    }

    pub fn index_ledger_key_mr(&mut self, ledger_key_mr: &Hash32, key_mr: &Hash32) {
        self.inner
            .index_put(buckets::LEDGER_INDEX, ledger_key_mr.as_bytes(), key_mr);
    }

    /// Number of blocks staged.
    pub fn block_count(&self) -> usize {
        self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub(crate) fn into_inner(self) -> WriteBatch {
        self.inner
    }
}
