//! Block persistence over a [`ContentStore`].

use std::collections::HashSet;

use dirchain_ledger::{
    AdminBlock, ChainBlock, DirectoryBlock, Entry, EntryBlock, EntryCreditBlock, FactoidBlock,
    eblock_index_key,
};
use dirchain_store::ContentStore;
use dirchain_types::{ChainId, ChainKind, Hash32, DIRECTORY_CHAIN_ID};

use crate::{buckets, OverlayBatch, OverlayError};

pub struct Overlay<S: ContentStore> {
    store: S,
}

impl<S: ContentStore> Overlay<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persist `block` under its KeyMR and repoint its chain head to it in
    /// one atomic write. The previous head stays retrievable by hash.
    pub fn save_head<B: ChainBlock>(&self, block: &B) -> Result<Hash32, OverlayError> {
        let mut batch = OverlayBatch::new();
        let key_mr = batch.add_block(block);
        self.commit(batch)?;
        tracing::debug!(
            kind = B::KIND.as_str(),
            height = block.db_height(),
            key_mr = %key_mr,
            "block saved as head"
        );
        Ok(key_mr)
    }

    pub fn commit(&self, batch: OverlayBatch) -> Result<(), OverlayError> {
        let blocks = batch.block_count();
        self.store.write_batch(batch.into_inner())?;
        tracing::trace!(blocks, "overlay batch committed");
        Ok(())
    }

    /// Primary-index lookup. The decoded block's KeyMR is recomputed and must
    /// equal `key_mr`; a mismatch is an [`OverlayError::IntegrityViolation`].
    pub fn fetch_by_hash<B: ChainBlock>(&self, key_mr: &Hash32) -> Result<B, OverlayError> {
        let raw = self.store.get(buckets::blocks(B::KIND), key_mr.as_bytes())?;
        let block = B::unmarshal(&raw)?;
        let actual = block.key_mr();
        if actual != *key_mr {
            tracing::error!(
                kind = B::KIND.as_str(),
                key = %key_mr,
                actual = %actual,
                "stored block does not match its key"
            );
            return Err(OverlayError::IntegrityViolation {
                kind: B::KIND,
                key: *key_mr,
                actual,
            });
        }
        Ok(block)
    }

    pub fn has_block<B: ChainBlock>(&self, key_mr: &Hash32) -> Result<bool, OverlayError> {
        Ok(self.store.exists(buckets::blocks(B::KIND), key_mr.as_bytes())?)
    }

    /// Head of a system chain (directory, admin, entry credit, factoid).
    pub fn fetch_head<B: ChainBlock>(&self) -> Result<B, OverlayError> {
        let chain_id = B::KIND.system_chain_id().ok_or_else(|| {
            OverlayError::NotFound("entry blocks have one head per chain id".to_string())
        })?;
        self.fetch_head_of_chain(&chain_id)
    }

    pub fn fetch_head_of_chain<B: ChainBlock>(&self, chain_id: &ChainId) -> Result<B, OverlayError> {
        let key_mr = self.fetch_head_key_mr(chain_id)?;
        self.fetch_by_hash(&key_mr)
    }

    pub fn fetch_head_key_mr(&self, chain_id: &ChainId) -> Result<Hash32, OverlayError> {
        Ok(self.store.index_get(buckets::HEAD, chain_id.as_bytes())?)
    }

    /// Secondary-index lookup: height for the system chains, `chain_id ‖
    /// sequence` for entry blocks.
    pub fn fetch_hash_by_key<B: ChainBlock>(&self, secondary_key: &[u8]) -> Result<Hash32, OverlayError> {
        Ok(self.store.index_get(buckets::index(B::KIND), secondary_key)?)
    }

    pub fn fetch_hash_by_height<B: ChainBlock>(&self, height: u32) -> Result<Hash32, OverlayError> {
        self.fetch_hash_by_key::<B>(&height.to_be_bytes())
    }

    pub fn fetch_by_height<B: ChainBlock>(&self, height: u32) -> Result<B, OverlayError> {
        let key_mr = self.fetch_hash_by_height::<B>(height)?;
        self.fetch_by_hash(&key_mr)
    }

    pub fn fetch_dblock_head(&self) -> Result<DirectoryBlock, OverlayError> {
        self.fetch_head()
    }

    pub fn fetch_dblock_by_height(&self, height: u32) -> Result<DirectoryBlock, OverlayError> {
        self.fetch_by_height(height)
    }

    pub fn fetch_dblock_by_ledger_key_mr(&self, ledger_key_mr: &Hash32) -> Result<DirectoryBlock, OverlayError> {
        let key_mr = self
            .store
            .index_get(buckets::LEDGER_INDEX, ledger_key_mr.as_bytes())?;
        self.fetch_by_hash(&key_mr)
    }

    pub fn fetch_eblock_head(&self, chain_id: &ChainId) -> Result<EntryBlock, OverlayError> {
        self.fetch_head_of_chain(chain_id)
    }

    pub fn fetch_eblock_by_sequence(&self, chain_id: &ChainId, sequence: u32) -> Result<EntryBlock, OverlayError> {
        let key_mr = self.fetch_hash_by_key::<EntryBlock>(&eblock_index_key(chain_id, sequence))?;
        self.fetch_by_hash(&key_mr)
    }

    pub fn fetch_eblock_by_body_hash(&self, body_hash: &Hash32) -> Result<EntryBlock, OverlayError> {
        let key_mr = self
            .store
            .index_get(buckets::EBLOCK_BODY_INDEX, body_hash.as_bytes())?;
        self.fetch_by_hash(&key_mr)
    }

    /// Every entry block of `chain_id`, in sequence order.
    pub fn fetch_all_eblocks_by_chain(&self, chain_id: &ChainId) -> Result<Vec<EntryBlock>, OverlayError> {
        let index = buckets::index(ChainKind::Entry);
        let mut out = Vec::new();
        for key in self.store.keys(index)? {
            if !key.starts_with(chain_id.as_bytes()) {
                continue;
            }
            let key_mr = self.store.index_get(index, &key)?;
            out.push(self.fetch_by_hash(&key_mr)?);
        }
        Ok(out)
    }

    pub fn save_entry(&self, entry: &Entry) -> Result<Hash32, OverlayError> {
        let mut batch = OverlayBatch::new();
        let hash = batch.add_entry(entry);
        self.commit(batch)?;
        Ok(hash)
    }

    pub fn fetch_entry(&self, hash: &Hash32) -> Result<Entry, OverlayError> {
        let raw = self.store.get(buckets::ENTRY, hash.as_bytes())?;
        let entry = Entry::unmarshal(&raw)?;
        let actual = entry.hash();
        if actual != *hash {
            return Err(OverlayError::IntegrityViolation {
                kind: ChainKind::Entry,
                key: *hash,
                actual,
            });
        }
        Ok(entry)
    }

    /// Ledger KeyMR of a stored directory block, recomputed from the full
    /// bodies of every sub-block it references.
    pub fn ledger_key_mr(&self, dblock: &DirectoryBlock) -> Result<Hash32, OverlayError> {
        let mut bodies = Vec::with_capacity(dblock.entries.len());
        for e in &dblock.entries {
            let bytes = match buckets::kind_of_chain(&e.chain_id) {
                ChainKind::Admin => self.fetch_by_hash::<AdminBlock>(&e.key_mr)?.marshal(),
                ChainKind::EntryCredit => self.fetch_by_hash::<EntryCreditBlock>(&e.key_mr)?.marshal(),
                ChainKind::Factoid => self.fetch_by_hash::<FactoidBlock>(&e.key_mr)?.marshal(),
                ChainKind::Entry => self.fetch_by_hash::<EntryBlock>(&e.key_mr)?.marshal(),
                ChainKind::Directory => {
                    return Err(OverlayError::BrokenChain(format!(
                        "directory block {} references the directory chain",
                        dblock.key_mr()
                    )))
                }
            };
            bodies.push(bytes);
        }
        Ok(dblock.ledger_key_mr(&bodies))
    }

    /// Walk the directory chain from its head back to genesis.
    ///
    /// Checks that exactly `height + 1` distinct blocks are visited, heights
    /// decrease by one per step, genesis carries the zero PrevKeyMR, and the
    /// height index agrees with every visited block. Returns the number of
    /// blocks visited (0 for an empty store).
    pub fn verify_directory_chain(&self) -> Result<u64, OverlayError> {
        let head_key_mr = match self.fetch_head_key_mr(&DIRECTORY_CHAIN_ID) {
            Ok(k) => k,
            Err(e) if e.is_not_found() => return Ok(0),
            Err(e) => return Err(e),
        };
        let mut current: DirectoryBlock = self.fetch_by_hash(&head_key_mr)?;
        let expected = u64::from(current.header.db_height) + 1;
        let mut key_mr = head_key_mr;
        let mut seen = HashSet::new();

        loop {
            let height = current.header.db_height;
            if !seen.insert(key_mr) {
                return Err(OverlayError::BrokenChain(format!("cycle at {key_mr}")));
            }
            let indexed = self.fetch_hash_by_height::<DirectoryBlock>(height)?;
            if indexed != key_mr {
                return Err(OverlayError::BrokenChain(format!(
                    "height index {height} points at {indexed}, chain has {key_mr}"
                )));
            }

            let prev = current.header.prev_key_mr;
            if height == 0 {
                if !prev.is_zero() {
                    return Err(OverlayError::BrokenChain(format!(
                        "genesis PrevKeyMR is {prev}, expected zero"
                    )));
                }
                break;
            }
            if prev.is_zero() {
                return Err(OverlayError::BrokenChain(format!(
                    "zero PrevKeyMR at height {height}"
                )));
            }
            let parent: DirectoryBlock = self.fetch_by_hash(&prev)?;
            if parent.header.db_height + 1 != height {
                return Err(OverlayError::BrokenChain(format!(
                    "height {} follows height {height}",
                    parent.header.db_height
                )));
            }
            current = parent;
            key_mr = prev;
        }

        let visited = seen.len() as u64;
        if visited != expected {
            return Err(OverlayError::BrokenChain(format!(
                "visited {visited} blocks, expected {expected}"
            )));
        }
        Ok(visited)
    }

    /// Flush and close the underlying store.
    pub fn close(&self) -> Result<(), OverlayError> {
        self.store.close()?;
        tracing::info!("overlay closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirchain_ledger::DBEntry;
    use dirchain_nullables::NullStore;

    fn genesis() -> DirectoryBlock {
        DirectoryBlock::new(0, 1, Hash32::ZERO, Hash32::ZERO, 0, 0, Vec::new())
    }

    #[test]
    fn save_and_fetch_head() {
        let overlay = Overlay::new(NullStore::new());
        let block = genesis();
        let key_mr = overlay.save_head(&block).unwrap();
        assert_eq!(key_mr, block.key_mr());
        assert_eq!(overlay.fetch_dblock_head().unwrap(), block);
        assert_eq!(overlay.fetch_dblock_by_height(0).unwrap(), block);
    }

    #[test]
    fn missing_head_is_not_found() {
        let overlay = Overlay::new(NullStore::new());
        assert!(overlay.fetch_dblock_head().unwrap_err().is_not_found());
        assert_eq!(overlay.verify_directory_chain().unwrap(), 0);
    }

    #[test]
    fn entry_head_requires_chain_id() {
        let overlay = Overlay::new(NullStore::new());
        assert!(overlay.fetch_head::<EntryBlock>().unwrap_err().is_not_found());
    }

    #[test]
    fn dblock_referencing_directory_chain_is_rejected() {
        let overlay = Overlay::new(NullStore::new());
        let block = DirectoryBlock::new(
            0,
            1,
            Hash32::ZERO,
            Hash32::ZERO,
            0,
            0,
            vec![DBEntry::new(DIRECTORY_CHAIN_ID, Hash32::ZERO)],
        );
        assert!(matches!(
            overlay.ledger_key_mr(&block),
            Err(OverlayError::BrokenChain(_))
        ));
    }
}
