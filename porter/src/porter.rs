//! Copy a remote directory chain, with everything it references, into a
//! local overlay.

use dirchain_ledger::{
    AdminBlock, ChainBlock, DirectoryBlock, EntryBlock, EntryCreditBlock, FactoidBlock,
};
use dirchain_overlay::{buckets, Overlay, OverlayBatch};
use dirchain_store::ContentStore;
use dirchain_types::ChainKind;

use crate::{Fetcher, PorterError, RawSource};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PortReport {
    pub directory_blocks: usize,
    pub sub_blocks: usize,
    pub entries: usize,
    /// Height of the local directory head afterwards, if any.
    pub head_height: Option<u32>,
}

pub struct Porter<'a, R: RawSource, S: ContentStore> {
    fetcher: Fetcher<R>,
    overlay: &'a Overlay<S>,
}

impl<'a, R: RawSource, S: ContentStore> Porter<'a, R, S> {
    pub fn new(fetcher: Fetcher<R>, overlay: &'a Overlay<S>) -> Self {
        Self { fetcher, overlay }
    }

    /// Walk back from the remote head to the first directory block already
    /// stored locally (or genesis), then store the missing heights
    /// oldest-first. Each height lands in one batch together with its
    /// sub-blocks and entries.
    pub async fn port(&self) -> Result<PortReport, PorterError> {
        let head = self.fetcher.head_key_mr().await?;
        let mut missing: Vec<DirectoryBlock> = Vec::new();
        let mut key_mr = head;
        while !key_mr.is_zero() && !self.overlay.has_block::<DirectoryBlock>(&key_mr)? {
            let dblock: DirectoryBlock = self.fetcher.fetch_block(&key_mr).await?;
            if !dblock.is_body_consistent() {
                return Err(PorterError::Malformed(format!(
                    "directory block {key_mr} body does not match its header"
                )));
            }
            if let Some(child) = missing.last() {
                if dblock.header.db_height + 1 != child.header.db_height {
                    return Err(PorterError::Malformed(format!(
                        "height {} links to height {}",
                        child.header.db_height, dblock.header.db_height
                    )));
                }
            }
            tracing::debug!(height = dblock.header.db_height, %key_mr, "fetched directory block");
            key_mr = dblock.header.prev_key_mr;
            missing.push(dblock);
        }

        let mut report = PortReport::default();
        if missing.is_empty() {
            tracing::info!(%head, "local chain already at remote head");
        }
        for dblock in missing.iter().rev() {
            self.save_height(dblock, &mut report).await?;
        }
        report.head_height = match self.overlay.fetch_dblock_head() {
            Ok(d) => Some(d.header.db_height),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e.into()),
        };
        tracing::info!(
            directory_blocks = report.directory_blocks,
            entries = report.entries,
            head_height = ?report.head_height,
            "port complete"
        );
        Ok(report)
    }

    async fn save_height(
        &self,
        dblock: &DirectoryBlock,
        report: &mut PortReport,
    ) -> Result<(), PorterError> {
        let mut batch = OverlayBatch::new();
        let mut bodies = Vec::with_capacity(dblock.entries.len());
        for e in &dblock.entries {
            match buckets::kind_of_chain(&e.chain_id) {
                ChainKind::Admin => {
                    let b: AdminBlock = self.fetcher.fetch_block(&e.key_mr).await?;
                    bodies.push(b.marshal());
                    batch.add_block(&b);
                }
                ChainKind::EntryCredit => {
                    let b: EntryCreditBlock = self.fetcher.fetch_block(&e.key_mr).await?;
                    bodies.push(b.marshal());
                    batch.add_block(&b);
                }
                ChainKind::Factoid => {
                    let b: FactoidBlock = self.fetcher.fetch_block(&e.key_mr).await?;
                    bodies.push(b.marshal());
                    batch.add_block(&b);
                }
                ChainKind::Entry => {
                    let b: EntryBlock = self.fetcher.fetch_block(&e.key_mr).await?;
                    for hash in b.entry_hashes() {
                        let entry = self.fetcher.fetch_entry(&hash).await?;
                        batch.add_entry(&entry);
                        report.entries += 1;
                    }
                    bodies.push(b.marshal());
                    batch.add_block(&b);
                }
                ChainKind::Directory => {
                    return Err(PorterError::Malformed(format!(
                        "directory block at height {} references the directory chain",
                        dblock.header.db_height
                    )))
                }
            }
            report.sub_blocks += 1;
        }

        let ledger_key_mr = dblock.ledger_key_mr(&bodies);
        let key_mr = batch.add_block(dblock);
        batch.index_ledger_key_mr(&ledger_key_mr, &key_mr);
        self.overlay.commit(batch)?;
        report.directory_blocks += 1;
        tracing::debug!(height = dblock.header.db_height, %key_mr, "ported height");
        Ok(())
    }
}
