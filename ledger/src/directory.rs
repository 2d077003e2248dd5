//! Directory blocks: the per-height top-level block referencing every sub-block.

use dirchain_crypto::{merkle_root, sha256, sha256_multi};
use dirchain_types::{ChainId, ChainKind, Hash32, DIRECTORY_CHAIN_ID};
use serde::{Deserialize, Serialize};

use crate::codec::{Decoder, Encoder};
use crate::{ChainBlock, CodecError};

/// Encoded size of a [`DirectoryBlockHeader`].
pub const DBLOCK_HEADER_LEN: usize = 1 + 4 + 32 * 3 + 4 + 4 + 4;

/// Encoded size of a [`DBEntry`].
pub const DB_ENTRY_LEN: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryBlockHeader {
    pub version: u8,
    pub network_id: u32,
    pub body_mr: Hash32,
    pub prev_key_mr: Hash32,
    pub prev_ledger_key_mr: Hash32,
    /// Minutes since the Unix epoch.
    pub timestamp: u32,
    pub db_height: u32,
    pub block_count: u32,
}

/// Reference from a directory block to one sub-block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DBEntry {
    pub chain_id: ChainId,
    pub key_mr: Hash32,
}

impl DBEntry {
    pub fn new(chain_id: ChainId, key_mr: Hash32) -> Self {
        Self { chain_id, key_mr }
    }

    fn leaf(&self) -> Hash32 {
        sha256_multi(&[self.chain_id.as_bytes(), self.key_mr.as_bytes()])
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryBlock {
    pub header: DirectoryBlockHeader,
    pub entries: Vec<DBEntry>,
}

impl DirectoryBlock {
    /// Build a block whose `body_mr` and `block_count` agree with `entries`.
    pub fn new(
        version: u8,
        network_id: u32,
        prev_key_mr: Hash32,
        prev_ledger_key_mr: Hash32,
        timestamp: u32,
        db_height: u32,
        entries: Vec<DBEntry>,
    ) -> Self {
        let header = DirectoryBlockHeader {
            version,
            network_id,
            body_mr: Self::compute_body_mr(&entries),
            prev_key_mr,
            prev_ledger_key_mr,
            timestamp,
            db_height,
            block_count: entries.len() as u32,
        };
        Self { header, entries }
    }

    pub fn compute_body_mr(entries: &[DBEntry]) -> Hash32 {
        let leaves: Vec<Hash32> = entries.iter().map(DBEntry::leaf).collect();
        merkle_root(&leaves)
    }

    /// Whether the header's `body_mr` and `block_count` describe `entries`.
    pub fn is_body_consistent(&self) -> bool {
        self.header.block_count as usize == self.entries.len()
            && self.header.body_mr == Self::compute_body_mr(&self.entries)
    }

    /// KeyMR of the sub-block recorded for `chain_id`, if any.
    pub fn entry_for(&self, chain_id: &ChainId) -> Option<Hash32> {
        self.entries
            .iter()
            .find(|e| e.chain_id == *chain_id)
            .map(|e| e.key_mr)
    }

    /// Ledger KeyMR: double SHA-256 over this block's encoding followed by the
    /// full encodings of every referenced sub-block, in entry order.
    pub fn ledger_key_mr(&self, bodies: &[Vec<u8>]) -> Hash32 {
        let own = self.marshal();
        let mut parts: Vec<&[u8]> = Vec::with_capacity(bodies.len() + 1);
        parts.push(&own);
        parts.extend(bodies.iter().map(Vec::as_slice));
        let first = sha256_multi(&parts);
        sha256(first.as_bytes())
    }
}

impl ChainBlock for DirectoryBlock {
    const KIND: ChainKind = ChainKind::Directory;

    fn marshal(&self) -> Vec<u8> {
        let h = &self.header;
        let mut enc = Encoder::with_capacity(DBLOCK_HEADER_LEN + DB_ENTRY_LEN * self.entries.len());
        enc.put_u8(h.version)
            .put_u32(h.network_id)
            .put_hash(&h.body_mr)
            .put_hash(&h.prev_key_mr)
            .put_hash(&h.prev_ledger_key_mr)
            .put_u32(h.timestamp)
            .put_u32(h.db_height)
            .put_u32(h.block_count);
        for e in &self.entries {
            enc.put_hash(&e.chain_id).put_hash(&e.key_mr);
        }
        enc.into_bytes()
    }

    fn unmarshal(data: &[u8]) -> Result<Self, CodecError> {
        let mut dec = Decoder::new(data);
        let header = DirectoryBlockHeader {
            version: dec.u8("version")?,
            network_id: dec.u32("network_id")?,
            body_mr: dec.hash("body_mr")?,
            prev_key_mr: dec.hash("prev_key_mr")?,
            prev_ledger_key_mr: dec.hash("prev_ledger_key_mr")?,
            timestamp: dec.u32("timestamp")?,
            db_height: dec.u32("db_height")?,
            block_count: dec.u32("block_count")?,
        };
        dec.expect_exact(header.block_count as usize, DB_ENTRY_LEN, "dblock entries")?;
        let mut entries = Vec::with_capacity(header.block_count as usize);
        for _ in 0..header.block_count {
            entries.push(DBEntry {
                chain_id: dec.hash("entry chain_id")?,
                key_mr: dec.hash("entry key_mr")?,
            });
        }
        dec.finish("directory block")?;
        Ok(Self { header, entries })
    }

    fn chain_id(&self) -> ChainId {
        DIRECTORY_CHAIN_ID
    }

    fn prev_key_mr(&self) -> Hash32 {
        self.header.prev_key_mr
    }

    fn db_height(&self) -> u32 {
        self.header.db_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(height: u32, prev: Hash32) -> DirectoryBlock {
        DirectoryBlock::new(
            0,
            0xFA92_E5A4,
            prev,
            Hash32::ZERO,
            1234 + height,
            height,
            vec![DBEntry::new(Hash32::ZERO, Hash32::ZERO)],
        )
    }

    #[test]
    fn marshal_round_trip() {
        let block = sample(3, Hash32::new([9; 32]));
        let bytes = block.marshal();
        assert_eq!(bytes.len(), DBLOCK_HEADER_LEN + DB_ENTRY_LEN);
        let back = DirectoryBlock::unmarshal(&bytes).unwrap();
        assert_eq!(back, block);
        assert_eq!(back.marshal(), bytes);
    }

    #[test]
    fn count_mismatch_is_malformed() {
        let mut block = sample(0, Hash32::ZERO);
        block.header.block_count = 2;
        let err = DirectoryBlock::unmarshal(&block.marshal()).unwrap_err();
        assert!(matches!(err, CodecError::MalformedEncoding(_)));
    }

    #[test]
    fn truncated_header_is_malformed() {
        let bytes = sample(0, Hash32::ZERO).marshal();
        assert!(DirectoryBlock::unmarshal(&bytes[..40]).is_err());
    }

    #[test]
    fn key_mr_tracks_content() {
        let a = sample(1, Hash32::ZERO);
        let b = sample(2, Hash32::ZERO);
        assert_ne!(a.key_mr(), b.key_mr());
        assert_eq!(a.key_mr(), a.clone().key_mr());
    }

    #[test]
    fn body_consistency() {
        let mut block = sample(0, Hash32::ZERO);
        assert!(block.is_body_consistent());
        block.entries.push(DBEntry::new(Hash32::new([1; 32]), Hash32::ZERO));
        assert!(!block.is_body_consistent());
    }

    #[test]
    fn ledger_key_mr_covers_bodies() {
        let block = sample(0, Hash32::ZERO);
        let a = block.ledger_key_mr(&[vec![1, 2, 3]]);
        let b = block.ledger_key_mr(&[vec![1, 2, 4]]);
        assert_ne!(a, b);
        assert_ne!(a, block.key_mr());
    }
}
