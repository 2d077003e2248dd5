//! Entry blocks and entries: user-data chains keyed by chain id.

use dirchain_crypto::{merkle_root, sha256d};
use dirchain_types::{ChainId, ChainKind, Hash32};
use serde::{Deserialize, Serialize};

use crate::codec::{Decoder, Encoder};
use crate::{ChainBlock, CodecError};

const EBLOCK_HEADER_LEN: usize = 32 + 32 + 4 + 4 + 4;

/// Largest minute number encodable as a marker slot.
const MAX_MINUTE_MARKER: u8 = 0x0f;

/// A user entry. Its hash is what entry blocks reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub chain_id: ChainId,
    pub content: Vec<u8>,
}

impl Entry {
    pub fn new(chain_id: ChainId, content: Vec<u8>) -> Self {
        Self { chain_id, content }
    }

    pub fn marshal(&self) -> Vec<u8> {
        let mut enc = Encoder::with_capacity(36 + self.content.len());
        enc.put_hash(&self.chain_id).put_var_bytes(&self.content);
        enc.into_bytes()
    }

    pub fn unmarshal(data: &[u8]) -> Result<Self, CodecError> {
        let mut dec = Decoder::new(data);
        let chain_id = dec.hash("chain_id")?;
        let content = dec.var_bytes("content")?;
        dec.finish("entry")?;
        Ok(Self { chain_id, content })
    }

    pub fn hash(&self) -> Hash32 {
        sha256d(&self.marshal())
    }
}

/// One 32-byte slot of an entry block body.
///
/// Minute markers are encoded as 31 zero bytes followed by the minute number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EBlockItem {
    Entry(Hash32),
    MinuteMarker(u8),
}

impl EBlockItem {
    fn to_slot(self) -> Hash32 {
        match self {
            EBlockItem::Entry(h) => h,
            EBlockItem::MinuteMarker(m) => {
                let mut b = [0u8; 32];
                b[31] = m;
                Hash32::new(b)
            }
        }
    }

    fn from_slot(slot: Hash32) -> Self {
        let b = slot.as_bytes();
        if b[..31].iter().all(|x| *x == 0) && b[31] <= MAX_MINUTE_MARKER {
            EBlockItem::MinuteMarker(b[31])
        } else {
            EBlockItem::Entry(slot)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryBlock {
    pub chain_id: ChainId,
    pub prev_key_mr: Hash32,
    pub db_height: u32,
    /// Position of this block within its chain, starting at 0.
    pub sequence: u32,
    pub items: Vec<EBlockItem>,
}

impl EntryBlock {
    pub fn new(chain_id: ChainId, prev_key_mr: Hash32, db_height: u32, sequence: u32) -> Self {
        Self {
            chain_id,
            prev_key_mr,
            db_height,
            sequence,
            items: Vec::new(),
        }
    }

    pub fn add_entry(&mut self, entry_hash: Hash32) {
        self.items.push(EBlockItem::Entry(entry_hash));
    }

    pub fn add_minute_marker(&mut self, minute: u8) {
        self.items.push(EBlockItem::MinuteMarker(minute));
    }

    pub fn entry_hashes(&self) -> impl Iterator<Item = Hash32> + '_ {
        self.items.iter().filter_map(|i| match i {
            EBlockItem::Entry(h) => Some(*h),
            EBlockItem::MinuteMarker(_) => None,
        })
    }

    /// Merkle root over the body slots. Indexed as a secondary lookup key.
    pub fn body_hash(&self) -> Hash32 {
        let slots: Vec<Hash32> = self.items.iter().map(|i| i.to_slot()).collect();
        merkle_root(&slots)
    }
}

impl ChainBlock for EntryBlock {
    const KIND: ChainKind = ChainKind::Entry;

    fn marshal(&self) -> Vec<u8> {
        let mut enc = Encoder::with_capacity(EBLOCK_HEADER_LEN + 32 * self.items.len());
        enc.put_hash(&self.chain_id)
            .put_hash(&self.prev_key_mr)
            .put_u32(self.db_height)
            .put_u32(self.sequence)
            .put_u32(self.items.len() as u32);
        for item in &self.items {
            enc.put_hash(&item.to_slot());
        }
        enc.into_bytes()
    }

    fn unmarshal(data: &[u8]) -> Result<Self, CodecError> {
        let mut dec = Decoder::new(data);
        let chain_id = dec.hash("chain_id")?;
        let prev_key_mr = dec.hash("prev_key_mr")?;
        let db_height = dec.u32("db_height")?;
        let sequence = dec.u32("sequence")?;
        let count = dec.u32("item_count")? as usize;
        dec.expect_exact(count, 32, "eblock items")?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(EBlockItem::from_slot(dec.hash("item")?));
        }
        dec.finish("entry block")?;
        Ok(Self {
            chain_id,
            prev_key_mr,
            db_height,
            sequence,
            items,
        })
    }

    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    fn prev_key_mr(&self) -> Hash32 {
        self.prev_key_mr
    }

    fn db_height(&self) -> u32 {
        self.db_height
    }

    /// Entry blocks are indexed by `chain_id ‖ sequence`.
    fn index_key(&self) -> Vec<u8> {
        eblock_index_key(&self.chain_id, self.sequence)
    }

    fn body_index(&self) -> Option<Hash32> {
        Some(self.body_hash())
    }
}

pub fn eblock_index_key(chain_id: &ChainId, sequence: u32) -> Vec<u8> {
    let mut key = Vec::with_capacity(36);
    key.extend_from_slice(chain_id.as_bytes());
    key.extend_from_slice(&sequence.to_be_bytes());
    key
}
