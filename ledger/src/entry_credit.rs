//! Entry-credit blocks: the per-height record of paid entry commitments.

use dirchain_types::{ChainId, ChainKind, Hash32, EC_CHAIN_ID};
use serde::{Deserialize, Serialize};

use crate::codec::{Decoder, Encoder};
use crate::{ChainBlock, CodecError};

const TAG_MINUTE: u8 = 0x00;
const TAG_COMMIT: u8 = 0x01;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EcEntry {
    MinuteMarker(u8),
    Commit {
        /// Milliseconds since the Unix epoch.
        timestamp: u64,
        entry_hash: Hash32,
        credits: u8,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryCreditBlock {
    pub prev_key_mr: Hash32,
    pub db_height: u32,
    pub entries: Vec<EcEntry>,
}

impl EntryCreditBlock {
    pub fn new(prev_key_mr: Hash32, db_height: u32) -> Self {
        Self {
            prev_key_mr,
            db_height,
            entries: Vec::new(),
        }
    }

    pub fn add_entry(&mut self, entry: EcEntry) {
        self.entries.push(entry);
    }

    /// Sum of credits spent by the commits in this block.
    pub fn credits_spent(&self) -> u64 {
        self.entries
            .iter()
            .map(|e| match e {
                EcEntry::Commit { credits, .. } => u64::from(*credits),
                EcEntry::MinuteMarker(_) => 0,
            })
            .sum()
    }
}

impl ChainBlock for EntryCreditBlock {
    const KIND: ChainKind = ChainKind::EntryCredit;

    fn marshal(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        enc.put_hash(&EC_CHAIN_ID)
            .put_hash(&self.prev_key_mr)
            .put_u32(self.db_height)
            .put_u32(self.entries.len() as u32);
        for entry in &self.entries {
            match entry {
                EcEntry::MinuteMarker(m) => {
                    enc.put_u8(TAG_MINUTE).put_u8(*m);
                }
                EcEntry::Commit {
                    timestamp,
                    entry_hash,
                    credits,
                } => {
                    enc.put_u8(TAG_COMMIT)
                        .put_u64(*timestamp)
                        .put_hash(entry_hash)
                        .put_u8(*credits);
                }
            }
        }
        enc.into_bytes()
    }

    fn unmarshal(data: &[u8]) -> Result<Self, CodecError> {
        let mut dec = Decoder::new(data);
        let chain_id = dec.hash("chain_id")?;
        if chain_id != EC_CHAIN_ID {
            return Err(CodecError::malformed(format!(
                "entry credit block: unexpected chain id {chain_id}"
            )));
        }
        let prev_key_mr = dec.hash("prev_key_mr")?;
        let db_height = dec.u32("db_height")?;
        let count = dec.u32("entry_count")? as usize;
        let mut entries = Vec::with_capacity(count.min(dec.remaining()));
        for _ in 0..count {
            let entry = match dec.u8("ec entry tag")? {
                TAG_MINUTE => EcEntry::MinuteMarker(dec.u8("minute")?),
                TAG_COMMIT => EcEntry::Commit {
                    timestamp: dec.u64("timestamp")?,
                    entry_hash: dec.hash("entry_hash")?,
                    credits: dec.u8("credits")?,
                },
                other => {
                    return Err(CodecError::malformed(format!(
                        "entry credit block: unknown entry tag {other:#04x}"
                    )))
                }
            };
            entries.push(entry);
        }
        dec.finish("entry credit block")?;
        Ok(Self {
            prev_key_mr,
            db_height,
            entries,
        })
    }

    fn chain_id(&self) -> ChainId {
        EC_CHAIN_ID
    }

    fn prev_key_mr(&self) -> Hash32 {
        self.prev_key_mr
    }

    fn db_height(&self) -> u32 {
        self.db_height
    }
}
