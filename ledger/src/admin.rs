//! Admin blocks: per-height administrative record, carrying directory block
//! signatures and federated-server changes.

use dirchain_types::{ChainId, ChainKind, Hash32, IdentityChainId, Signature, ADMIN_CHAIN_ID};
use serde::{Deserialize, Serialize};

use crate::codec::{Decoder, Encoder};
use crate::{ChainBlock, CodecError};

const TAG_MINUTE: u8 = 0x00;
const TAG_DBSIG: u8 = 0x01;
const TAG_ADD_FED: u8 = 0x02;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminEntry {
    /// Marks the end of a minute inside the block body.
    MinuteMarker(u8),
    /// A federated server's signature over the previous directory block.
    DirectoryBlockSignature {
        identity: IdentityChainId,
        signature: Signature,
    },
    AddFederatedServer {
        identity: IdentityChainId,
        db_height: u32,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminBlock {
    pub prev_key_mr: Hash32,
    pub db_height: u32,
    pub entries: Vec<AdminEntry>,
}

impl AdminBlock {
    pub fn new(prev_key_mr: Hash32, db_height: u32) -> Self {
        Self {
            prev_key_mr,
            db_height,
            entries: Vec::new(),
        }
    }

    pub fn add_entry(&mut self, entry: AdminEntry) {
        self.entries.push(entry);
    }
}

impl ChainBlock for AdminBlock {
    const KIND: ChainKind = ChainKind::Admin;

    fn marshal(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        enc.put_hash(&ADMIN_CHAIN_ID)
            .put_hash(&self.prev_key_mr)
            .put_u32(self.db_height)
            .put_u32(self.entries.len() as u32);
        for entry in &self.entries {
            match entry {
                AdminEntry::MinuteMarker(m) => {
                    enc.put_u8(TAG_MINUTE).put_u8(*m);
                }
                AdminEntry::DirectoryBlockSignature {
                    identity,
                    signature,
                } => {
                    enc.put_u8(TAG_DBSIG)
                        .put_hash(identity)
                        .put_signature(signature);
                }
                AdminEntry::AddFederatedServer {
                    identity,
                    db_height,
                } => {
                    enc.put_u8(TAG_ADD_FED).put_hash(identity).put_u32(*db_height);
                }
            }
        }
        enc.into_bytes()
    }

    fn unmarshal(data: &[u8]) -> Result<Self, CodecError> {
        let mut dec = Decoder::new(data);
        let chain_id = dec.hash("chain_id")?;
        if chain_id != ADMIN_CHAIN_ID {
            return Err(CodecError::malformed(format!(
                "admin block: unexpected chain id {chain_id}"
            )));
        }
        let prev_key_mr = dec.hash("prev_key_mr")?;
        let db_height = dec.u32("db_height")?;
        let count = dec.u32("entry_count")? as usize;
        let mut entries = Vec::with_capacity(count.min(dec.remaining()));
        for _ in 0..count {
            let entry = match dec.u8("admin entry tag")? {
                TAG_MINUTE => AdminEntry::MinuteMarker(dec.u8("minute")?),
                TAG_DBSIG => AdminEntry::DirectoryBlockSignature {
                    identity: dec.hash("identity")?,
                    signature: dec.signature("signature")?,
                },
                TAG_ADD_FED => AdminEntry::AddFederatedServer {
                    identity: dec.hash("identity")?,
                    db_height: dec.u32("db_height")?,
                },
                other => {
                    return Err(CodecError::malformed(format!(
                        "admin block: unknown entry tag {other:#04x}"
                    )))
                }
            };
            entries.push(entry);
        }
        dec.finish("admin block")?;
        Ok(Self {
            prev_key_mr,
            db_height,
            entries,
        })
    }

    fn chain_id(&self) -> ChainId {
        ADMIN_CHAIN_ID
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
    use dirchain_types::PublicKey;

    #[test]
    fn round_trip_with_every_entry_kind() {
        let mut block = AdminBlock::new(Hash32::new([4; 32]), 12);
        block.add_entry(AdminEntry::DirectoryBlockSignature {
            identity: Hash32::new([1; 32]),
            signature: Signature::new(PublicKey([2; 32]), [3; 64]),
        });
        block.add_entry(AdminEntry::AddFederatedServer {
            identity: Hash32::new([5; 32]),
            db_height: 13,
        });
        block.add_entry(AdminEntry::MinuteMarker(1));

        let bytes = block.marshal();
        let back = AdminBlock::unmarshal(&bytes).unwrap();
        assert_eq!(back, block);
        assert_eq!(back.key_mr(), block.key_mr());
    }

    #[test]
    fn wrong_chain_id_rejected() {
        let mut bytes = AdminBlock::new(Hash32::ZERO, 0).marshal();
        bytes[31] = 0x0b;
        assert!(AdminBlock::unmarshal(&bytes).is_err());
    }

    #[test]
    fn unknown_tag_rejected() {
        let mut block = AdminBlock::new(Hash32::ZERO, 0);
        block.add_entry(AdminEntry::MinuteMarker(2));
        let mut bytes = block.marshal();
        let tag_at = bytes.len() - 2;
        bytes[tag_at] = 0x7f;
        assert!(AdminBlock::unmarshal(&bytes).is_err());
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut bytes = AdminBlock::new(Hash32::ZERO, 0).marshal();
        bytes.push(0);
        assert!(AdminBlock::unmarshal(&bytes).is_err());
    }
}
