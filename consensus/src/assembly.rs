//! Turning an ordered message sequence into the sub-blocks of one height.

use std::collections::HashMap;

use dirchain_ledger::{
    AdminBlock, AdminEntry, ChainBlock, DBEntry, DirectoryBlock, EcEntry, Entry, EntryBlock,
    EntryCreditBlock, FactoidBlock, FactoidTransaction,
};
use dirchain_messages::{Message, MessageBody};
use dirchain_types::{
    is_system_chain, ChainId, ChainKind, Hash32, ADMIN_CHAIN_ID, EC_CHAIN_ID, FACTOID_CHAIN_ID,
};

use crate::ConsensusError;

/// Where each chain currently ends, so new blocks can link to it.
pub trait ChainTips {
    /// KeyMR of the latest block of a system chain, zero if the chain is empty.
    fn prev_key_mr(&self, kind: ChainKind) -> Result<Hash32, ConsensusError>;

    /// KeyMR and sequence of the latest entry block of `chain_id`, if any.
    fn eblock_tip(&self, chain_id: &ChainId) -> Result<Option<(Hash32, u32)>, ConsensusError>;
}

/// The sub-blocks produced by sealing one height.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubBlocks {
    pub db_height: u32,
    pub admin: AdminBlock,
    pub entry_credit: EntryCreditBlock,
    pub factoid: FactoidBlock,
    /// In order of first appearance of their chain in the message sequence.
    pub entry_blocks: Vec<EntryBlock>,
    pub entries: Vec<Entry>,
}

impl SubBlocks {
    /// Directory entries: admin, entry credit, factoid, then entry blocks.
    pub fn directory_entries(&self) -> Vec<DBEntry> {
        let mut out = vec![
            DBEntry::new(ADMIN_CHAIN_ID, self.admin.key_mr()),
            DBEntry::new(EC_CHAIN_ID, self.entry_credit.key_mr()),
            DBEntry::new(FACTOID_CHAIN_ID, self.factoid.key_mr()),
        ];
        out.extend(
            self.entry_blocks
                .iter()
                .map(|eb| DBEntry::new(eb.chain_id, eb.key_mr())),
        );
        out
    }

    /// Full encodings of every sub-block, in directory-entry order.
    pub fn bodies(&self) -> Vec<Vec<u8>> {
        let mut out = vec![
            self.admin.marshal(),
            self.entry_credit.marshal(),
            self.factoid.marshal(),
        ];
        out.extend(self.entry_blocks.iter().map(ChainBlock::marshal));
        out
    }

    pub fn directory_block(
        &self,
        version: u8,
        network_id: u32,
        prev_key_mr: Hash32,
        prev_ledger_key_mr: Hash32,
        timestamp_minutes: u32,
    ) -> DirectoryBlock {
        DirectoryBlock::new(
            version,
            network_id,
            prev_key_mr,
            prev_ledger_key_mr,
            timestamp_minutes,
            self.db_height,
            self.directory_entries(),
        )
    }
}

/// Assemble `messages` in their given order. Only the first end-of-minute
/// message for each minute produces minute markers.
pub(crate) fn assemble(
    db_height: u32,
    messages: &[Message],
    tips: &dyn ChainTips,
) -> Result<SubBlocks, ConsensusError> {
    let mut admin = AdminBlock::new(tips.prev_key_mr(ChainKind::Admin)?, db_height);
    let mut ec = EntryCreditBlock::new(tips.prev_key_mr(ChainKind::EntryCredit)?, db_height);
    let mut factoid = FactoidBlock::new(tips.prev_key_mr(ChainKind::Factoid)?, db_height);
    let mut eblocks: Vec<EntryBlock> = Vec::new();
    let mut eblock_pos: HashMap<ChainId, usize> = HashMap::new();
    let mut entries = Vec::new();
    let mut last_marker = 0u8;

    for msg in messages {
        match &msg.body {
            MessageBody::EndOfMinute { minute, .. } => {
                if *minute <= last_marker {
                    continue;
                }
                last_marker = *minute;
                admin.add_entry(AdminEntry::MinuteMarker(*minute));
                ec.add_entry(EcEntry::MinuteMarker(*minute));
                for eb in &mut eblocks {
                    eb.add_minute_marker(*minute);
                }
            }
            MessageBody::DirectoryBlockSignature { .. } => {
                if let Some(signature) = &msg.signature {
                    admin.add_entry(AdminEntry::DirectoryBlockSignature {
                        identity: msg.origin(),
                        signature: signature.clone(),
                    });
                }
            }
            MessageBody::AddServer { db_height, server } => {
                admin.add_entry(AdminEntry::AddFederatedServer {
                    identity: *server,
                    db_height: *db_height,
                });
            }
            MessageBody::CommitEntry {
                entry_hash,
                credits,
            } => {
                ec.add_entry(EcEntry::Commit {
                    timestamp: msg.timestamp().as_millis(),
                    entry_hash: *entry_hash,
                    credits: *credits,
                });
            }
            MessageBody::RevealEntry { chain_id, content } => {
                if is_system_chain(chain_id) {
                    return Err(ConsensusError::SystemChainReveal(*chain_id));
                }
                let entry = Entry::new(*chain_id, content.clone());
                let pos = match eblock_pos.get(chain_id) {
                    Some(pos) => *pos,
                    None => {
                        let (prev, sequence) = match tips.eblock_tip(chain_id)? {
                            Some((key_mr, seq)) => {
                                let next = seq.checked_add(1).ok_or_else(|| {
                                    ConsensusError::ChainTips(format!(
                                        "entry chain {chain_id} has no sequence after {seq}"
                                    ))
                                })?;
                                (key_mr, next)
                            }
                            None => (Hash32::ZERO, 0),
                        };
                        eblocks.push(EntryBlock::new(*chain_id, prev, db_height, sequence));
                        eblock_pos.insert(*chain_id, eblocks.len() - 1);
                        eblocks.len() - 1
                    }
                };
                eblocks[pos].add_entry(entry.hash());
                entries.push(entry);
            }
            MessageBody::FactoidTransaction { raw } => {
                factoid.add_transaction(FactoidTransaction::new(raw.clone()));
            }
            MessageBody::Ack { .. } => {}
        }
    }

    Ok(SubBlocks {
        db_height,
        admin,
        entry_credit: ec,
        factoid,
        entry_blocks: eblocks,
        entries,
    })
}
