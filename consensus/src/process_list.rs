//! The per-height ordered accumulation of consensus messages.

use std::collections::BTreeMap;

use dirchain_messages::{Message, MessageBody};
use dirchain_types::{Hash32, IdentityChainId};

use crate::assembly::{assemble, ChainTips, SubBlocks};
use crate::ConsensusError;

#[derive(Clone, Debug)]
pub struct ProcessList {
    db_height: u32,
    /// Insertion order is kept; it is the server ordering for this height.
    fed_servers: Vec<IdentityChainId>,
    messages: Vec<Message>,
    /// Acknowledged message hashes by serial number.
    acks: BTreeMap<u32, Hash32>,
    /// Highest minute closed by an end-of-minute message.
    minute: u8,
    sealed: bool,
}

impl ProcessList {
    pub fn new(db_height: u32, fed_servers: Vec<IdentityChainId>) -> Self {
        let mut list = Self {
            db_height,
            fed_servers: Vec::with_capacity(fed_servers.len()),
            messages: Vec::new(),
            acks: BTreeMap::new(),
            minute: 0,
            sealed: false,
        };
        for id in fed_servers {
            list.add_fed_server(id);
        }
        list
    }

    pub fn db_height(&self) -> u32 {
        self.db_height
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn fed_servers(&self) -> &[IdentityChainId] {
        &self.fed_servers
    }

    pub fn is_fed_server(&self, identity: &IdentityChainId) -> bool {
        self.fed_servers.contains(identity)
    }

    /// Add a federated server. Adding one already present is a no-op.
    /// Returns whether the set changed.
    pub fn add_fed_server(&mut self, identity: IdentityChainId) -> bool {
        if self.is_fed_server(&identity) {
            return false;
        }
        self.fed_servers.push(identity);
        true
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn append(&mut self, message: Message) -> Result<(), ConsensusError> {
        if self.sealed {
            return Err(ConsensusError::ListSealed(self.db_height));
        }
        if let MessageBody::EndOfMinute { minute, .. } = message.body {
            self.minute = self.minute.max(minute);
        }
        self.messages.push(message);
        Ok(())
    }

    /// Record that `message_hash` holds position `serial`. A later ack for the
    /// same serial replaces the earlier one.
    pub fn record_ack(&mut self, serial: u32, message_hash: Hash32) -> Result<(), ConsensusError> {
        if self.sealed {
            return Err(ConsensusError::ListSealed(self.db_height));
        }
        self.acks.insert(serial, message_hash);
        Ok(())
    }

    pub fn acks(&self) -> &BTreeMap<u32, Hash32> {
        &self.acks
    }

    /// Assemble the sub-blocks of this height from the messages in insertion
    /// order and mark the list sealed.
    ///
    /// If assembly fails the list stays unsealed.
    pub fn seal(&mut self, tips: &dyn ChainTips) -> Result<SubBlocks, ConsensusError> {
        if self.sealed {
            return Err(ConsensusError::AlreadySealed(self.db_height));
        }
        let blocks = assemble(self.db_height, &self.messages, tips)?;
        self.sealed = true;
        tracing::debug!(
            height = self.db_height,
            messages = self.messages.len(),
            entry_blocks = blocks.entry_blocks.len(),
            "process list sealed"
        );
        Ok(blocks)
    }
}
