//! Message kinds and their payload fields.

use dirchain_types::{ChainId, Hash32, IdentityChainId};
use serde::{Deserialize, Serialize};

/// Wire tag of every message kind. The discriminant is the type byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    EndOfMinute = 0,
    Ack = 1,
    DirectoryBlockSignature = 2,
    CommitEntry = 3,
    RevealEntry = 4,
    FactoidTransaction = 5,
    AddServer = 6,
}

impl MessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            0 => Self::EndOfMinute,
            1 => Self::Ack,
            2 => Self::DirectoryBlockSignature,
            3 => Self::CommitEntry,
            4 => Self::RevealEntry,
            5 => Self::FactoidTransaction,
            6 => Self::AddServer,
            _ => return None,
        })
    }

    /// Kinds that seal or alter consensus state must carry a signature from
    /// their origin identity.
    pub fn requires_signature(&self) -> bool {
        matches!(
            self,
            Self::EndOfMinute | Self::Ack | Self::DirectoryBlockSignature | Self::AddServer
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EndOfMinute => "eom",
            Self::Ack => "ack",
            Self::DirectoryBlockSignature => "dbsig",
            Self::CommitEntry => "commit_entry",
            Self::RevealEntry => "reveal_entry",
            Self::FactoidTransaction => "factoid_tx",
            Self::AddServer => "add_server",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageBody {
    EndOfMinute {
        minute: u8,
        db_height: u32,
    },
    /// Acknowledges that `message_hash` holds position `serial` at `db_height`.
    Ack {
        db_height: u32,
        serial: u32,
        message_hash: Hash32,
    },
    DirectoryBlockSignature {
        db_height: u32,
        directory_block_key_mr: Hash32,
    },
    CommitEntry {
        entry_hash: Hash32,
        credits: u8,
    },
    RevealEntry {
        chain_id: ChainId,
        content: Vec<u8>,
    },
    FactoidTransaction {
        raw: Vec<u8>,
    },
    AddServer {
        db_height: u32,
        server: IdentityChainId,
    },
}

impl MessageBody {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::EndOfMinute { .. } => MessageType::EndOfMinute,
            Self::Ack { .. } => MessageType::Ack,
            Self::DirectoryBlockSignature { .. } => MessageType::DirectoryBlockSignature,
            Self::CommitEntry { .. } => MessageType::CommitEntry,
            Self::RevealEntry { .. } => MessageType::RevealEntry,
            Self::FactoidTransaction { .. } => MessageType::FactoidTransaction,
            Self::AddServer { .. } => MessageType::AddServer,
        }
    }

    /// Height the message is addressed to. Entry and transaction traffic is
    /// not height-bound and joins whatever height is current.
    pub fn db_height(&self) -> Option<u32> {
        match self {
            Self::EndOfMinute { db_height, .. }
            | Self::Ack { db_height, .. }
            | Self::DirectoryBlockSignature { db_height, .. }
            | Self::AddServer { db_height, .. } => Some(*db_height),
            Self::CommitEntry { .. } | Self::RevealEntry { .. } | Self::FactoidTransaction { .. } => {
                None
            }
        }
    }
}
