//! Chain kinds and the fixed chain ids of the system chains.

use serde::{Deserialize, Serialize};

use crate::Hash32;

const fn system_chain(last: u8) -> Hash32 {
    let mut bytes = [0u8; 32];
    bytes[31] = last;
    Hash32::new(bytes)
}

pub const ADMIN_CHAIN_ID: Hash32 = system_chain(0x0a);
pub const EC_CHAIN_ID: Hash32 = system_chain(0x0c);
pub const DIRECTORY_CHAIN_ID: Hash32 = system_chain(0x0d);
pub const FACTOID_CHAIN_ID: Hash32 = system_chain(0x0f);

/// Whether `chain_id` names one of the system chains, which never carry
/// user entries.
pub fn is_system_chain(chain_id: &Hash32) -> bool {
    [ADMIN_CHAIN_ID, EC_CHAIN_ID, DIRECTORY_CHAIN_ID, FACTOID_CHAIN_ID].contains(chain_id)
}

/// The kinds of block chain persisted by a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainKind {
    Directory,
    Admin,
    EntryCredit,
    Factoid,
    Entry,
}

impl ChainKind {
    pub const ALL: [ChainKind; 5] = [
        ChainKind::Directory,
        ChainKind::Admin,
        ChainKind::EntryCredit,
        ChainKind::Factoid,
        ChainKind::Entry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::Admin => "admin",
            Self::EntryCredit => "entry_credit",
            Self::Factoid => "factoid",
            Self::Entry => "entry",
        }
    }

    /// Fixed chain id for the system chains; `None` for user entry chains.
    pub fn system_chain_id(&self) -> Option<Hash32> {
        match self {
            Self::Directory => Some(DIRECTORY_CHAIN_ID),
            Self::Admin => Some(ADMIN_CHAIN_ID),
            Self::EntryCredit => Some(EC_CHAIN_ID),
            Self::Factoid => Some(FACTOID_CHAIN_ID),
            Self::Entry => None,
        }
    }
}
