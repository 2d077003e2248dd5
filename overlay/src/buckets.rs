//! Persistent layout.
//!
//! | bucket | key | value |
//! |---|---|---|
//! | one per chain kind | KeyMR | block bytes |
//! | `<kind>_index` | height, or `chain_id ‖ sequence` for entry blocks | KeyMR |
//! | `head` | chain id | KeyMR of the chain head |
//! | `ledger_index` | ledger KeyMR | directory block KeyMR |
//! | `eblock_body_index` | entry block body hash | KeyMR |
//! | `entry` | entry hash | entry bytes |

use dirchain_types::{ChainId, ChainKind};

pub const HEAD: &str = "head";
pub const LEDGER_INDEX: &str = "ledger_index";
pub const EBLOCK_BODY_INDEX: &str = "eblock_body_index";
pub const ENTRY: &str = "entry";

pub fn blocks(kind: ChainKind) -> &'static str {
    match kind {
        ChainKind::Directory => "dblock",
        ChainKind::Admin => "ablock",
        ChainKind::EntryCredit => "ecblock",
        ChainKind::Factoid => "fblock",
        ChainKind::Entry => "eblock",
    }
}

pub fn index(kind: ChainKind) -> &'static str {
    match kind {
        ChainKind::Directory => "dblock_index",
        ChainKind::Admin => "ablock_index",
        ChainKind::EntryCredit => "ecblock_index",
        ChainKind::Factoid => "fblock_index",
        ChainKind::Entry => "eblock_index",
    }
}

/// Which block kind a directory entry's chain id refers to.
pub fn kind_of_chain(chain_id: &ChainId) -> ChainKind {
    ChainKind::ALL
        .into_iter()
        .find(|k| k.system_chain_id().as_ref() == Some(chain_id))
        .unwrap_or(ChainKind::Entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirchain_types::{Hash32, ADMIN_CHAIN_ID, FACTOID_CHAIN_ID};

    #[test]
    fn system_chains_map_to_their_kind() {
        assert_eq!(kind_of_chain(&ADMIN_CHAIN_ID), ChainKind::Admin);
        assert_eq!(kind_of_chain(&FACTOID_CHAIN_ID), ChainKind::Factoid);
        assert_eq!(kind_of_chain(&Hash32::new([5; 32])), ChainKind::Entry);
    }

    #[test]
    fn bucket_names_are_distinct() {
        let mut names: Vec<&str> = ChainKind::ALL
            .iter()
            .flat_map(|k| [blocks(*k), index(*k)])
            .collect();
        names.extend([HEAD, LEDGER_INDEX, EBLOCK_BODY_INDEX, ENTRY]);
        let before = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), before);
    }
}
