//! Process lists for dirchain.
//!
//! A [`ProcessList`] orders the consensus messages of one directory-block
//! height and, once every minute of the height has closed, is sealed into
//! that height's sub-blocks ([`SubBlocks`]). [`ProcessLists`] holds the
//! lists by height and creates them strictly in sequence.
//!
//! - [`process_list`]: per-height message sequence and federated servers.
//! - [`process_list_set`]: height-keyed container.
//! - [`assembly`]: deterministic sub-block assembly and the [`ChainTips`] seam.
//! - [`error`]: invariant violations.

pub mod assembly;
pub mod error;
pub mod process_list;
pub mod process_list_set;

pub use assembly::{ChainTips, SubBlocks};
pub use error::ConsensusError;
pub use process_list::ProcessList;
pub use process_list_set::ProcessLists;
