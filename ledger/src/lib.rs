//! Chain data model for dirchain.
//!
//! Every block kind implements [`ChainBlock`]: a canonical binary encoding, a
//! content hash (KeyMR) computed from that encoding, and the keys under which
//! the block is indexed. The five kinds are:
//!
//! - [`DirectoryBlock`]: one per height, referencing every other sub-block
//! - [`AdminBlock`]: signatures and federated-server changes
//! - [`EntryCreditBlock`]: paid entry commitments
//! - [`FactoidBlock`]: value-transfer transactions
//! - [`EntryBlock`]: user data chains

pub mod admin;
pub mod chain_block;
pub mod codec;
pub mod directory;
pub mod entry;
pub mod entry_credit;
pub mod error;
pub mod factoid;

pub use admin::{AdminBlock, AdminEntry};
pub use chain_block::ChainBlock;
pub use directory::{DBEntry, DirectoryBlock, DirectoryBlockHeader, DBLOCK_HEADER_LEN, DB_ENTRY_LEN};
pub use entry::{eblock_index_key, EBlockItem, Entry, EntryBlock};
pub use entry_credit::{EcEntry, EntryCreditBlock};
pub use error::CodecError;
pub use factoid::{FactoidBlock, FactoidTransaction};
