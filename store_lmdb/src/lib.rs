//! LMDB storage backend for dirchain.
//!
//! Implements [`dirchain_store::ContentStore`] using the `heed` LMDB
//! bindings. All buckets share a single LMDB database; a small `meta`
//! database records the schema version.

pub mod environment;
pub mod error;
pub mod integrity;
mod keys;

pub use environment::{LmdbStore, CURRENT_SCHEMA_VERSION, DEFAULT_MAP_SIZE};
pub use error::LmdbError;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
