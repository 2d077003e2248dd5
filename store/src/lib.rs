//! Content store contract for dirchain.
//!
//! Every storage backend (LMDB, in-memory for testing) implements
//! [`ContentStore`]. The rest of the codebase depends only on the trait.

pub mod batch;
pub mod content;
pub mod error;

pub use batch::{BatchOp, WriteBatch};
pub use content::ContentStore;
pub use error::StoreError;
