//! Database overlay for dirchain.
//!
//! Persists blocks keyed by their content hash, keeps one head pointer per
//! chain and secondary indices by height (or chain and sequence), and
//! answers chain-traversal queries. Every fetch re-derives the content hash
//! of what it read and refuses data that does not match its key.

pub mod batch;
pub mod buckets;
pub mod error;
pub mod overlay;

pub use batch::OverlayBatch;
pub use error::OverlayError;
pub use overlay::Overlay;
