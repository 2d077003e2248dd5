//! Porting a remote dirchain into a local database overlay.
//!
//! - [`source`]: the [`RawSource`] seam and the HTTP [`ApiClient`].
//! - [`retry`]: bounded exponential backoff for transient failures.
//! - [`fetch`]: typed fetches that verify every content hash.
//! - [`porter`]: chain walking and batched saves.

pub mod error;
pub mod fetch;
pub mod porter;
pub mod retry;
pub mod source;

pub use error::PorterError;
pub use fetch::Fetcher;
pub use porter::{PortReport, Porter};
pub use retry::RetryPolicy;
pub use source::{parse_head, parse_raw_data, ApiClient, RawSource};
