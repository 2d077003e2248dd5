use dirchain_ledger::CodecError;
use dirchain_store::StoreError;
use dirchain_types::{ChainKind, Hash32};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OverlayError {
    /// Nothing stored under the key. Whether that means "not synced yet" or
    /// "corrupt" is the caller's call.
    #[error("not found: {0}")]
    NotFound(String),

    /// Stored bytes hash to something other than the key they sit under.
    #[error("integrity violation in {kind:?}: stored under {key}, content hashes to {actual}")]
    IntegrityViolation {
        kind: ChainKind,
        key: Hash32,
        actual: Hash32,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("store error: {0}")]
    Store(StoreError),

    /// The directory chain does not link back to genesis as expected.
    #[error("broken directory chain: {0}")]
    BrokenChain(String),
}

impl OverlayError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<StoreError> for OverlayError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(k) => OverlayError::NotFound(k),
            other => OverlayError::Store(other),
        }
    }
}
