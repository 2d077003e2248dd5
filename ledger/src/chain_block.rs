//! The contract every persisted block kind satisfies.

use dirchain_crypto::sha256d;
use dirchain_types::{ChainId, ChainKind, Hash32};

use crate::CodecError;

/// A content-addressed block that is one link of a hash chain.
///
/// `marshal` must be canonical: the same logical block always yields the same
/// bytes, and `unmarshal(marshal(b))` re-marshals to identical bytes.
pub trait ChainBlock: Sized + Clone + std::fmt::Debug {
    const KIND: ChainKind;

    fn marshal(&self) -> Vec<u8>;

    fn unmarshal(data: &[u8]) -> Result<Self, CodecError>;

    fn chain_id(&self) -> ChainId;

    /// KeyMR of the previous block in the same chain, [`Hash32::ZERO`] for the first.
    fn prev_key_mr(&self) -> Hash32;

    fn db_height(&self) -> u32;

    /// Content hash: double SHA-256 of the canonical encoding. Never stored on
    /// the block; always recomputed.
    fn key_mr(&self) -> Hash32 {
        sha256d(&self.marshal())
    }

    /// Secondary-index key resolving to this block's KeyMR.
    fn index_key(&self) -> Vec<u8> {
        self.db_height().to_be_bytes().to_vec()
    }

    /// Key of the head pointer for this block's chain.
    fn head_key(&self) -> Vec<u8> {
        self.chain_id().as_bytes().to_vec()
    }

    /// Extra lookup hash indexed alongside the primary key, for kinds that
    /// have one.
    fn body_index(&self) -> Option<Hash32> {
        None
    }
}
