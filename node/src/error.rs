use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("overlay error: {0}")]
    Overlay(#[from] dirchain_overlay::OverlayError),

    #[error("consensus error: {0}")]
    Consensus(#[from] dirchain_consensus::ConsensusError),

    #[error("message error: {0}")]
    Message(#[from] dirchain_messages::MessageError),

    #[error("codec error: {0}")]
    Codec(#[from] dirchain_ledger::CodecError),

    #[error("store error: {0}")]
    Store(#[from] dirchain_store::StoreError),

    #[error("LMDB error: {0}")]
    Lmdb(#[from] dirchain_store_lmdb::LmdbError),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("journal error: {0}")]
    Journal(String),

    /// A signed control message was needed but the node has no identity key.
    #[error("node has no signing key")]
    NoSigningKey,

    #[error("background task failed: {0}")]
    Task(String),

    #[error("node already started")]
    AlreadyStarted,
}
