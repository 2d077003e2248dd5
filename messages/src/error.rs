use dirchain_ledger::CodecError;
use dirchain_types::{ChainId, IdentityChainId};
use thiserror::Error;

use crate::MessageType;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MessageError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("{0:?} message carries no signature")]
    MissingSignature(MessageType),

    #[error("signature verification failed: {0}")]
    VerificationFailure(String),

    #[error("origin {0} is not a federated server")]
    Unauthorized(IdentityChainId),

    #[error("entry revealed on system chain {0}")]
    SystemChainReveal(ChainId),
}
