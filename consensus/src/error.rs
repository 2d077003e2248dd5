use dirchain_types::ChainId;
use thiserror::Error;

/// Invariant violations inside the consensus core. Each one indicates a
/// logic bug in the caller rather than bad network input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    #[error("process list for height {requested} requested, next creatable height is {next}")]
    OutOfOrderHeight { requested: u32, next: u32 },

    #[error("process list for height {0} is sealed")]
    ListSealed(u32),

    #[error("process list for height {0} was already sealed")]
    AlreadySealed(u32),

    #[error("entry revealed on system chain {0}")]
    SystemChainReveal(ChainId),

    #[error("chain tip lookup failed: {0}")]
    ChainTips(String),
}
