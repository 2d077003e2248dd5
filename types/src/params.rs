//! Protocol parameters shared by every node of a network.

use serde::{Deserialize, Serialize};

/// Timing parameters of the block-building protocol.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParams {
    /// Minute number whose End-Of-Minute closes a height. Minutes run `1..=last_minute`.
    ///
    /// This is a network constant and must match the live network.
    pub last_minute: u8,

    /// Wall-clock length of one minute period, in milliseconds.
    pub minute_duration_ms: u64,

    /// Directory block header version written by this node.
    pub block_version: u8,
}

impl ProtocolParams {
    pub const DEFAULT_LAST_MINUTE: u8 = 10;

    /// Production defaults: ten one-minute periods per height.
    pub fn mainnet_defaults() -> Self {
        Self {
            last_minute: Self::DEFAULT_LAST_MINUTE,
            minute_duration_ms: 60_000,
            block_version: 0,
        }
    }

    /// Fast timing for local development networks.
    pub fn local_defaults() -> Self {
        Self {
            minute_duration_ms: 1_000,
            ..Self::mainnet_defaults()
        }
    }

    /// Wall-clock duration of a full height.
    pub fn block_duration_ms(&self) -> u64 {
        self.minute_duration_ms * u64::from(self.last_minute)
    }
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self::mainnet_defaults()
    }
}
