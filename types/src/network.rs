//! Network identifier.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::TypesError;

/// Identifies which network a node participates in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    /// The production network.
    Main,
    /// The public test network.
    Test,
    /// Local single-machine network.
    Local,
}

impl NetworkId {
    /// 4-byte magic written into directory block headers and message headers.
    pub fn magic(&self) -> u32 {
        match self {
            Self::Main => 0xFA92_E5A2,
            Self::Test => 0xFA92_E5A3,
            Self::Local => 0xFA92_E5A4,
        }
    }

    pub fn from_magic(magic: u32) -> Option<Self> {
        match magic {
            0xFA92_E5A2 => Some(Self::Main),
            0xFA92_E5A3 => Some(Self::Test),
            0xFA92_E5A4 => Some(Self::Local),
            _ => None,
        }
    }

    /// Human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Test => "test",
            Self::Local => "local",
        }
    }
}

impl FromStr for NetworkId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "main" | "mainnet" => Ok(Self::Main),
            "test" | "testnet" => Ok(Self::Test),
            "local" | "localnet" => Ok(Self::Local),
            other => Err(TypesError::UnknownNetwork(other.to_string())),
        }
    }
}
