//! Fundamental types for the dirchain network.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! hashes and identity chain ids, keys and signatures, timestamps, network ids,
//! chain kinds, and protocol parameters.

pub mod chain;
pub mod error;
pub mod hash;
pub mod keys;
pub mod network;
pub mod params;
pub mod time;

pub use chain::{is_system_chain, ChainKind, ADMIN_CHAIN_ID, DIRECTORY_CHAIN_ID, EC_CHAIN_ID, FACTOID_CHAIN_ID};
pub use error::TypesError;
pub use hash::{ChainId, Hash32, IdentityChainId};
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature, SignatureScheme, SIGNATURE_LENGTH};
pub use network::NetworkId;
pub use params::ProtocolParams;
pub use time::{Clock, SystemClock, Timestamp};
