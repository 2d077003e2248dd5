//! Cryptographic primitives for dirchain.
//!
//! - **Ed25519** for signing block-sealing messages
//! - **SHA-256** (single and double) for content hashes, KeyMRs and identity ids
//! - Binary **Merkle roots** for directory block bodies

pub mod hash;
pub mod keys;
pub mod sign;

pub use hash::{identity_from_public_key, merkle_root, sha256, sha256_multi, sha256d};
pub use keys::{
    generate_keypair, keypair_from_hex, keypair_from_private, keypair_from_seed,
    public_from_private, KeyError,
};
pub use sign::{sign_payload, verify, verify_signature};
