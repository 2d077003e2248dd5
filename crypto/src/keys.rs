//! Ed25519 key generation and loading.

use dirchain_types::{KeyPair, PrivateKey, PublicKey};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid key hex: {0}")]
    InvalidHex(String),

    #[error("invalid key length: expected 32 or 64 bytes, got {0}")]
    InvalidLength(usize),

    #[error("public half does not match private seed")]
    Mismatch,
}

/// Generate a new Ed25519 key pair from a secure random source.
pub fn generate_keypair() -> KeyPair {
    let signing_key = SigningKey::generate(&mut OsRng);
    keypair_from_seed(&signing_key.to_bytes())
}

/// Derive the public key from a private key.
pub fn public_from_private(private: &PrivateKey) -> PublicKey {
    let signing_key = SigningKey::from_bytes(&private.0);
    PublicKey(signing_key.verifying_key().to_bytes())
}

/// Reconstruct a full key pair from a private key.
pub fn keypair_from_private(private: PrivateKey) -> KeyPair {
    let public = public_from_private(&private);
    KeyPair { public, private }
}

/// Derive a key pair from a 32-byte seed (deterministic).
pub fn keypair_from_seed(seed: &[u8; 32]) -> KeyPair {
    let signing_key = SigningKey::from_bytes(seed);
    KeyPair {
        public: PublicKey(signing_key.verifying_key().to_bytes()),
        private: PrivateKey(signing_key.to_bytes()),
    }
}

/// Load a key pair from hex.
///
/// Accepts either a 32-byte seed or the 64-byte `seed || public` form; in the
/// latter case the public half must match the one derived from the seed.
pub fn keypair_from_hex(s: &str) -> Result<KeyPair, KeyError> {
    let bytes = hex::decode(s.trim()).map_err(|e| KeyError::InvalidHex(e.to_string()))?;
    let (seed, public) = match bytes.len() {
        32 => (&bytes[..], None),
        64 => (&bytes[..32], Some(&bytes[32..])),
        n => return Err(KeyError::InvalidLength(n)),
    };
    let mut arr = [0u8; 32];
    arr.copy_from_slice(seed);
    let kp = keypair_from_seed(&arr);
    if let Some(public) = public {
        if public != kp.public.as_bytes() {
            return Err(KeyError::Mismatch);
        }
    }
    Ok(kp)
}
