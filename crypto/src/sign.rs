//! Ed25519 payload signing and verification.

use dirchain_types::{KeyPair, PublicKey, Signature};
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};

/// Sign a payload, producing a signature bound to the signer's public key.
pub fn sign_payload(payload: &[u8], keypair: &KeyPair) -> Signature {
    let signing_key = SigningKey::from_bytes(&keypair.private.0);
    let sig = signing_key.sign(payload);
    Signature::new(keypair.public, sig.to_bytes())
}

/// Verify `signature` over `payload` against `public_key`.
///
/// Returns `false` (never panics) on any mismatch: a signature produced by a
/// different key than `public_key`, an unparsable key, or a bad signature.
pub fn verify(payload: &[u8], signature: &Signature, public_key: &PublicKey) -> bool {
    if signature.public_key != *public_key {
        return false;
    }
    let Ok(verifying_key) = VerifyingKey::from_bytes(&public_key.0) else {
        return false;
    };
    let dalek_sig = ed25519_dalek::Signature::from_bytes(signature.bytes());
    verifying_key.verify(payload, &dalek_sig).is_ok()
}

/// Verify a signature against the public key it carries.
pub fn verify_signature(payload: &[u8], signature: &Signature) -> bool {
    verify(payload, signature, &signature.public_key)
}
