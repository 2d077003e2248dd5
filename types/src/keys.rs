//! Key material and the single-slot signature carried by block-sealing messages.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::TypesError;

/// Length in bytes of a raw Ed25519 signature.
pub const SIGNATURE_LENGTH: usize = 64;

/// A 32-byte Ed25519 public key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 32]);

/// A 32-byte Ed25519 private key (seed).
///
/// Does not implement `Debug`, `Serialize` or `Clone`. Key bytes are zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey(pub [u8; 32]);

/// An Ed25519 key pair (public + private).
///
/// Use `dirchain_crypto::keypair_from_seed()` or `dirchain_crypto::generate_keypair()`
/// to construct key pairs.
pub struct KeyPair {
    pub public: PublicKey,
    pub private: PrivateKey,
}

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Signature scheme tag. Only one scheme exists today; the tag still takes part
/// in equality so a future scheme can never compare equal to an Ed25519 signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureScheme {
    Ed25519,
}

/// A signature bound to the public key that produced it.
///
/// There is exactly one signature slot; multi-signature aggregation is not
/// supported, so no index is kept.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub scheme: SignatureScheme,
    pub public_key: PublicKey,
    #[serde(with = "signature_bytes")]
    bytes: [u8; SIGNATURE_LENGTH],
}

impl Signature {
    pub fn new(public_key: PublicKey, bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self {
            scheme: SignatureScheme::Ed25519,
            public_key,
            bytes,
        }
    }

    /// Replace the raw signature bytes. Fails unless `raw` is exactly
    /// [`SIGNATURE_LENGTH`] bytes long.
    pub fn set_signature(&mut self, raw: &[u8]) -> Result<(), TypesError> {
        if raw.len() != SIGNATURE_LENGTH {
            return Err(TypesError::InvalidLength {
                expected: SIGNATURE_LENGTH,
                actual: raw.len(),
            });
        }
        self.bytes.copy_from_slice(raw);
        Ok(())
    }

    pub fn bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.bytes
    }
}

mod signature_bytes {
    use super::SIGNATURE_LENGTH;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &[u8; SIGNATURE_LENGTH],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<[u8; SIGNATURE_LENGTH], D::Error> {
        struct SigVisitor;

        impl<'de> serde::de::Visitor<'de> for SigVisitor {
            type Value = [u8; SIGNATURE_LENGTH];

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{} bytes", SIGNATURE_LENGTH)
            }

            fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                v.try_into()
                    .map_err(|_| E::invalid_length(v.len(), &self))
            }

            fn visit_seq<A: serde::de::SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> Result<Self::Value, A::Error> {
                let mut arr = [0u8; SIGNATURE_LENGTH];
                for (i, byte) in arr.iter_mut().enumerate() {
                    *byte = seq
                        .next_element()?
                        .ok_or_else(|| serde::de::Error::invalid_length(i, &self))?;
                }
                Ok(arr)
            }
        }

        deserializer.deserialize_bytes(SigVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_signature_rejects_wrong_length() {
        let mut sig = Signature::new(PublicKey([1; 32]), [0; SIGNATURE_LENGTH]);
        let err = sig.set_signature(&[7u8; 63]).unwrap_err();
        assert_eq!(
            err,
            TypesError::InvalidLength {
                expected: 64,
                actual: 63
            }
        );
        assert_eq!(sig.bytes(), &[0; SIGNATURE_LENGTH]);
    }

    #[test]
    fn set_signature_copies_bytes() {
        let mut sig = Signature::new(PublicKey([1; 32]), [0; SIGNATURE_LENGTH]);
        sig.set_signature(&[9u8; 64]).unwrap();
        assert_eq!(sig.bytes(), &[9u8; 64]);
    }

    #[test]
    fn equality_requires_same_identity() {
        let a = Signature::new(PublicKey([1; 32]), [5; SIGNATURE_LENGTH]);
        let b = Signature::new(PublicKey([2; 32]), [5; SIGNATURE_LENGTH]);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn json_round_trip() {
        let sig = Signature::new(PublicKey([3; 32]), [4; SIGNATURE_LENGTH]);
        let json = serde_json::to_string(&sig).unwrap();
        let back: Signature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sig);
    }
}
