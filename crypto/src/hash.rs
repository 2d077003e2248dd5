//! SHA-256 hashing for blocks, entries and identities.

use dirchain_types::{Hash32, IdentityChainId, PublicKey};
use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of arbitrary data.
pub fn sha256(data: &[u8]) -> Hash32 {
    let result = Sha256::digest(data);
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    Hash32::new(output)
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn sha256_multi(parts: &[&[u8]]) -> Hash32 {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    Hash32::new(output)
}

/// Double SHA-256: `sha256(sha256(data))`. Every block's content hash (KeyMR)
/// is the double hash of its canonical encoding.
pub fn sha256d(data: &[u8]) -> Hash32 {
    let first = sha256(data);
    sha256(first.as_bytes())
}

/// Identity chain id of a server key.
pub fn identity_from_public_key(public_key: &PublicKey) -> IdentityChainId {
    sha256d(public_key.as_bytes())
}

/// Binary Merkle root over `leaves`.
///
/// Each level pairs adjacent nodes as `sha256(left || right)`; an odd node
/// is paired with itself. An empty list yields [`Hash32::ZERO`], a single leaf
/// is its own root.
pub fn merkle_root(leaves: &[Hash32]) -> Hash32 {
    if leaves.is_empty() {
        return Hash32::ZERO;
    }
    let mut level: Vec<Hash32> = leaves.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let left = pair[0];
                let right = pair.get(1).copied().unwrap_or(left);
                sha256_multi(&[left.as_bytes(), right.as_bytes()])
            })
            .collect();
    }
    level[0]
}
