//! Composite keys: every bucket shares one LMDB database, and a record's
//! LMDB key is `bucket_len u16 | bucket | key`.

use crate::LmdbError;

pub(crate) fn bucket_prefix(bucket: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + bucket.len());
    out.extend_from_slice(&(bucket.len() as u16).to_be_bytes());
    out.extend_from_slice(bucket.as_bytes());
    out
}

pub(crate) fn composite_key(bucket: &str, key: &[u8]) -> Vec<u8> {
    let mut out = bucket_prefix(bucket);
    out.extend_from_slice(key);
    out
}

/// Split a composite key back into bucket name and record key.
pub(crate) fn split_key(raw: &[u8]) -> Result<(&str, &[u8]), LmdbError> {
    if raw.len() < 2 {
        return Err(LmdbError::Corruption(format!("composite key of {} bytes", raw.len())));
    }
    let len = u16::from_be_bytes([raw[0], raw[1]]) as usize;
    let rest = &raw[2..];
    if rest.len() < len {
        return Err(LmdbError::Corruption(format!(
            "bucket length {len} exceeds key of {} bytes",
            raw.len()
        )));
    }
    let bucket = std::str::from_utf8(&rest[..len])
        .map_err(|e| LmdbError::Corruption(format!("bucket name: {e}")))?;
    Ok((bucket, &rest[len..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_inverts_composite() {
        let raw = composite_key("dblock", b"\x01\x02");
        let (bucket, key) = split_key(&raw).unwrap();
        assert_eq!(bucket, "dblock");
        assert_eq!(key, b"\x01\x02");
    }

    #[test]
    fn prefixes_do_not_collide() {
        // "ab" + "c..." must not look like a key of bucket "abc".
        let a = composite_key("ab", b"c");
        assert!(!a.starts_with(&bucket_prefix("abc")));
    }

    #[test]
    fn short_key_is_corruption() {
        assert!(split_key(&[0]).is_err());
        assert!(split_key(&[0, 9, b'a']).is_err());
    }
}
