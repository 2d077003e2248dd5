//! The content store contract.

use std::sync::Arc;

use dirchain_types::Hash32;

use crate::{StoreError, WriteBatch};

/// A bucketed key-value store with primary and secondary index support.
///
/// Buckets are independent key spaces named by short strings. A secondary
/// index is an ordinary bucket whose values are 32-byte primary keys.
pub trait ContentStore: Send + Sync {
    fn put(&self, bucket: &str, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Fails with [`StoreError::NotFound`] when the key is absent.
    fn get(&self, bucket: &str, key: &[u8]) -> Result<Vec<u8>, StoreError>;

    fn delete(&self, bucket: &str, key: &[u8]) -> Result<(), StoreError>;

    /// All keys of `bucket` in ascending byte order.
    fn keys(&self, bucket: &str) -> Result<Vec<Vec<u8>>, StoreError>;

    /// Apply every operation of `batch` atomically.
    fn write_batch(&self, batch: WriteBatch) -> Result<(), StoreError>;

    /// Flush and release the backend. Every later call fails with
    /// [`StoreError::Closed`].
    fn close(&self) -> Result<(), StoreError>;

    fn exists(&self, bucket: &str, key: &[u8]) -> Result<bool, StoreError> {
        match self.get(bucket, key) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn index_put(&self, index_bucket: &str, secondary_key: &[u8], primary: &Hash32) -> Result<(), StoreError> {
        self.put(index_bucket, secondary_key, primary.as_bytes())
    }

    fn index_get(&self, index_bucket: &str, secondary_key: &[u8]) -> Result<Hash32, StoreError> {
        let raw = self.get(index_bucket, secondary_key)?;
        Hash32::from_slice(&raw).map_err(|e| {
            StoreError::Corruption(format!("index {index_bucket}: {e}"))
        })
    }
}

impl<T: ContentStore + ?Sized> ContentStore for Arc<T> {
    fn put(&self, bucket: &str, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        (**self).put(bucket, key, value)
    }

    fn get(&self, bucket: &str, key: &[u8]) -> Result<Vec<u8>, StoreError> {
        (**self).get(bucket, key)
    }

    fn delete(&self, bucket: &str, key: &[u8]) -> Result<(), StoreError> {
        (**self).delete(bucket, key)
    }

    fn keys(&self, bucket: &str) -> Result<Vec<Vec<u8>>, StoreError> {
        (**self).keys(bucket)
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<(), StoreError> {
        (**self).write_batch(batch)
    }

    fn close(&self) -> Result<(), StoreError> {
        (**self).close()
    }
}
