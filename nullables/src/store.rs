//! Thread-safe in-memory content store for tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use dirchain_store::{BatchOp, ContentStore, StoreError, WriteBatch};

type Records = BTreeMap<(String, Vec<u8>), Vec<u8>>;

/// An in-memory content store.
/// Thread-safe for use with tokio's multi-threaded runtime.
#[derive(Default)]
pub struct NullStore {
    records: Mutex<Records>,
    closed: AtomicBool,
    fail_writes: AtomicBool,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, Records> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        self.check_open()?;
        if self.fail_writes.load(Ordering::Acquire) {
            return Err(StoreError::Backend("injected write failure".to_string()));
        }
        Ok(())
    }

    /// Make every subsequent write fail with a backend error until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Release);
    }

    /// Overwrite a record with arbitrary bytes, bypassing every check.
    pub fn tamper(&self, bucket: &str, key: &[u8], value: &[u8]) {
        self.records()
            .insert((bucket.to_string(), key.to_vec()), value.to_vec());
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of records across all buckets.
    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

impl ContentStore for NullStore {
    fn put(&self, bucket: &str, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.check_writable()?;
        self.records()
            .insert((bucket.to_string(), key.to_vec()), value.to_vec());
        Ok(())
    }

    fn get(&self, bucket: &str, key: &[u8]) -> Result<Vec<u8>, StoreError> {
        self.check_open()?;
        self.records()
            .get(&(bucket.to_string(), key.to_vec()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("{bucket}/{key:02x?}")))
    }

    fn delete(&self, bucket: &str, key: &[u8]) -> Result<(), StoreError> {
        self.check_writable()?;
        self.records().remove(&(bucket.to_string(), key.to_vec()));
        Ok(())
    }

    fn keys(&self, bucket: &str) -> Result<Vec<Vec<u8>>, StoreError> {
        self.check_open()?;
        Ok(self
            .records()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect())
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut records = self.records();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { bucket, key, value } => {
                    records.insert((bucket, key), value);
                }
                BatchOp::Delete { bucket, key } => {
                    records.remove(&(bucket, key));
                }
            }
        }
        Ok(())
    }

    fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
