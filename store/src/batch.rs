//! Write batching: a list of puts and deletes applied in one atomic step.
//!
//! A backend applies every operation of a batch or none of them.

use dirchain_types::Hash32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchOp {
    Put {
        bucket: String,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    Delete {
        bucket: String,
        key: Vec<u8>,
    },
}

#[derive(Clone, Debug, Default)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, bucket: &str, key: &[u8], value: &[u8]) -> &mut Self {
        self.ops.push(BatchOp::Put {
            bucket: bucket.to_owned(),
            key: key.to_vec(),
            value: value.to_vec(),
        });
        self
    }

    pub fn delete(&mut self, bucket: &str, key: &[u8]) -> &mut Self {
        self.ops.push(BatchOp::Delete {
            bucket: bucket.to_owned(),
            key: key.to_vec(),
        });
        self
    }

    /// Secondary-index write: `secondary_key` resolves to `primary`.
    pub fn index_put(&mut self, index_bucket: &str, secondary_key: &[u8], primary: &Hash32) -> &mut Self {
        self.put(index_bucket, secondary_key, primary.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}
