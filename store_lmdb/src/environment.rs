//! LMDB environment setup and the [`ContentStore`] implementation.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use dirchain_store::{BatchOp, ContentStore, StoreError, WriteBatch};

use crate::keys::{bucket_prefix, composite_key};
use crate::LmdbError;

/// The schema version that the current code writes.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

const CONTENT_DB: &str = "content";
const META_DB: &str = "meta";
const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";

pub const DEFAULT_MAP_SIZE: usize = 8 * 1024 * 1024 * 1024;
const MAX_DBS: u32 = 4;

/// An LMDB environment holding every bucket in one `content` database.
pub struct LmdbStore {
    env: Arc<Env>,
    content_db: Database<Bytes, Bytes>,
    meta_db: Database<Bytes, Bytes>,
    path: PathBuf,
    closed: AtomicBool,
}

impl LmdbStore {
    /// Open or create an LMDB environment at `path`.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per process per directory;
        // LMDB forbids two environments on the same files in one process.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let content_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some(CONTENT_DB))?;
        let meta_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some(META_DB))?;
        wtxn.commit()?;

        let store = Self {
            env: Arc::new(env),
            content_db,
            meta_db,
            path: path.to_path_buf(),
            closed: AtomicBool::new(false),
        };
        store.ensure_schema()?;
        tracing::info!(path = %path.display(), "LMDB store opened");
        Ok(store)
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema_version(&self) -> Result<u32, LmdbError> {
        let rtxn = self.env.read_txn()?;
        match self.meta_db.get(&rtxn, SCHEMA_VERSION_KEY)? {
            Some(bytes) => {
                let arr: [u8; 4] = bytes.try_into().map_err(|_| {
                    LmdbError::Corruption("schema_version has unexpected byte length".to_string())
                })?;
                Ok(u32::from_le_bytes(arr))
            }
            None => Ok(0),
        }
    }

    /// Stamp a fresh database with the current schema version and refuse
    /// databases written by a newer node.
    fn ensure_schema(&self) -> Result<(), LmdbError> {
        let found = self.schema_version()?;
        if found == CURRENT_SCHEMA_VERSION {
            tracing::debug!(version = found, "database schema is up to date");
            return Ok(());
        }
        if found > CURRENT_SCHEMA_VERSION {
            return Err(LmdbError::UnsupportedSchema {
                found,
                supported: CURRENT_SCHEMA_VERSION,
            });
        }
        let mut wtxn = self.env.write_txn()?;
        self.meta_db
            .put(&mut wtxn, SCHEMA_VERSION_KEY, &CURRENT_SCHEMA_VERSION.to_le_bytes())?;
        wtxn.commit()?;
        tracing::info!(from = found, to = CURRENT_SCHEMA_VERSION, "database schema stamped");
        Ok(())
    }

    fn check_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

impl ContentStore for LmdbStore {
    fn put(&self, bucket: &str, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.check_open()?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.content_db
            .put(&mut wtxn, &composite_key(bucket, key), value)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get(&self, bucket: &str, key: &[u8]) -> Result<Vec<u8>, StoreError> {
        self.check_open()?;
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .content_db
            .get(&rtxn, &composite_key(bucket, key))
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("{bucket}/{}", hex_key(key))))?;
        Ok(val.to_vec())
    }

    fn delete(&self, bucket: &str, key: &[u8]) -> Result<(), StoreError> {
        self.check_open()?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.content_db
            .delete(&mut wtxn, &composite_key(bucket, key))
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn keys(&self, bucket: &str) -> Result<Vec<Vec<u8>>, StoreError> {
        self.check_open()?;
        let prefix = bucket_prefix(bucket);
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self
            .content_db
            .prefix_iter(&rtxn, &prefix)
            .map_err(LmdbError::from)?;
        let mut out = Vec::new();
        for item in iter {
            let (k, _) = item.map_err(LmdbError::from)?;
            out.push(k[prefix.len()..].to_vec());
        }
        Ok(out)
    }

    /// One LMDB write transaction per batch. If any operation fails the
    /// transaction is dropped uncommitted, which aborts it.
    fn write_batch(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.check_open()?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { bucket, key, value } => {
                    self.content_db
                        .put(&mut wtxn, &composite_key(&bucket, &key), &value)
                        .map_err(LmdbError::from)?;
                }
                BatchOp::Delete { bucket, key } => {
                    self.content_db
                        .delete(&mut wtxn, &composite_key(&bucket, &key))
                        .map_err(LmdbError::from)?;
                }
            }
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn close(&self) -> Result<(), StoreError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.env.force_sync().map_err(LmdbError::from)?;
        tracing::info!(path = %self.path.display(), "LMDB store closed");
        Ok(())
    }
}

fn hex_key(key: &[u8]) -> String {
    key.iter().map(|b| format!("{b:02x}")).collect()
}
