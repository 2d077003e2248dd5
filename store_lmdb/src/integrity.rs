//! LMDB database integrity checks.
//!
//! Run on startup to detect corruption early, before the node begins
//! processing blocks.

use std::collections::BTreeMap;
use std::path::Path;

use heed::types::Bytes;

use crate::keys::split_key;
use crate::{LmdbError, LmdbStore};

/// Summary of an integrity check run.
#[derive(Debug, Default)]
pub struct IntegrityReport {
    pub total_entries: u64,
    /// Record count per bucket.
    pub buckets: BTreeMap<String, u64>,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    /// Returns `true` if no errors were detected.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Walk every record of the content database and check that its composite
/// key splits into a bucket name and a record key.
///
/// Read failures are recorded in the report rather than causing a hard error.
pub fn check_integrity(store: &LmdbStore) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport::default();
    let env = store.env();
    let rtxn = env.read_txn()?;

    let Some(db) = env.open_database::<Bytes, Bytes>(&rtxn, Some("content"))? else {
        report.errors.push("content database is missing".to_string());
        return Ok(report);
    };

    let iter = match db.iter(&rtxn) {
        Ok(iter) => iter,
        Err(e) => {
            report.errors.push(format!("failed to iterate content: {e}"));
            return Ok(report);
        }
    };
    for item in iter {
        match item {
            Ok((raw_key, _)) => {
                report.total_entries += 1;
                match split_key(raw_key) {
                    Ok((bucket, _)) => {
                        *report.buckets.entry(bucket.to_string()).or_default() += 1;
                    }
                    Err(e) => report.errors.push(e.to_string()),
                }
            }
            Err(e) => report.errors.push(format!("failed to read record: {e}")),
        }
    }

    Ok(report)
}

/// Check if the LMDB data directory looks valid before opening.
///
/// Returns `Ok(())` for a fresh (nonexistent) directory. Returns an error
/// if the directory exists but `data.mdb` is missing.
pub fn check_data_dir(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Ok(());
    }
    let is_empty = path
        .read_dir()
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false);
    if is_empty {
        return Ok(());
    }
    let data_file = path.join("data.mdb");
    if !data_file.exists() {
        return Err(format!(
            "LMDB directory exists but data.mdb is missing at {}",
            path.display()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirchain_store::ContentStore;

    #[test]
    fn check_data_dir_fresh_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_data_dir(&dir.path().join("absent")).is_ok());
        assert!(check_data_dir(dir.path()).is_ok());
    }

    #[test]
    fn check_data_dir_without_data_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lock.mdb"), b"").unwrap();
        assert!(check_data_dir(dir.path()).is_err());
    }

    #[test]
    fn counts_records_per_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbStore::open(dir.path(), 16 * 1024 * 1024).unwrap();
        store.put("dblock", b"a", b"1").unwrap();
        store.put("dblock", b"b", b"2").unwrap();
        store.put("head", b"c", b"3").unwrap();

        let report = check_integrity(&store).unwrap();
        assert!(report.is_healthy());
        assert_eq!(report.total_entries, 3);
        assert_eq!(report.buckets.get("dblock"), Some(&2));
    }
}
