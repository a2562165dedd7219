//! Local snapshot file storage.
//!
//! Reads are fail-soft: a missing, unreadable, or corrupt file reads as
//! "never written". Writes go through a temp file in the same directory,
//! are fsynced, then renamed over the final path, so a reader never sees a
//! partially written document.

use crate::error::Result;
use crate::snapshot::WalletSnapshot;
use log::{debug, warn};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Default snapshot file name inside the data directory.
pub const DEFAULT_FILE_NAME: &str = "wallet.json";

/// What a call to [`SnapshotStore::write`] did on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// A new document was committed.
    Written,
    /// The file already held the exact same bytes; nothing was touched.
    Unchanged,
}

/// Owns the snapshot file for one directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    file_name: String,
}

impl SnapshotStore {
    /// Creates a store for `dir` using [`DEFAULT_FILE_NAME`].
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_file_name(dir, DEFAULT_FILE_NAME)
    }

    pub fn with_file_name(dir: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        SnapshotStore {
            dir: dir.into(),
            file_name: file_name.into(),
        }
    }

    /// Directory holding the snapshot.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Final path of the snapshot file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    fn tmp_path(&self) -> PathBuf {
        self.dir.join(format!("{}.tmp", self.file_name))
    }

    /// Loads the persisted snapshot, if there is a readable one.
    pub fn read(&self) -> Option<WalletSnapshot> {
        let path = self.path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No snapshot at {}", path.display());
                return None;
            }
            Err(e) => {
                warn!("Unreadable snapshot {}: {}", path.display(), e);
                return None;
            }
        };

        let snapshot = WalletSnapshot::from_json(&bytes);
        if snapshot.is_none() {
            warn!("Malformed snapshot {}, treating as absent", path.display());
        }
        snapshot
    }

    /// Durably writes `snapshot`, skipping the write if the file already
    /// holds the same document.
    pub fn write(&self, snapshot: &WalletSnapshot) -> Result<WriteOutcome> {
        fs::create_dir_all(&self.dir)?;

        let path = self.path();
        let data = snapshot.to_json()?;

        if let Ok(existing) = fs::read(&path) {
            if existing == data.as_bytes() {
                debug!("Snapshot {} unchanged, skipping write", path.display());
                return Ok(WriteOutcome::Unchanged);
            }
        }

        let tmp_path = self.tmp_path();
        let mut file = File::create(&tmp_path)?;
        file.write_all(data.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, &path)?;

        // Persist the rename itself.
        #[cfg(unix)]
        {
            if let Ok(dir) = File::open(&self.dir) {
                let _ = dir.sync_all();
            }
        }

        debug!(
            "Wrote snapshot {}: available={} total={}",
            path.display(),
            snapshot.available_balance,
            snapshot.total_earned
        );
        Ok(WriteOutcome::Written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Decimal2;
    use std::str::FromStr;
    use tempfile::tempdir;

    fn snapshot(available: &str, total: &str) -> WalletSnapshot {
        WalletSnapshot::new(
            Decimal2::from_str(available).unwrap(),
            Decimal2::from_str(total).unwrap(),
        )
    }

    #[test]
    fn test_read_missing_file_is_absent() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        assert!(store.read().is_none());
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let wallet = snapshot("5", "12.34");

        assert_eq!(store.write(&wallet).unwrap(), WriteOutcome::Written);
        assert_eq!(store.read(), Some(wallet));
        assert!(!dir.path().join("wallet.json.tmp").exists());
    }

    #[test]
    fn test_identical_write_is_skipped() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let wallet = snapshot("1.5", "3");

        assert_eq!(store.write(&wallet).unwrap(), WriteOutcome::Written);
        assert_eq!(store.write(&wallet).unwrap(), WriteOutcome::Unchanged);
        assert_eq!(store.read(), Some(wallet));

        let changed = snapshot("1.5", "3.01");
        assert_eq!(store.write(&changed).unwrap(), WriteOutcome::Written);
        assert_eq!(store.read(), Some(changed));
    }

    #[test]
    fn test_write_creates_nested_directories() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = SnapshotStore::with_file_name(&nested, "custom.json");

        store.write(&snapshot("0", "1")).unwrap();
        assert!(nested.join("custom.json").exists());
    }

    #[test]
    fn test_corrupt_file_reads_as_absent() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        fs::write(store.path(), "{ not json").unwrap();
        assert!(store.read().is_none());

        fs::write(store.path(), "[]").unwrap();
        assert!(store.read().is_none());
    }

    #[test]
    fn test_rewrites_non_canonical_file() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        fs::write(
            store.path(),
            r#"{"total_earned": 3, "available_balance": 1.5}"#,
        )
        .unwrap();

        let wallet = store.read().unwrap();
        assert_eq!(wallet, snapshot("1.5", "3"));
        assert_eq!(store.write(&wallet).unwrap(), WriteOutcome::Written);
        assert_eq!(
            fs::read_to_string(store.path()).unwrap(),
            wallet.to_json().unwrap()
        );
    }

    #[test]
    fn test_write_into_file_path_fails() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();

        let store = SnapshotStore::new(blocker.join("inner"));
        assert!(store.write(&snapshot("0", "0")).is_err());
    }
}
