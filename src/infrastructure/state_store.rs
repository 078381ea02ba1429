//! Durable store for the persisted state and recovery point.
//!
//! This is the internal-flash side of the device, separate from the
//! removable card. Records are small text blobs addressed by name.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use crate::domain::{AppError, Result};

/// Name of the persisted state record.
pub const STATE_FILE: &str = "system.state";
/// Name of the recovery point record.
pub const RECOVERY_FILE: &str = "recovery.point";

/// Named text records that survive power loss.
pub trait StateStore {
    /// `Ok(None)` when the record has never been written.
    fn read(&self, name: &str) -> Result<Option<String>>;

    /// Replace the record. Readers see the old or the new contents, never a
    /// mix.
    fn write(&mut self, name: &str, contents: &str) -> Result<()>;

    /// Delete the record. Missing records are not an error.
    fn remove(&mut self, name: &str) -> Result<()>;
}

/// Store keeping each record as a file in one directory.
///
/// Writes go to `<name>.tmp`, are fsynced, renamed over the target, and the
/// directory is fsynced so the rename survives power loss.
#[derive(Debug)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    /// Open (and create if needed) the store directory.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            AppError::io(
                format!("Failed to create state directory {}", dir.display()),
                e,
            )
        })?;
        Ok(Self { dir })
    }

    fn sync_dir(&self) -> std::io::Result<()> {
        OpenOptions::new().read(true).open(&self.dir)?.sync_all()
    }
}

impl StateStore for FileStateStore {
    fn read(&self, name: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.dir.join(name)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::io(format!("Failed to read {name}"), e)),
        }
    }

    fn write(&mut self, name: &str, contents: &str) -> Result<()> {
        let path = self.dir.join(name);
        let tmp_path = self.dir.join(format!("{name}.tmp"));

        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp_path)
                .map_err(|e| AppError::io(format!("Failed to open {name} for writing"), e))?;
            file.write_all(contents.as_bytes())
                .map_err(|e| AppError::io(format!("Failed to write {name}"), e))?;
            file.sync_all()
                .map_err(|e| AppError::io(format!("Failed to sync {name}"), e))?;
        }

        fs::rename(&tmp_path, &path)
            .map_err(|e| AppError::io(format!("Failed to replace {name}"), e))?;
        self.sync_dir()
            .map_err(|e| AppError::io("Failed to sync state directory", e))
    }

    fn remove(&mut self, name: &str) -> Result<()> {
        match fs::remove_file(self.dir.join(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::io(format!("Failed to remove {name}"), e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_record_reads_none() {
        let dir = tempdir().unwrap();
        let store = FileStateStore::open(dir.path()).unwrap();
        assert_eq!(store.read(STATE_FILE).unwrap(), None);
    }

    #[test]
    fn test_write_replaces_record() {
        let dir = tempdir().unwrap();
        let mut store = FileStateStore::open(dir.path().join("flash")).unwrap();

        store.write(STATE_FILE, "status=1\n").unwrap();
        store.write(STATE_FILE, "status=2\n").unwrap();

        assert_eq!(store.read(STATE_FILE).unwrap().as_deref(), Some("status=2\n"));
        assert!(!dir.path().join("flash/system.state.tmp").exists());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut store = FileStateStore::open(dir.path()).unwrap();

        store.write(RECOVERY_FILE, "x=1\n").unwrap();
        store.remove(RECOVERY_FILE).unwrap();
        store.remove(RECOVERY_FILE).unwrap();
        assert_eq!(store.read(RECOVERY_FILE).unwrap(), None);
    }
}
