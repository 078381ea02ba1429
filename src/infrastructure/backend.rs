//! Storage backend contract.
//!
//! The removable medium is reached only through this trait. Names are
//! relative to the medium's root; a leading `/` is tolerated.

use std::time::SystemTime;

use crate::domain::log_file::parse_uptime;
use crate::domain::{AppError, LogFileInfo, Result};

/// A file found by [`StorageBackend::list_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path relative to the root, including the listed directory.
    pub name: String,
    pub size_bytes: u64,
    pub modified: Option<SystemTime>,
}

impl From<FileEntry> for LogFileInfo {
    fn from(entry: FileEntry) -> Self {
        Self {
            uptime_ms: parse_uptime(&entry.name),
            name: entry.name,
            size_bytes: entry.size_bytes,
            modified: entry.modified,
        }
    }
}

/// Primitive operations on the storage medium.
///
/// Every write-side call opens, writes and closes; implementations must not
/// hold file handles between calls.
pub trait StorageBackend {
    /// Establish access to the medium.
    fn mount(&mut self) -> Result<()>;

    /// Release the medium.
    fn unmount(&mut self);

    /// Re-check that the medium is present and usable.
    fn is_mounted(&self) -> bool;

    /// Create a directory if it does not exist.
    fn create_dir(&mut self, name: &str) -> Result<()>;

    /// Create or truncate `name` and write `data`.
    fn write(&mut self, name: &str, data: &[u8]) -> Result<()>;

    /// Append `data` to `name`, creating it if needed.
    fn append(&mut self, name: &str, data: &[u8]) -> Result<()>;

    /// Read the whole file.
    fn read(&self, name: &str) -> Result<Vec<u8>>;

    /// Read the first line without its terminator.
    fn read_first_line(&self, name: &str) -> Result<String> {
        let bytes = self.read(name)?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(text.lines().next().unwrap_or_default().to_string())
    }

    fn exists(&self, name: &str) -> bool;

    /// Files (not directories) directly inside `dir`.
    fn list_files(&self, dir: &str) -> Result<Vec<FileEntry>>;

    /// Number of directories directly inside `dir`.
    fn count_dirs(&self, dir: &str) -> Result<usize>;

    fn remove(&mut self, name: &str) -> Result<()>;
}

/// Normalize a medium-relative name: strip leading `/`, reject `..`.
pub fn normalize_name(name: &str) -> Result<&str> {
    let trimmed = name.trim_start_matches('/');
    if trimmed.split('/').any(|part| part == "..") {
        return Err(AppError::validation(format!(
            "path escapes storage root: {name}"
        )));
    }
    Ok(trimmed)
}

/// Join a directory and a file name the way the medium spells paths.
#[must_use]
pub fn join_name(dir: &str, file: &str) -> String {
    let dir = dir.trim_matches('/');
    if dir.is_empty() {
        file.to_string()
    } else {
        format!("{dir}/{file}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("/logs/a.csv").unwrap(), "logs/a.csv");
        assert_eq!(normalize_name("logs/a.csv").unwrap(), "logs/a.csv");
        assert!(normalize_name("../etc/passwd").is_err());
        assert!(normalize_name("logs/../../x").is_err());
    }

    #[test]
    fn test_entry_into_log_file_info() {
        let info = LogFileInfo::from(FileEntry {
            name: "logs/log_2_050.csv".into(),
            size_bytes: 40,
            modified: None,
        });
        assert_eq!(info.uptime_ms, Some(2_050));
        assert_eq!(info.size_bytes, 40);
    }

    #[test]
    fn test_join_name() {
        assert_eq!(join_name("logs", "a.csv"), "logs/a.csv");
        assert_eq!(join_name("/logs/", "a.csv"), "logs/a.csv");
        assert_eq!(join_name("", "a.csv"), "a.csv");
    }
}
