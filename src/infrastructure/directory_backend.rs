//! Storage backend over a host directory.
//!
//! The directory plays the role of the removable card: it is "present" while
//! the root directory exists, so deleting or unmounting it behaves like
//! pulling the card.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use crate::domain::{AppError, Result};

use super::backend::{join_name, normalize_name, FileEntry, StorageBackend};

/// Backend rooted at a directory on the host file system.
#[derive(Debug)]
pub struct DirectoryBackend {
    root: PathBuf,
    mounted: bool,
}

impl DirectoryBackend {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            mounted: false,
        }
    }

    #[must_use]
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.root.join(normalize_name(name)?))
    }

    fn require_mounted(&self, operation: &'static str) -> Result<()> {
        if self.is_mounted() {
            Ok(())
        } else {
            Err(AppError::NotMounted { operation })
        }
    }
}

impl StorageBackend for DirectoryBackend {
    fn mount(&mut self) -> Result<()> {
        if self.root.is_dir() {
            self.mounted = true;
            tracing::debug!(root = %self.root.display(), "Directory backend mounted");
            Ok(())
        } else {
            self.mounted = false;
            Err(AppError::storage_msg(format!(
                "medium not present at {}",
                self.root.display()
            )))
        }
    }

    fn unmount(&mut self) {
        self.mounted = false;
    }

    fn is_mounted(&self) -> bool {
        self.mounted && self.root.is_dir()
    }

    fn create_dir(&mut self, name: &str) -> Result<()> {
        self.require_mounted("create directory")?;
        let path = self.path(name)?;
        fs::create_dir_all(&path).map_err(|e| {
            AppError::storage(format!("Failed to create directory: {name}"), e)
        })
    }

    fn write(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.require_mounted("write data")?;
        let path = self.path(name)?;

        let mut file = File::create(&path)
            .map_err(|e| AppError::storage(format!("Cannot open file for writing: {name}"), e))?;
        file.write_all(data)
            .map_err(|e| AppError::storage(format!("Failed to write data to file: {name}"), e))?;
        file.sync_all()
            .map_err(|e| AppError::storage(format!("Failed to sync file: {name}"), e))
    }

    fn append(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.require_mounted("append data")?;
        let path = self.path(name)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                AppError::storage(format!("Cannot open file for appending: {name}"), e)
            })?;
        file.write_all(data)
            .map_err(|e| AppError::storage(format!("Failed to append data to file: {name}"), e))?;
        file.sync_data()
            .map_err(|e| AppError::storage(format!("Failed to sync file: {name}"), e))
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        self.require_mounted("read data")?;
        let path = self.path(name)?;
        fs::read(&path).map_err(|e| AppError::storage(format!("Cannot read file: {name}"), e))
    }

    fn read_first_line(&self, name: &str) -> Result<String> {
        self.require_mounted("read data")?;
        let path = self.path(name)?;

        let file = File::open(&path)
            .map_err(|e| AppError::storage(format!("Cannot read file: {name}"), e))?;
        let mut line = String::new();
        BufReader::new(file)
            .read_line(&mut line)
            .map_err(|e| AppError::storage(format!("Cannot read file: {name}"), e))?;

        Ok(line.trim_end_matches(['\n', '\r']).to_string())
    }

    fn exists(&self, name: &str) -> bool {
        self.is_mounted() && self.path(name).is_ok_and(|path| path.exists())
    }

    fn list_files(&self, dir: &str) -> Result<Vec<FileEntry>> {
        self.require_mounted("list files")?;
        let path = self.path(dir)?;
        if !path.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&path)
            .map_err(|e| AppError::storage(format!("Failed to read directory: {dir}"), e))?;

        let mut files = Vec::new();
        for entry in entries.filter_map(std::result::Result::ok) {
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }

            files.push(FileEntry {
                name: join_name(dir, &entry.file_name().to_string_lossy()),
                size_bytes: metadata.len(),
                modified: metadata.modified().ok(),
            });
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    fn count_dirs(&self, dir: &str) -> Result<usize> {
        self.require_mounted("list directories")?;
        let path = self.path(dir)?;

        let entries = fs::read_dir(&path)
            .map_err(|e| AppError::storage(format!("Failed to read directory: {dir}"), e))?;

        Ok(entries
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
            .count())
    }

    fn remove(&mut self, name: &str) -> Result<()> {
        self.require_mounted("remove file")?;
        let path = self.path(name)?;
        fs::remove_file(&path)
            .map_err(|e| AppError::storage(format!("Failed to remove file: {name}"), e))
    }
}
