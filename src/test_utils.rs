//! Test fixtures: an in-memory card with fault injection, an in-memory flash
//! store and a rig wiring them to a manual clock.
//!
//! Handles are cheap clones over shared state so a test can keep one handle
//! for inspection while the component under test owns a boxed copy.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::time::{Duration, SystemTime};

use crate::application::{LogEngine, StateMachine, StorageManager};
use crate::domain::{AppConfig, AppError, Result, StorageConfig};
use crate::infrastructure::backend::normalize_name;
use crate::infrastructure::{
    Clock, FileEntry, KeyValueCodec, ManualClock, StateStore, StorageBackend,
};

#[derive(Debug)]
struct StoredFile {
    data: Vec<u8>,
    /// Modification sequence; larger is newer.
    seq: u64,
}

#[derive(Debug, Default)]
struct Card {
    absent: bool,
    mounted: bool,
    mount_failures: Option<usize>,
    mount_calls: usize,
    appends_left: Option<usize>,
    append_calls: usize,
    files: BTreeMap<String, StoredFile>,
    dirs: BTreeSet<String>,
    failing_dirs: BTreeSet<String>,
    unreadable: BTreeSet<String>,
    seq: u64,
}

impl Card {
    fn require_mounted(&self, operation: &'static str) -> Result<()> {
        if self.mounted && !self.absent {
            Ok(())
        } else {
            Err(AppError::NotMounted { operation })
        }
    }

    fn parent_exists(&self, name: &str) -> bool {
        parent_of(name).is_empty() || self.dirs.contains(parent_of(name))
    }

    fn touch(&mut self, name: &str, data: Vec<u8>) {
        self.seq += 1;
        let seq = self.seq;
        self.files.insert(name.to_string(), StoredFile { data, seq });
    }
}

fn parent_of(name: &str) -> &str {
    name.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// In-memory removable card.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    card: Rc<RefCell<Card>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A card slot with nothing in it; every mount fails.
    pub fn unmountable() -> Self {
        let backend = Self::default();
        backend.card.borrow_mut().absent = true;
        backend
    }

    /// Insert or pull the card. Pulling also drops the mount.
    pub fn set_present(&self, present: bool) {
        let mut card = self.card.borrow_mut();
        card.absent = !present;
        if !present {
            card.mounted = false;
        }
    }

    /// Fail the next `count` mount calls.
    pub fn fail_mounts(&self, count: usize) {
        self.card.borrow_mut().mount_failures = Some(count);
    }

    /// Allow `count` more appends, then fail every append.
    pub fn fail_appends_after(&self, count: usize) {
        self.card.borrow_mut().appends_left = Some(count);
    }

    pub fn heal_appends(&self) {
        self.card.borrow_mut().appends_left = None;
    }

    pub fn fail_create_dir(&self, name: &str) {
        self.card.borrow_mut().failing_dirs.insert(name.to_string());
    }

    pub fn mark_unreadable(&self, name: &str) {
        self.card.borrow_mut().unreadable.insert(name.to_string());
    }

    /// Place a file directly, bypassing mount checks.
    pub fn put_file(&self, name: &str, contents: &str) {
        let mut card = self.card.borrow_mut();
        if let Some((dir, _)) = name.rsplit_once('/') {
            card.dirs.insert(dir.to_string());
        }
        card.touch(name, contents.as_bytes().to_vec());
    }

    pub fn contents(&self, name: &str) -> Option<String> {
        self.card
            .borrow()
            .files
            .get(name)
            .map(|f| String::from_utf8_lossy(&f.data).into_owned())
    }

    /// Lines of a file, empty when the file does not exist.
    pub fn lines(&self, name: &str) -> Vec<String> {
        self.contents(name)
            .map(|text| text.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Names of all files inside `dir`.
    pub fn file_names(&self, dir: &str) -> Vec<String> {
        self.card
            .borrow()
            .files
            .keys()
            .filter(|name| parent_of(name) == dir)
            .cloned()
            .collect()
    }

    pub fn has_dir(&self, name: &str) -> bool {
        self.card.borrow().dirs.contains(name)
    }

    pub fn mount_calls(&self) -> usize {
        self.card.borrow().mount_calls
    }

    pub fn append_calls(&self) -> usize {
        self.card.borrow().append_calls
    }
}

impl StorageBackend for MemoryBackend {
    fn mount(&mut self) -> Result<()> {
        let mut card = self.card.borrow_mut();
        card.mount_calls += 1;
        if card.absent {
            return Err(AppError::storage_msg("no card inserted"));
        }
        if let Some(remaining) = card.mount_failures.as_mut() {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(AppError::storage_msg("card did not respond"));
            }
        }
        card.mounted = true;
        Ok(())
    }

    fn unmount(&mut self) {
        self.card.borrow_mut().mounted = false;
    }

    fn is_mounted(&self) -> bool {
        let card = self.card.borrow();
        card.mounted && !card.absent
    }

    fn create_dir(&mut self, name: &str) -> Result<()> {
        let name = normalize_name(name)?;
        let mut card = self.card.borrow_mut();
        card.require_mounted("create directory")?;
        if card.failing_dirs.contains(name) {
            return Err(AppError::storage_msg(format!("Failed to create directory: {name}")));
        }
        card.dirs.insert(name.to_string());
        Ok(())
    }

    fn write(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let name = normalize_name(name)?;
        let mut card = self.card.borrow_mut();
        card.require_mounted("write data")?;
        if !card.parent_exists(name) {
            return Err(AppError::storage_msg(format!("Cannot open file for writing: {name}")));
        }
        card.touch(name, data.to_vec());
        Ok(())
    }

    fn append(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let name = normalize_name(name)?;
        let mut card = self.card.borrow_mut();
        card.require_mounted("append data")?;
        card.append_calls += 1;
        if let Some(left) = card.appends_left.as_mut() {
            if *left == 0 {
                return Err(AppError::storage_msg(format!(
                    "Failed to append data to file: {name}"
                )));
            }
            *left -= 1;
        }
        if !card.parent_exists(name) {
            return Err(AppError::storage_msg(format!(
                "Cannot open file for appending: {name}"
            )));
        }
        let mut existing = card
            .files
            .remove(name)
            .map(|f| f.data)
            .unwrap_or_default();
        existing.extend_from_slice(data);
        card.touch(name, existing);
        Ok(())
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        let name = normalize_name(name)?;
        let card = self.card.borrow();
        card.require_mounted("read data")?;
        if card.unreadable.contains(name) {
            return Err(AppError::storage_msg(format!("Cannot read file: {name}")));
        }
        card.files
            .get(name)
            .map(|f| f.data.clone())
            .ok_or_else(|| AppError::storage_msg(format!("Cannot read file: {name}")))
    }

    fn exists(&self, name: &str) -> bool {
        let Ok(name) = normalize_name(name) else {
            return false;
        };
        let card = self.card.borrow();
        card.mounted && !card.absent && (card.files.contains_key(name) || card.dirs.contains(name))
    }

    fn list_files(&self, dir: &str) -> Result<Vec<FileEntry>> {
        let dir = normalize_name(dir)?.trim_end_matches('/');
        let card = self.card.borrow();
        card.require_mounted("list files")?;
        Ok(card
            .files
            .iter()
            .filter(|(name, _)| parent_of(name) == dir)
            .map(|(name, file)| FileEntry {
                name: name.clone(),
                size_bytes: file.data.len() as u64,
                modified: Some(SystemTime::UNIX_EPOCH + Duration::from_secs(file.seq)),
            })
            .collect())
    }

    fn count_dirs(&self, dir: &str) -> Result<usize> {
        let dir = normalize_name(dir)?.trim_end_matches('/');
        let card = self.card.borrow();
        card.require_mounted("list directories")?;
        Ok(card.dirs.iter().filter(|d| parent_of(d) == dir).count())
    }

    fn remove(&mut self, name: &str) -> Result<()> {
        let name = normalize_name(name)?;
        let mut card = self.card.borrow_mut();
        card.require_mounted("remove file")?;
        card.files
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| AppError::storage_msg(format!("Failed to remove file: {name}")))
    }
}

/// In-memory flash store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    records: Rc<RefCell<BTreeMap<String, String>>>,
    fail_writes: Rc<RefCell<bool>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.records.borrow().get(name).cloned()
    }

    pub fn put(&self, name: &str, contents: &str) {
        self.records
            .borrow_mut()
            .insert(name.to_string(), contents.to_string());
    }

    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.borrow_mut() = fail;
    }
}

impl StateStore for MemoryStateStore {
    fn read(&self, name: &str) -> Result<Option<String>> {
        Ok(self.get(name))
    }

    fn write(&mut self, name: &str, contents: &str) -> Result<()> {
        if *self.fail_writes.borrow() {
            return Err(AppError::io(
                format!("Failed to write {name}"),
                std::io::Error::other("flash write failed"),
            ));
        }
        self.put(name, contents);
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<()> {
        self.records.borrow_mut().remove(name);
        Ok(())
    }
}

/// A manual clock plus in-memory card and flash, able to build every
/// component over them.
pub struct Rig {
    pub clock: Rc<ManualClock>,
    pub card: MemoryBackend,
    pub flash: MemoryStateStore,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_card(MemoryBackend::new())
    }

    pub fn with_card(card: MemoryBackend) -> Self {
        Self {
            clock: Rc::new(ManualClock::starting_at(10_000)),
            card,
            flash: MemoryStateStore::new(),
        }
    }

    pub fn clock(&self) -> Rc<dyn Clock> {
        self.clock.clone()
    }

    pub fn state_machine(&self) -> StateMachine {
        StateMachine::new(
            Box::new(self.flash.clone()),
            Box::new(KeyValueCodec),
            self.clock(),
        )
    }

    pub fn storage(&self, config: &StorageConfig) -> StorageManager {
        StorageManager::new(
            Box::new(self.card.clone()),
            self.clock(),
            config.mount_policy(),
        )
    }

    pub fn engine(&self, config: &AppConfig) -> LogEngine {
        LogEngine::new(
            config.logger.clone(),
            self.state_machine(),
            self.storage(&config.storage),
            self.clock(),
        )
    }

    /// Engine booted through `start`, with fast mount retries.
    pub fn started_engine(&self, config: &AppConfig) -> LogEngine {
        let mut engine = self.engine(config);
        engine.start().unwrap();
        engine
    }
}

/// Config with small, test-friendly numbers.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.logger.log_interval_ms = 100;
    config.logger.buffer_capacity = 5;
    config.logger.flush_interval_ms = 30_000;
    config.storage.mount_attempts = 3;
    config.storage.mount_retry_delay_ms = 5_000;
    config
}
