//! Storage management service.
//!
//! Owns the removable medium: bounded-retry mount, directory bootstrap,
//! round-trip health checks, write/append primitives, retention and
//! maintenance. Mount status and write outcomes are reported to the
//! [`StateMachine`] passed into each call.

use std::rc::Rc;

use serde::Serialize;

use crate::domain::log_file::{self, BACKUP_DIR, LOG_DIR, LOG_HEADER, TEMP_DIR};
use crate::domain::{AppError, LogFileInfo, MountSession, Result, RetryPolicy};
use crate::infrastructure::{Clock, StorageBackend};

use super::state_machine::StateMachine;

/// Scratch file used by the round-trip probes.
const PROBE_FILE: &str = "temp/test.tmp";
const PROBE_PAYLOAD: &str = "TEST";

/// Service for the removable medium's lifecycle and file primitives.
pub struct StorageManager {
    backend: Box<dyn StorageBackend>,
    clock: Rc<dyn Clock>,
    mount_policy: RetryPolicy,
    session: MountSession,
}

impl StorageManager {
    /// Create a new storage manager.
    #[must_use]
    pub fn new(
        backend: Box<dyn StorageBackend>,
        clock: Rc<dyn Clock>,
        mount_policy: RetryPolicy,
    ) -> Self {
        Self {
            backend,
            clock,
            mount_policy,
            session: MountSession::default(),
        }
    }

    /// Mount, create the directory layout and verify the file system.
    ///
    /// # Errors
    /// Returns the first step's failure.
    pub fn initialize(&mut self, state: &mut StateMachine) -> Result<()> {
        self.mount(state)?;
        self.create_directory_structure()?;
        self.verify_file_system()?;
        tracing::info!("Storage initialized");
        Ok(())
    }

    /// Mount with the configured retry policy.
    ///
    /// # Errors
    /// Returns `MountFailed` once every attempt has failed.
    pub fn mount(&mut self, state: &mut StateMachine) -> Result<()> {
        let policy = self.mount_policy.clone();
        self.mount_with(state, &policy)
    }

    /// Mount with an explicit retry policy. Succeeds immediately when the
    /// medium is already mounted.
    ///
    /// # Errors
    /// Returns `MountFailed` once every attempt has failed.
    pub fn mount_with(&mut self, state: &mut StateMachine, policy: &RetryPolicy) -> Result<()> {
        if self.backend.is_mounted() {
            self.session.mounted = true;
            if !state.is_storage_mounted() {
                state.set_storage_mounted(true);
            }
            return Ok(());
        }

        let mut retry = policy.handle();
        let mut attempts = 0;
        loop {
            attempts += 1;
            self.session.mount_attempts = attempts;

            match self.backend.mount() {
                Ok(()) => {
                    self.session.mounted = true;
                    self.session.mount_attempts = 0;
                    self.session.last_mount_ms = Some(self.clock.now_millis());
                    state.set_storage_mounted(true);
                    tracing::info!(attempts, "Storage mounted");
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!(attempt = attempts, error = %e, "Mount attempt failed");
                    match retry.next_delay() {
                        Some(delay) => self.clock.sleep(delay),
                        None => break,
                    }
                }
            }
        }

        let err = AppError::MountFailed { attempts };
        self.session.mounted = false;
        self.session.last_error = err.to_string();
        state.set_storage_mounted(false);
        state.log_error(err.to_string());
        Err(err)
    }

    /// Release the medium.
    pub fn unmount(&mut self, state: &mut StateMachine) {
        self.backend.unmount();
        self.session.mounted = false;
        state.set_storage_mounted(false);
        tracing::info!("Storage unmounted");
    }

    /// Re-check with the backend that the medium is still usable.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.backend.is_mounted()
    }

    /// Ensure `logs/`, `backups/` and `temp/` exist. Every directory is
    /// attempted even if an earlier one fails.
    ///
    /// # Errors
    /// Returns one error naming every directory that could not be created.
    pub fn create_directory_structure(&mut self) -> Result<()> {
        self.require_mounted("create directories")?;

        let mut failed = Vec::new();
        for dir in [LOG_DIR, BACKUP_DIR, TEMP_DIR] {
            if let Err(e) = self.backend.create_dir(dir) {
                tracing::warn!(dir, error = %e, "Failed to create directory");
                failed.push(dir);
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            let err = AppError::storage_msg(format!(
                "Failed to create directories: {}",
                failed.join(", ")
            ));
            self.session.last_error = err.to_string();
            Err(err)
        }
    }

    /// Boot-time file system check: list the root, then run a fixed and an
    /// uptime-stamped round-trip probe.
    ///
    /// # Errors
    /// Returns `HealthCheck` describing the first failed step.
    pub fn verify_file_system(&mut self) -> Result<()> {
        self.require_mounted("verify file system")?;

        let result = self.run_verification();
        if let Err(e) = &result {
            self.session.last_error = e.to_string();
        }
        result
    }

    fn run_verification(&mut self) -> Result<()> {
        self.backend
            .list_files("")
            .map_err(|e| AppError::HealthCheck {
                message: format!("cannot list root directory: {e}"),
            })?;
        self.probe(PROBE_PAYLOAD)?;
        let payload = format!("HEALTH_CHECK_{}", self.clock.now_millis());
        self.probe(&payload)
    }

    /// Single round-trip probe of the medium.
    ///
    /// # Errors
    /// Returns `HealthCheck` when the probe fails.
    pub fn check_health(&mut self) -> Result<()> {
        self.require_mounted("check health")?;
        let result = self.probe(PROBE_PAYLOAD);
        if let Err(e) = &result {
            self.session.last_error = e.to_string();
        }
        result
    }

    /// Write `payload` to the scratch file, read it back, compare, delete.
    fn probe(&mut self, payload: &str) -> Result<()> {
        let fail = |message: String| AppError::HealthCheck { message };

        self.backend
            .write(PROBE_FILE, payload.as_bytes())
            .map_err(|e| fail(format!("cannot write test file: {e}")))?;

        let read_back = self
            .backend
            .read(PROBE_FILE)
            .map_err(|e| fail(format!("cannot read test file: {e}")))?;

        if read_back != payload.as_bytes() {
            return Err(fail(format!(
                "test file mismatch: wrote {} bytes, read {} bytes",
                payload.len(),
                read_back.len()
            )));
        }

        self.backend
            .remove(PROBE_FILE)
            .map_err(|e| fail(format!("cannot remove test file: {e}")))
    }

    /// Create or truncate `name` with `data`.
    ///
    /// # Errors
    /// Returns the backend's error; it is also recorded as the last error.
    pub fn write_data(&mut self, state: &mut StateMachine, name: &str, data: &str) -> Result<()> {
        match self.backend.write(name, data.as_bytes()) {
            Ok(()) => {
                state.record_write(self.clock.now_millis());
                Ok(())
            }
            Err(e) => {
                let context = format!("Failed to write data to: {name}");
                Err(self.record_failure(state, context, e))
            }
        }
    }

    /// Append `data` plus a newline to `name`.
    ///
    /// # Errors
    /// Returns the backend's error; it is also recorded as the last error.
    pub fn append_data(&mut self, state: &mut StateMachine, name: &str, data: &str) -> Result<()> {
        let line = format!("{data}\n");
        match self.backend.append(name, line.as_bytes()) {
            Ok(()) => {
                state.record_write(self.clock.now_millis());
                Ok(())
            }
            Err(e) => {
                let context = format!("Failed to append data to: {name}");
                Err(self.record_failure(state, context, e))
            }
        }
    }

    fn record_failure(
        &mut self,
        state: &mut StateMachine,
        context: String,
        err: AppError,
    ) -> AppError {
        let message = format!("{context}: {err}");
        self.session.last_error.clone_from(&message);
        state.log_error(message);
        err
    }

    /// Create a fresh log file named after the current uptime and write its
    /// header. The header is not counted as a record write.
    ///
    /// # Errors
    /// Returns error if the medium is not mounted or the header write fails.
    pub fn create_new_log_file(&mut self, state: &mut StateMachine) -> Result<String> {
        if let Err(e) = self.require_mounted("create log file") {
            state.log_error(e.to_string());
            return Err(e);
        }

        let now = self.clock.now_millis();
        let mut name = log_file::log_file_name(now);
        let mut suffix = 1;
        while self.backend.exists(&name) {
            name = log_file::log_file_name_with_suffix(now, suffix);
            suffix += 1;
        }

        if let Err(e) = self.backend.write(&name, format!("{LOG_HEADER}\n").as_bytes()) {
            return Err(self.record_failure(state, format!("Failed to create log file: {name}"), e));
        }

        tracing::info!(file = %name, "Created new log file");
        Ok(name)
    }

    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.backend.exists(name)
    }

    /// First line of `name` without its terminator.
    ///
    /// # Errors
    /// Returns error if the file cannot be read.
    pub fn read_first_line(&self, name: &str) -> Result<String> {
        self.backend.read_first_line(name)
    }

    /// Log files on the medium, sorted by name.
    ///
    /// # Errors
    /// Returns error if the medium is not mounted or cannot be listed.
    pub fn list_log_files(&self) -> Result<Vec<LogFileInfo>> {
        Ok(self
            .backend
            .list_files(LOG_DIR)?
            .into_iter()
            .map(LogFileInfo::from)
            .collect())
    }

    /// Delete the oldest log files until at most `keep` remain. `protect`
    /// (the current file) is never deleted.
    ///
    /// # Errors
    /// Returns error if the log directory cannot be listed.
    pub fn cleanup_old_files(
        &mut self,
        keep: usize,
        protect: Option<&str>,
    ) -> Result<CleanupResult> {
        let mut files = self.list_log_files()?;
        if files.len() <= keep {
            return Ok(CleanupResult::default());
        }

        files.sort_by(|a, b| a.age_key().cmp(&b.age_key()));
        let protect = protect.map(|p| p.trim_start_matches('/'));
        let excess = files.len() - keep;

        let mut result = CleanupResult::default();
        for file in files {
            if result.deleted_count == excess {
                break;
            }
            if protect == Some(file.name.as_str()) {
                continue;
            }

            match self.backend.remove(&file.name) {
                Ok(()) => {
                    result.deleted_count += 1;
                    result.freed_bytes += file.size_bytes;
                    tracing::info!(
                        file = %file.name,
                        size = file.size_bytes,
                        "Deleted old log file"
                    );
                    result.deleted_files.push(file.name);
                }
                Err(e) => {
                    tracing::warn!(file = %file.name, error = %e, "Failed to delete old log file");
                }
            }
        }

        Ok(result)
    }

    /// Purge the scratch directory and check every log file is non-empty
    /// and readable. Anomalies are reported, never deleted.
    ///
    /// # Errors
    /// Returns error if the medium is not mounted or cannot be listed.
    pub fn perform_maintenance(&mut self) -> Result<MaintenanceReport> {
        self.require_mounted("perform maintenance")?;
        let mut report = MaintenanceReport::default();

        for entry in self.backend.list_files(TEMP_DIR)? {
            match self.backend.remove(&entry.name) {
                Ok(()) => report.temp_files_removed += 1,
                Err(e) => {
                    tracing::warn!(file = %entry.name, error = %e, "Failed to purge temp file");
                }
            }
        }

        for file in self.list_log_files()? {
            report.files_checked += 1;
            let issue = if file.size_bytes == 0 {
                Some(FileIssue::Empty)
            } else if self.backend.read(&file.name).is_err() {
                Some(FileIssue::Unreadable)
            } else {
                None
            };

            if let Some(issue) = issue {
                tracing::warn!(file = %file.name, ?issue, "Log file failed verification");
                report.anomalies.push(FileAnomaly {
                    name: file.name,
                    issue,
                });
            }
        }

        tracing::info!(
            temp_removed = report.temp_files_removed,
            checked = report.files_checked,
            anomalies = report.anomalies.len(),
            "Storage maintenance complete"
        );
        Ok(report)
    }

    /// Get storage summary.
    ///
    /// # Errors
    /// Returns error if the medium is not mounted or cannot be listed.
    pub fn summary(&self) -> Result<StorageSummary> {
        self.require_mounted("read card info")?;

        let mut summary = StorageSummary {
            dir_count: self.backend.count_dirs("")?,
            ..StorageSummary::default()
        };

        for dir in ["", LOG_DIR, BACKUP_DIR, TEMP_DIR] {
            let files = self.backend.list_files(dir)?;
            if dir == LOG_DIR {
                summary.log_file_count = files.len();
            }
            summary.file_count += files.len();
            summary.total_bytes += files.iter().map(|f| f.size_bytes).sum::<u64>();
        }

        Ok(summary)
    }

    #[must_use]
    pub fn last_error(&self) -> &str {
        &self.session.last_error
    }

    pub fn clear_last_error(&mut self) {
        self.session.last_error.clear();
    }

    /// Current mount lifecycle record.
    #[must_use]
    pub fn session(&self) -> &MountSession {
        &self.session
    }

    fn require_mounted(&self, operation: &'static str) -> Result<()> {
        if self.backend.is_mounted() {
            Ok(())
        } else {
            Err(AppError::NotMounted { operation })
        }
    }
}

/// Result of a cleanup operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupResult {
    /// Number of files deleted.
    pub deleted_count: usize,
    /// Total bytes freed.
    pub freed_bytes: u64,
    pub deleted_files: Vec<String>,
}

impl CleanupResult {
    /// Format freed bytes as human readable.
    #[must_use]
    pub fn freed_human(&self) -> String {
        format_bytes(self.freed_bytes)
    }
}

/// Problem found on a log file during maintenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileIssue {
    Empty,
    Unreadable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileAnomaly {
    pub name: String,
    pub issue: FileIssue,
}

/// Outcome of storage maintenance.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MaintenanceReport {
    pub temp_files_removed: usize,
    pub files_checked: usize,
    pub anomalies: Vec<FileAnomaly>,
}

/// Storage summary information.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StorageSummary {
    /// Files in the root and the managed directories.
    pub file_count: usize,
    /// Directories directly under the root.
    pub dir_count: usize,
    pub log_file_count: usize,
    /// Total bytes across counted files.
    pub total_bytes: u64,
}

impl StorageSummary {
    /// Format total size as human readable.
    #[must_use]
    pub fn total_human(&self) -> String {
        format_bytes(self.total_bytes)
    }
}

/// Format bytes as human readable string.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::StorageConfig;
    use crate::test_utils::{MemoryBackend, Rig};

    fn mounted(rig: &Rig) -> (StateMachine, StorageManager) {
        let mut state = rig.state_machine();
        let mut storage = rig.storage(&StorageConfig::default());
        storage.initialize(&mut state).unwrap();
        (state, storage)
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1024 * 1024), "1.00 MB");
        assert_eq!(format_bytes(1024 * 1024 * 1024), "1.00 GB");
    }

    #[test]
    fn test_initialize_creates_layout_and_cleans_probe() {
        let rig = Rig::new();
        let (state, storage) = mounted(&rig);

        assert!(storage.is_mounted());
        assert!(state.is_storage_mounted());
        assert!(rig.card.has_dir("logs"));
        assert!(rig.card.has_dir("backups"));
        assert!(rig.card.has_dir("temp"));
        assert!(rig.card.file_names("temp").is_empty());
        assert_eq!(storage.session().last_mount_ms, Some(10_000));
        assert_eq!(state.total_writes(), 0);
    }

    #[test]
    fn test_mount_gives_up_after_configured_attempts() {
        let rig = Rig::with_card(MemoryBackend::unmountable());
        let mut state = rig.state_machine();
        let config = StorageConfig {
            mount_attempts: 3,
            mount_retry_delay_ms: 5_000,
            ..StorageConfig::default()
        };
        let mut storage = rig.storage(&config);

        let err = storage.mount(&mut state).unwrap_err();

        assert!(matches!(err, AppError::MountFailed { attempts: 3 }));
        assert_eq!(rig.card.mount_calls(), 3);
        assert_eq!(
            rig.clock.sleeps(),
            vec![Duration::from_millis(5_000), Duration::from_millis(5_000)]
        );
        assert!(!storage.is_mounted());
        assert!(!state.is_storage_mounted());
        assert_eq!(state.last_error(), "Failed to mount storage after 3 attempts");
        assert_eq!(storage.last_error(), state.last_error());
        assert_eq!(storage.session().mount_attempts, 3);
    }

    #[test]
    fn test_mount_recovers_within_retry_budget() {
        let rig = Rig::new();
        rig.card.fail_mounts(2);
        let mut state = rig.state_machine();
        let mut storage = rig.storage(&StorageConfig::default());

        storage.mount(&mut state).unwrap();
        assert_eq!(rig.card.mount_calls(), 3);
        assert_eq!(storage.session().mount_attempts, 0);

        storage.mount(&mut state).unwrap();
        assert_eq!(rig.card.mount_calls(), 3);
    }

    #[test]
    fn test_fast_path_mount_refreshes_stale_flag() {
        let rig = Rig::new();
        let mut state = rig.state_machine();
        let mut storage = rig.storage(&StorageConfig::default());
        storage.mount(&mut state).unwrap();
        state.set_storage_mounted(false);

        storage.mount_with(&mut state, &RetryPolicy::once()).unwrap();

        assert_eq!(rig.card.mount_calls(), 1);
        assert!(state.is_storage_mounted());
    }

    #[test]
    fn test_single_attempt_policy_never_sleeps() {
        let rig = Rig::with_card(MemoryBackend::unmountable());
        let mut state = rig.state_machine();
        let mut storage = rig.storage(&StorageConfig::default());

        assert!(storage.mount_with(&mut state, &RetryPolicy::once()).is_err());
        assert_eq!(rig.card.mount_calls(), 1);
        assert!(rig.clock.sleeps().is_empty());
    }

    #[test]
    fn test_directory_failures_are_aggregated() {
        let rig = Rig::new();
        rig.card.fail_create_dir("logs");
        rig.card.fail_create_dir("temp");
        let mut state = rig.state_machine();
        let mut storage = rig.storage(&StorageConfig::default());
        storage.mount(&mut state).unwrap();

        let err = storage.create_directory_structure().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Storage error: Failed to create directories: logs, temp"
        );
        assert!(rig.card.has_dir("backups"));
    }

    #[test]
    fn test_health_check_reports_unreadable_probe() {
        let rig = Rig::new();
        let (_state, mut storage) = mounted(&rig);
        storage.check_health().unwrap();

        rig.card.mark_unreadable(PROBE_FILE);
        let err = storage.check_health().unwrap_err();
        assert!(matches!(err, AppError::HealthCheck { .. }));
        assert!(storage.last_error().contains("cannot read test file"));
    }

    #[test]
    fn test_append_counts_writes_and_records_failures() {
        let rig = Rig::new();
        let (mut state, mut storage) = mounted(&rig);
        let name = storage.create_new_log_file(&mut state).unwrap();

        rig.clock.advance(250);
        storage.append_data(&mut state, &name, "1,2,3").unwrap();
        assert_eq!(state.total_writes(), 1);
        assert_eq!(state.last_good_write_ms(), 10_250);
        assert_eq!(rig.card.lines(&name), vec![LOG_HEADER, "1,2,3"]);

        rig.card.fail_appends_after(0);
        assert!(storage.append_data(&mut state, &name, "4,5,6").is_err());
        assert_eq!(state.total_writes(), 1);
        assert!(state.last_error().starts_with("Failed to append data to: logs/"));
    }

    #[test]
    fn test_new_log_file_names_avoid_collisions() {
        let rig = Rig::new();
        let (mut state, mut storage) = mounted(&rig);

        let first = storage.create_new_log_file(&mut state).unwrap();
        let second = storage.create_new_log_file(&mut state).unwrap();
        let third = storage.create_new_log_file(&mut state).unwrap();

        assert_eq!(first, "logs/log_10_000.csv");
        assert_eq!(second, "logs/log_10_000_1.csv");
        assert_eq!(third, "logs/log_10_000_2.csv");
        assert_eq!(rig.card.contents(&first).unwrap(), format!("{LOG_HEADER}\n"));
    }

    #[test]
    fn test_new_log_file_requires_mount() {
        let rig = Rig::new();
        let mut state = rig.state_machine();
        let mut storage = rig.storage(&StorageConfig::default());

        let err = storage.create_new_log_file(&mut state).unwrap_err();
        assert!(matches!(err, AppError::NotMounted { .. }));
        assert!(!state.last_error().is_empty());
    }

    #[test]
    fn test_cleanup_deletes_oldest_and_protects_current() {
        let rig = Rig::new();
        let (_state, mut storage) = mounted(&rig);
        // Written in this order, so modification order differs from the
        // uptime embedded in the names.
        rig.card.put_file("logs/log_50_000.csv", "a");
        rig.card.put_file("logs/log_3_000.csv", "bb");
        rig.card.put_file("logs/log_90_000.csv", "ccc");
        rig.card.put_file("logs/log_1_000.csv", "dddd");

        let result = storage
            .cleanup_old_files(2, Some("/logs/log_50_000.csv"))
            .unwrap();

        assert_eq!(result.deleted_count, 2);
        assert_eq!(result.freed_bytes, 5);
        assert_eq!(
            result.deleted_files,
            vec!["logs/log_3_000.csv", "logs/log_90_000.csv"]
        );
        assert_eq!(
            rig.card.file_names("logs"),
            vec!["logs/log_1_000.csv", "logs/log_50_000.csv"]
        );
    }

    #[test]
    fn test_cleanup_within_limit_is_noop() {
        let rig = Rig::new();
        let (_state, mut storage) = mounted(&rig);
        rig.card.put_file("logs/log_1_000.csv", "a");

        let result = storage.cleanup_old_files(10, None).unwrap();
        assert_eq!(result.deleted_count, 0);
        assert_eq!(rig.card.file_names("logs").len(), 1);
    }

    #[test]
    fn test_maintenance_purges_temp_and_flags_anomalies() {
        let rig = Rig::new();
        let (_state, mut storage) = mounted(&rig);
        rig.card.put_file("temp/a.tmp", "x");
        rig.card.put_file("temp/b.tmp", "y");
        rig.card.put_file("logs/log_1_000.csv", "");
        rig.card.put_file("logs/log_2_000.csv", "timestamp\n1\n");
        rig.card.put_file("logs/log_3_000.csv", "timestamp\n2\n");
        rig.card.mark_unreadable("logs/log_3_000.csv");

        let report = storage.perform_maintenance().unwrap();

        assert_eq!(report.temp_files_removed, 2);
        assert_eq!(report.files_checked, 3);
        assert_eq!(
            report.anomalies,
            vec![
                FileAnomaly {
                    name: "logs/log_1_000.csv".into(),
                    issue: FileIssue::Empty,
                },
                FileAnomaly {
                    name: "logs/log_3_000.csv".into(),
                    issue: FileIssue::Unreadable,
                },
            ]
        );
        assert!(rig.card.file_names("temp").is_empty());
        assert_eq!(rig.card.file_names("logs").len(), 3);
    }

    #[test]
    fn test_summary_counts_files_and_dirs() {
        let rig = Rig::new();
        let (mut state, mut storage) = mounted(&rig);
        let name = storage.create_new_log_file(&mut state).unwrap();
        rig.card.put_file("backups/old.csv", "12345");

        let summary = storage.summary().unwrap();
        assert_eq!(summary.dir_count, 3);
        assert_eq!(summary.log_file_count, 1);
        assert_eq!(summary.file_count, 2);
        assert_eq!(summary.total_bytes, (LOG_HEADER.len() + 1 + 5) as u64);
        assert!(rig.card.contents(&name).is_some());
    }

    #[test]
    fn test_unmount_reports_to_state() {
        let rig = Rig::new();
        let (mut state, mut storage) = mounted(&rig);

        storage.unmount(&mut state);
        assert!(!storage.is_mounted());
        assert!(!state.is_storage_mounted());
        assert!(!storage.session().mounted);
    }
}
