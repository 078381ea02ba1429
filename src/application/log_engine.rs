//! Buffered, durable logging engine.
//!
//! Records are debounced, buffered in memory and flushed to the current log
//! file when the buffer fills or the flush interval passes. A flush either
//! writes every buffered record or leaves the buffer untouched, so a failed
//! flush is retried in full later (at-least-once delivery). After each
//! successful flush a recovery point is persisted so the next boot can
//! resume the same file.

use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::domain::log_file::{format_record, is_log_header, validate_record};
use crate::domain::{AppError, LoggerConfig, OperationalStatus, Result, RetryPolicy};
use crate::infrastructure::Clock;

use super::state_machine::StateMachine;
use super::storage_manager::{format_bytes, CleanupResult, MaintenanceReport, StorageManager};

/// What happened to a record handed to [`LogEngine::log_data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutcome {
    /// Accepted and waiting in the buffer.
    Buffered,
    /// Accepted and the buffer was flushed.
    Flushed,
    /// Dropped: arrived inside the debounce interval.
    Throttled,
}

/// How [`LogEngine::attempt_recovery`] settled on a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum RecoveryOutcome {
    /// The previously active file was validated and reopened.
    Resumed { file: String },
    /// Resume was not possible; a new file was created.
    Fresh { file: String, reason: String },
}

impl RecoveryOutcome {
    #[must_use]
    pub fn file(&self) -> &str {
        match self {
            Self::Resumed { file } | Self::Fresh { file, .. } => file,
        }
    }
}

impl fmt::Display for RecoveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resumed { file } => write!(f, "Resumed {file}"),
            Self::Fresh { file, reason } => write!(f, "Started {file} ({reason})"),
        }
    }
}

/// Outcome of [`LogEngine::perform_maintenance`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineMaintenance {
    /// Error from the forced flush, if it failed.
    pub flush_error: Option<String>,
    /// New file when the current one was rotated.
    pub rotated_to: Option<String>,
    pub cleanup: CleanupResult,
    pub statistics_reset: bool,
}

/// Point-in-time view of the engine.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    pub status: OperationalStatus,
    pub ready: bool,
    pub storage_mounted: bool,
    pub logging_active: bool,
    pub current_file: Option<String>,
    pub buffer_size: usize,
    pub buffer_capacity: usize,
    pub buffer_utilization_pct: f64,
    pub total_bytes_logged: u64,
    pub records_accepted: u64,
    pub flush_count: u64,
    pub overflow_count: u64,
    pub avg_bytes_per_flush: u64,
    pub ms_since_last_flush: u64,
    pub total_writes: u64,
    pub failed_writes: u64,
    pub last_error: String,
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Logger Diagnostics ===")?;
        writeln!(f, "Status: {}", self.status)?;
        writeln!(f, "Ready: {}", if self.ready { "yes" } else { "no" })?;
        writeln!(
            f,
            "Storage: {}",
            if self.storage_mounted { "mounted" } else { "not mounted" }
        )?;
        writeln!(
            f,
            "Logging: {}",
            if self.logging_active { "active" } else { "stopped" }
        )?;
        writeln!(
            f,
            "Current File: {}",
            self.current_file.as_deref().unwrap_or("-")
        )?;
        writeln!(
            f,
            "Buffer: {}/{} ({:.1}%)",
            self.buffer_size, self.buffer_capacity, self.buffer_utilization_pct
        )?;
        writeln!(f, "Total Data Logged: {}", format_bytes(self.total_bytes_logged))?;
        writeln!(f, "Records Accepted: {}", self.records_accepted)?;
        writeln!(f, "Buffer Flushes: {}", self.flush_count)?;
        writeln!(f, "Buffer Overflows: {}", self.overflow_count)?;
        writeln!(f, "Average Bytes/Flush: {}", self.avg_bytes_per_flush)?;
        writeln!(f, "Time Since Last Flush: {} ms", self.ms_since_last_flush)?;
        writeln!(
            f,
            "Writes: {} ok, {} failed",
            self.total_writes, self.failed_writes
        )?;
        write!(
            f,
            "Last Error: {}",
            if self.last_error.is_empty() {
                "none"
            } else {
                &self.last_error
            }
        )
    }
}

/// The logging engine. Owns the state machine and storage manager.
pub struct LogEngine {
    config: LoggerConfig,
    state: StateMachine,
    storage: StorageManager,
    clock: Rc<dyn Clock>,
    buffer: Vec<String>,
    current_file: Option<String>,
    last_accepted_ms: Option<u64>,
    last_flush_ms: u64,
    total_bytes: u64,
    records_accepted: u64,
    flush_count: u64,
    overflow_count: u64,
}

impl LogEngine {
    #[must_use]
    pub fn new(
        config: LoggerConfig,
        state: StateMachine,
        storage: StorageManager,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let last_flush_ms = clock.now_millis();
        Self {
            config,
            state,
            storage,
            clock,
            buffer: Vec::new(),
            current_file: None,
            last_accepted_ms: None,
            last_flush_ms,
            total_bytes: 0,
            records_accepted: 0,
            flush_count: 0,
            overflow_count: 0,
        }
    }

    /// Boot the whole stack: load state, bring up storage, open a log file
    /// and enter `READY`.
    ///
    /// # Errors
    /// Returns the storage or file error after moving to `ERROR`.
    pub fn start(&mut self) -> Result<()> {
        self.state.initialize();
        self.state.transition_to(OperationalStatus::Initializing)?;

        if let Err(e) = self.storage.initialize(&mut self.state) {
            self.enter_error(&e);
            return Err(e);
        }

        if let Err(e) = self.initialize() {
            self.enter_error(&e);
            return Err(e);
        }

        self.state.transition_to(OperationalStatus::Ready)?;
        tracing::info!(file = ?self.current_file, "Logger started");
        Ok(())
    }

    fn enter_error(&mut self, err: &AppError) {
        self.state.log_error(err.to_string());
        if let Err(e) = self.state.transition_to(OperationalStatus::Error) {
            tracing::warn!(error = %e, "Could not enter error state");
        }
    }

    /// Prepare the buffer and choose the log file: resume the previous one
    /// when allowed and valid, otherwise create a new one.
    ///
    /// # Errors
    /// Returns error if a new file is needed and cannot be created.
    pub fn initialize(&mut self) -> Result<()> {
        self.buffer.clear();
        self.buffer.reserve(self.buffer_capacity());
        self.last_flush_ms = self.clock.now_millis();

        if self.config.auto_resume {
            match self.resume_previous() {
                Ok(file) => {
                    tracing::info!(file = %file, "Resumed previous log file");
                    self.current_file = Some(file);
                    return Ok(());
                }
                Err(e) => tracing::info!(reason = %e, "Starting a new log file"),
            }
        }

        self.open_new_file()?;
        Ok(())
    }

    fn resume_previous(&self) -> Result<String> {
        let file = self.state.current_log_file().to_string();
        if file.is_empty() {
            return Err(AppError::ResumeRejected {
                reason: "no previous log file".to_string(),
            });
        }
        self.validate_log_file(&file)?;
        Ok(file)
    }

    /// Check that `name` is present on a mounted medium and starts with a
    /// log header.
    ///
    /// # Errors
    /// Returns `ResumeRejected` naming the failed check.
    pub fn validate_log_file(&self, name: &str) -> Result<()> {
        let reject = |reason: String| AppError::ResumeRejected { reason };

        if !self.storage.is_mounted() {
            return Err(reject("storage not mounted".to_string()));
        }
        if !self.storage.exists(name) {
            return Err(reject(format!("{name} does not exist")));
        }

        let header = self
            .storage
            .read_first_line(name)
            .map_err(|e| reject(format!("cannot read header of {name}: {e}")))?;
        if !is_log_header(&header) {
            return Err(reject(format!("{name} has no log header")));
        }
        Ok(())
    }

    fn open_new_file(&mut self) -> Result<String> {
        let file = self.storage.create_new_log_file(&mut self.state)?;
        self.state.set_current_log_file(&file);
        self.current_file = Some(file.clone());

        // The recovery point must name the file records now go to.
        if let Err(e) = self.state.create_recovery_point() {
            tracing::warn!(error = %e, "Failed to save recovery point");
        }
        Ok(file)
    }

    /// Ready means: status accepts records, storage is mounted and a file
    /// is open. Checked afresh on every call.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state.status().accepts_records()
            && self.storage.is_mounted()
            && self.current_file.is_some()
    }

    /// Accept one record.
    ///
    /// # Errors
    /// Returns `Validation` for empty or multi-line records, `NotReady` when
    /// the engine cannot accept records, or the storage error when a
    /// triggered flush fails. A failed flush keeps the record buffered.
    pub fn log_data(&mut self, record: &str) -> Result<LogOutcome> {
        validate_record(record)?;
        if !self.is_ready() {
            return Err(AppError::NotReady);
        }

        let now = self.clock.now_millis();
        if let Some(last) = self.last_accepted_ms {
            if now.saturating_sub(last) < self.config.log_interval_ms {
                return Ok(LogOutcome::Throttled);
            }
        }
        self.last_accepted_ms = Some(now);

        let line = format_record(record, self.config.timestamps.then_some(now));
        self.total_bytes += line.len() as u64;
        self.records_accepted += 1;
        self.buffer.push(line);

        let flush_due = if self.buffer.len() >= self.buffer_capacity() {
            self.overflow_count += 1;
            tracing::warn!(
                size = self.buffer.len(),
                overflows = self.overflow_count,
                "Buffer full, forcing flush"
            );
            true
        } else {
            self.flush_interval_elapsed(now)
        };

        if !flush_due {
            return Ok(LogOutcome::Buffered);
        }

        match self.flush() {
            Ok(()) => Ok(LogOutcome::Flushed),
            Err(e) => {
                self.state.increment_failed_writes();
                Err(e)
            }
        }
    }

    fn flush_interval_elapsed(&self, now: u64) -> bool {
        now.saturating_sub(self.last_flush_ms) > self.config.flush_interval_ms
    }

    /// Append every buffered record, in order. The buffer is cleared only
    /// if all appends succeed.
    fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let Some(file) = self.current_file.clone() else {
            let err = AppError::NoActiveFile;
            self.state.log_error(err.to_string());
            return Err(err);
        };

        for record in &self.buffer {
            self.storage.append_data(&mut self.state, &file, record)?;
        }

        let flushed = self.buffer.len();
        self.buffer.clear();
        self.flush_count += 1;
        self.last_flush_ms = self.clock.now_millis();

        if let Err(e) = self.state.create_recovery_point() {
            tracing::warn!(error = %e, "Failed to save recovery point");
        }

        tracing::debug!(records = flushed, file = %file, "Buffer flushed");
        Ok(())
    }

    /// Periodic flush check and readiness re-check.
    ///
    /// # Errors
    /// Returns `NotReady` (after moving to `ERROR`) when the engine is no
    /// longer ready, otherwise the error of a due flush that failed.
    pub fn update(&mut self) -> Result<()> {
        let now = self.clock.now_millis();
        let flush_due = !self.buffer.is_empty()
            && (self.buffer.len() >= self.buffer_capacity() || self.flush_interval_elapsed(now));

        let flushed = if flush_due {
            self.flush().inspect_err(|_| self.state.increment_failed_writes())
        } else {
            Ok(())
        };

        if !self.is_ready() {
            if self.state.status() != OperationalStatus::Error {
                self.enter_error(&AppError::NotReady);
            }
            return Err(AppError::NotReady);
        }

        flushed
    }

    /// Flush now.
    ///
    /// # Errors
    /// Returns the flush error; the failed-write counter is incremented.
    pub fn force_flush_buffer(&mut self) -> Result<()> {
        self.flush().inspect_err(|_| self.state.increment_failed_writes())
    }

    /// Flush, close the current file and start a new one.
    ///
    /// # Errors
    /// Returns the flush error (the switch is aborted) or the file creation
    /// error.
    pub fn switch_log_file(&mut self) -> Result<String> {
        self.force_flush_buffer()?;
        self.close_current_file();
        let file = self.open_new_file()?;
        tracing::info!(file = %file, "Switched log file");
        Ok(file)
    }

    /// Forget the current file here and in the persisted state.
    pub fn close_current_file(&mut self) {
        if let Some(file) = self.current_file.take() {
            tracing::info!(file = %file, "Closed log file");
        }
        self.state.set_current_log_file("");
    }

    /// Resume the file named by the persisted state, or start a new one.
    ///
    /// # Errors
    /// Returns error if a new file is needed and cannot be created.
    pub fn attempt_recovery(&mut self) -> Result<RecoveryOutcome> {
        match self.resume_previous() {
            Ok(file) => {
                tracing::info!(file = %file, "Recovery resumed log file");
                self.current_file = Some(file.clone());
                Ok(RecoveryOutcome::Resumed { file })
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::info!(reason = %reason, "Recovery falling back to a new log file");
                let file = self.open_new_file()?;
                Ok(RecoveryOutcome::Fresh { file, reason })
            }
        }
    }

    /// Remove the persisted recovery point and tidy the medium.
    ///
    /// # Errors
    /// Returns error if the recovery point cannot be removed or storage
    /// maintenance fails.
    pub fn clear_recovery_data(&mut self) -> Result<()> {
        self.state.clear_recovery_point()?;
        if self.storage.is_mounted() {
            self.storage.perform_maintenance()?;
        }
        Ok(())
    }

    /// Flush, rotate an over-long file name, prune old files and reset
    /// statistics after repeated overflows.
    ///
    /// # Errors
    /// Returns error if rotation or pruning fails. A failed flush is
    /// reported in the result instead.
    pub fn perform_maintenance(&mut self) -> Result<EngineMaintenance> {
        let mut report = EngineMaintenance::default();

        if let Err(e) = self.force_flush_buffer() {
            tracing::warn!(error = %e, "Maintenance flush failed");
            report.flush_error = Some(e.to_string());
        }

        let too_long = self
            .current_file
            .as_ref()
            .is_some_and(|f| f.len() > self.config.max_filename_len);
        if too_long && report.flush_error.is_none() {
            report.rotated_to = Some(self.switch_log_file()?);
        }

        report.cleanup = self
            .storage
            .cleanup_old_files(self.config.retention_files, self.current_file.as_deref())?;

        if self.overflow_count > self.config.overflow_reset_threshold {
            self.reset_statistics();
            report.statistics_reset = true;
        }

        tracing::info!(
            deleted = report.cleanup.deleted_count,
            rotated = report.rotated_to.is_some(),
            "Logger maintenance complete"
        );
        Ok(report)
    }

    /// Storage-side maintenance: purge `temp/` and verify log files.
    ///
    /// # Errors
    /// Returns error if the medium is not mounted or cannot be listed.
    pub fn storage_maintenance(&mut self) -> Result<MaintenanceReport> {
        self.storage.perform_maintenance()
    }

    /// Try to mount again and restore the directory layout.
    ///
    /// # Errors
    /// Returns the mount or directory error.
    pub fn remount_storage(&mut self, policy: &RetryPolicy) -> Result<()> {
        self.storage.mount_with(&mut self.state, policy)?;
        self.storage.create_directory_structure()
    }

    /// Record that the medium disappeared underneath us.
    pub fn mark_storage_lost(&mut self) {
        self.storage.unmount(&mut self.state);
        self.state.log_error("Storage no longer mounted");
    }

    /// Start accepting records for the driver.
    ///
    /// # Errors
    /// Returns `NotMounted` when storage is not reported mounted, or the
    /// error of the initial flush.
    pub fn start_logging(&mut self) -> Result<()> {
        if !self.state.is_storage_mounted() {
            let err = AppError::NotMounted {
                operation: "start logging",
            };
            self.state.log_error(err.to_string());
            return Err(err);
        }

        self.state.set_logging_active(true);
        let status = self.state.status();
        if status != OperationalStatus::Logging
            && status.can_transition_to(OperationalStatus::Logging)
        {
            self.state.transition_to(OperationalStatus::Logging)?;
        }
        tracing::info!("Logging started");
        self.force_flush_buffer()
    }

    /// Stop accepting records for the driver.
    ///
    /// # Errors
    /// Returns the error of the final flush.
    pub fn stop_logging(&mut self) -> Result<()> {
        self.state.set_logging_active(false);
        tracing::info!("Logging stopped");
        self.force_flush_buffer()
    }

    /// Flush, save a recovery point and release storage. The persisted
    /// current file is kept so the next boot resumes it.
    ///
    /// # Errors
    /// Returns the flush error or the final state save error. Shutdown
    /// completes either way.
    pub fn shutdown(&mut self) -> Result<()> {
        let flushed = self.force_flush_buffer();
        if let Err(e) = &flushed {
            tracing::warn!(
                error = %e,
                pending = self.buffer.len(),
                "Final flush failed, buffered records are lost"
            );
        }

        if let Err(e) = self.state.create_recovery_point() {
            tracing::warn!(error = %e, "Failed to save recovery point");
        }
        self.state.set_logging_active(false);
        self.current_file = None;
        self.storage.unmount(&mut self.state);
        self.state.save_state()?;

        tracing::info!("Logger shut down");
        flushed
    }

    /// Read-only snapshot of the engine.
    #[must_use]
    pub fn diagnostics(&self) -> Diagnostics {
        let capacity = self.buffer_capacity();
        let snapshot = self.state.snapshot();
        Diagnostics {
            status: snapshot.status,
            ready: self.is_ready(),
            storage_mounted: self.storage.is_mounted(),
            logging_active: snapshot.logging_active,
            current_file: self.current_file.clone(),
            buffer_size: self.buffer.len(),
            buffer_capacity: capacity,
            buffer_utilization_pct: self.buffer.len() as f64 * 100.0 / capacity as f64,
            total_bytes_logged: self.total_bytes,
            records_accepted: self.records_accepted,
            flush_count: self.flush_count,
            overflow_count: self.overflow_count,
            avg_bytes_per_flush: self.total_bytes.checked_div(self.flush_count).unwrap_or(0),
            ms_since_last_flush: self.clock.now_millis().saturating_sub(self.last_flush_ms),
            total_writes: snapshot.total_writes,
            failed_writes: snapshot.failed_writes,
            last_error: snapshot.last_error.clone(),
        }
    }

    /// Zero the byte, flush and overflow statistics. The accepted-record
    /// count tracks the persisted write counter and is kept.
    pub fn reset_statistics(&mut self) {
        self.total_bytes = 0;
        self.flush_count = 0;
        self.overflow_count = 0;
        tracing::info!("Statistics reset");
    }

    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub fn buffer_capacity(&self) -> usize {
        self.config.buffer_capacity.max(1)
    }

    #[must_use]
    pub fn total_data_logged(&self) -> u64 {
        self.total_bytes
    }

    #[must_use]
    pub fn records_accepted(&self) -> u64 {
        self.records_accepted
    }

    #[must_use]
    pub fn buffer_flush_count(&self) -> u64 {
        self.flush_count
    }

    #[must_use]
    pub fn buffer_overflows(&self) -> u64 {
        self.overflow_count
    }

    #[must_use]
    pub fn current_file(&self) -> Option<&str> {
        self.current_file.as_deref()
    }

    #[must_use]
    pub fn state(&self) -> &StateMachine {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut StateMachine {
        &mut self.state
    }

    #[must_use]
    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }
}
