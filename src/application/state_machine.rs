//! Persisted operational state machine.
//!
//! Owns the device's operating mode, counters and last error. Every mutation
//! is written through to the state store so a power cut loses at most the
//! mutation in flight.

use std::rc::Rc;

use crate::domain::{AppError, OperationalStatus, PersistedState, RecoveryPoint, Result};
use crate::infrastructure::{Clock, StateCodec, StateStore, RECOVERY_FILE, STATE_FILE};

/// Guarded status transitions plus write-through persisted state.
pub struct StateMachine {
    state: PersistedState,
    store: Box<dyn StateStore>,
    codec: Box<dyn StateCodec>,
    clock: Rc<dyn Clock>,
}

impl StateMachine {
    /// Create a state machine with default state. Nothing is loaded until
    /// [`StateMachine::initialize`].
    #[must_use]
    pub fn new(
        store: Box<dyn StateStore>,
        codec: Box<dyn StateCodec>,
        clock: Rc<dyn Clock>,
    ) -> Self {
        Self {
            state: PersistedState::default(),
            store,
            codec,
            clock,
        }
    }

    /// Load the persisted record and start a new boot.
    ///
    /// A missing or unreadable record is not fatal; defaults are used.
    /// Counters and timestamps always restart at boot.
    pub fn initialize(&mut self) {
        match self.store.read(STATE_FILE) {
            Ok(Some(text)) => self.codec.decode_state(&text, &mut self.state),
            Ok(None) => tracing::info!("No persisted state found, using defaults"),
            Err(e) => tracing::warn!(error = %e, "Failed to load persisted state, using defaults"),
        }

        self.state.start_ms = self.clock.now_millis();
        self.state.last_good_write_ms = 0;
        self.state.total_writes = 0;
        self.state.failed_writes = 0;
        self.persist();

        tracing::info!(
            status = %self.state.status,
            current_file = %self.state.current_log_file,
            "State machine initialized"
        );
    }

    /// Move to `target` if the transition table allows it.
    ///
    /// # Errors
    /// Returns `InvalidTransition` and leaves the status unchanged when the
    /// transition is not allowed.
    pub fn transition_to(&mut self, target: OperationalStatus) -> Result<()> {
        let from = self.state.status;
        if !from.can_transition_to(target) {
            tracing::warn!(%from, to = %target, "Rejected status transition");
            return Err(AppError::InvalidTransition { from, to: target });
        }

        self.state.status = target;
        self.persist();
        tracing::info!(%from, to = %target, "Status changed");
        Ok(())
    }

    #[must_use]
    pub fn status(&self) -> OperationalStatus {
        self.state.status
    }

    #[must_use]
    pub fn status_str(&self) -> &'static str {
        self.state.status.as_str()
    }

    /// Full persisted record as currently held in memory.
    #[must_use]
    pub fn snapshot(&self) -> &PersistedState {
        &self.state
    }

    #[must_use]
    pub fn is_logging_active(&self) -> bool {
        self.state.logging_active
    }

    #[must_use]
    pub fn is_storage_mounted(&self) -> bool {
        self.state.storage_mounted
    }

    #[must_use]
    pub fn current_log_file(&self) -> &str {
        &self.state.current_log_file
    }

    #[must_use]
    pub fn last_error(&self) -> &str {
        &self.state.last_error
    }

    #[must_use]
    pub fn total_writes(&self) -> u64 {
        self.state.total_writes
    }

    #[must_use]
    pub fn failed_writes(&self) -> u64 {
        self.state.failed_writes
    }

    #[must_use]
    pub fn last_good_write_ms(&self) -> u64 {
        self.state.last_good_write_ms
    }

    /// Milliseconds since this boot's initialization.
    #[must_use]
    pub fn uptime_ms(&self) -> u64 {
        self.clock.now_millis().saturating_sub(self.state.start_ms)
    }

    /// Replace the last error. Only the most recent message is kept.
    pub fn log_error(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref().replace(['\n', '\r'], " ");
        tracing::error!(status = %self.state.status, "{message}");
        self.state.last_error = message;
        self.persist();
    }

    pub fn clear_last_error(&mut self) {
        if !self.state.last_error.is_empty() {
            self.state.last_error.clear();
            self.persist();
        }
    }

    pub fn increment_writes(&mut self) {
        self.state.total_writes += 1;
        self.persist();
    }

    pub fn increment_failed_writes(&mut self) {
        self.state.failed_writes += 1;
        self.persist();
    }

    /// Count a successful storage write made at `timestamp_ms`.
    pub fn record_write(&mut self, timestamp_ms: u64) {
        self.state.total_writes += 1;
        self.state.last_good_write_ms = timestamp_ms;
        self.persist();
    }

    pub fn set_current_log_file(&mut self, name: &str) {
        self.state.current_log_file = name.to_string();
        self.persist();
    }

    pub fn set_storage_mounted(&mut self, mounted: bool) {
        self.state.storage_mounted = mounted;
        self.persist();
    }

    pub fn set_logging_active(&mut self, active: bool) {
        self.state.logging_active = active;
        self.persist();
    }

    pub fn set_last_good_write_time(&mut self, timestamp_ms: u64) {
        self.state.last_good_write_ms = timestamp_ms;
        self.persist();
    }

    /// Persist the current record, surfacing any failure.
    ///
    /// # Errors
    /// Returns error if the state store rejects the write.
    pub fn save_state(&mut self) -> Result<()> {
        let text = self.codec.encode_state(&self.state);
        self.store.write(STATE_FILE, &text)
    }

    /// Write-through after a mutation. The in-memory record stays
    /// authoritative if the store fails.
    fn persist(&mut self) {
        if let Err(e) = self.save_state() {
            tracing::warn!(error = %e, "Failed to persist state");
        }
    }

    /// Snapshot the resumable fields into the recovery record.
    ///
    /// # Errors
    /// Returns error if the state store rejects the write.
    pub fn create_recovery_point(&mut self) -> Result<RecoveryPoint> {
        let point = RecoveryPoint::from_state(&self.state, self.clock.now_millis());
        self.store
            .write(RECOVERY_FILE, &self.codec.encode_recovery(&point))?;
        tracing::debug!(
            file = %point.current_log_file,
            total_writes = point.total_writes,
            "Recovery point saved"
        );
        Ok(point)
    }

    /// Read the recovery record without applying it.
    ///
    /// # Errors
    /// Returns `NoRecoveryPoint` when no record exists or it names no file.
    pub fn load_recovery_point(&self) -> Result<RecoveryPoint> {
        let text = self
            .store
            .read(RECOVERY_FILE)?
            .ok_or(AppError::NoRecoveryPoint)?;
        let point = self.codec.decode_recovery(&text);
        if point.is_resumable() {
            Ok(point)
        } else {
            Err(AppError::NoRecoveryPoint)
        }
    }

    /// Restore the recovery record into the live state and enter
    /// `RECOVERING`.
    ///
    /// The fields are restored even when the current status does not allow
    /// entering `RECOVERING`; the rejected transition is only logged.
    ///
    /// # Errors
    /// Returns `NoRecoveryPoint` when there is nothing to resume.
    pub fn attempt_recovery(&mut self) -> Result<RecoveryPoint> {
        let point = self.load_recovery_point()?;

        self.state.last_good_write_ms = point.last_good_write_ms;
        self.state.current_log_file.clone_from(&point.current_log_file);
        self.state.total_writes = point.total_writes;
        self.persist();

        if let Err(e) = self.transition_to(OperationalStatus::Recovering) {
            tracing::warn!(error = %e, "Recovery point restored outside of error state");
        }

        tracing::info!(
            file = %point.current_log_file,
            total_writes = point.total_writes,
            "Recovered from recovery point"
        );
        Ok(point)
    }

    /// Delete the recovery record.
    ///
    /// # Errors
    /// Returns error if the state store fails to remove it.
    pub fn clear_recovery_point(&mut self) -> Result<()> {
        self.store.remove(RECOVERY_FILE)?;
        tracing::info!("Recovery point cleared");
        Ok(())
    }
}
