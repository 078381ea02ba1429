//! Persisted and transient state records.
//!
//! `PersistedState` is the device's durable memory: it is rewritten on
//! every mutation. `RecoveryPoint` is the small snapshot written after each
//! successful flush. `MountSession` lives only as long as the process.

use serde::{Deserialize, Serialize};

use super::status::OperationalStatus;

/// State record written through on every mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    /// Current operating mode.
    pub status: OperationalStatus,
    /// Uptime (ms) of the last successful storage write.
    pub last_good_write_ms: u64,
    /// Uptime (ms) at which this boot's state machine initialized.
    pub start_ms: u64,
    /// Name of the current log file, empty when none.
    pub current_log_file: String,
    /// Whether the medium was mounted when last reported.
    pub storage_mounted: bool,
    /// Whether the logger is accepting records.
    pub logging_active: bool,
    /// Successful storage writes since boot.
    pub total_writes: u64,
    /// Failed flushes since boot.
    pub failed_writes: u64,
    /// Most recent error message, empty when none.
    pub last_error: String,
}

/// Snapshot used to resume after an uncontrolled restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryPoint {
    pub last_good_write_ms: u64,
    pub current_log_file: String,
    pub total_writes: u64,
    /// Uptime (ms) at which the point was written.
    pub created_at_ms: u64,
}

impl RecoveryPoint {
    /// Capture the resumable fields of a state record.
    #[must_use]
    pub fn from_state(state: &PersistedState, created_at_ms: u64) -> Self {
        Self {
            last_good_write_ms: state.last_good_write_ms,
            current_log_file: state.current_log_file.clone(),
            total_writes: state.total_writes,
            created_at_ms,
        }
    }

    /// A point is only usable when it names a log file.
    #[must_use]
    pub fn is_resumable(&self) -> bool {
        !self.current_log_file.is_empty()
    }
}

/// Transient record of the current mount lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MountSession {
    pub mounted: bool,
    /// Attempts made by the last mount call; reset to 0 on success.
    pub mount_attempts: usize,
    /// Uptime (ms) of the last successful mount.
    pub last_mount_ms: Option<u64>,
    pub last_error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = PersistedState::default();
        assert_eq!(state.status, OperationalStatus::Initializing);
        assert!(state.current_log_file.is_empty());
        assert!(!state.logging_active);
        assert_eq!(state.total_writes, 0);
    }

    #[test]
    fn test_recovery_point_from_state() {
        let state = PersistedState {
            current_log_file: "logs/log_1_500.csv".into(),
            total_writes: 42,
            last_good_write_ms: 9_000,
            ..Default::default()
        };

        let point = RecoveryPoint::from_state(&state, 10_000);
        assert_eq!(point.total_writes, 42);
        assert_eq!(point.last_good_write_ms, 9_000);
        assert_eq!(point.created_at_ms, 10_000);
        assert!(point.is_resumable());
        assert!(!RecoveryPoint::default().is_resumable());
    }
}
