//! Configuration models.
//!
//! Every field carries a serde default so a partial (or empty) config file
//! yields the firmware's stock behaviour.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::retry::{BackoffStrategy, RetryPolicy};

/// Buffering, flush and rotation policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Minimum time between accepted records (debounce).
    #[serde(default = "default_log_interval_ms")]
    pub log_interval_ms: u64,

    /// Buffered records that force a flush.
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Time since last flush that forces a flush.
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// Prefix each record with its millisecond timestamp.
    #[serde(default = "default_true")]
    pub timestamps: bool,

    /// Reopen the previously active file at boot.
    #[serde(default = "default_true")]
    pub auto_resume: bool,

    /// Rotate when the current file name grows past this length.
    #[serde(default = "default_max_filename_len")]
    pub max_filename_len: usize,

    /// Log files kept by retention pruning.
    #[serde(default = "default_retention_files")]
    pub retention_files: usize,

    /// Overflow count above which statistics are reset on maintenance.
    #[serde(default = "default_overflow_reset_threshold")]
    pub overflow_reset_threshold: u64,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_interval_ms: default_log_interval_ms(),
            buffer_capacity: default_buffer_capacity(),
            flush_interval_ms: default_flush_interval_ms(),
            timestamps: default_true(),
            auto_resume: default_true(),
            max_filename_len: default_max_filename_len(),
            retention_files: default_retention_files(),
            overflow_reset_threshold: default_overflow_reset_threshold(),
        }
    }
}

const fn default_log_interval_ms() -> u64 {
    1000
}

const fn default_buffer_capacity() -> usize {
    1000
}

const fn default_flush_interval_ms() -> u64 {
    30_000
}

const fn default_true() -> bool {
    true
}

const fn default_max_filename_len() -> usize {
    50
}

const fn default_retention_files() -> usize {
    10
}

const fn default_overflow_reset_threshold() -> u64 {
    10
}

/// Mount policy for the removable medium.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Mount attempts before giving up.
    #[serde(default = "default_mount_attempts")]
    pub mount_attempts: usize,

    /// Delay between mount attempts (base delay for growing strategies).
    #[serde(default = "default_mount_retry_delay_ms")]
    pub mount_retry_delay_ms: u64,

    /// Delay growth between attempts.
    #[serde(default)]
    pub backoff: BackoffStrategy,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mount_attempts: default_mount_attempts(),
            mount_retry_delay_ms: default_mount_retry_delay_ms(),
            backoff: BackoffStrategy::default(),
        }
    }
}

impl StorageConfig {
    /// Retry policy used by the boot-time mount loop.
    #[must_use]
    pub fn mount_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.backoff,
            self.mount_attempts,
            Duration::from_millis(self.mount_retry_delay_ms),
        )
    }
}

const fn default_mount_attempts() -> usize {
    3
}

const fn default_mount_retry_delay_ms() -> u64 {
    5000
}

/// Poll-loop pacing for the reference driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Interval between supervisor ticks.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Minimum time between recovery attempts while faulted.
    #[serde(default = "default_recovery_interval_ms")]
    pub recovery_interval_ms: u64,

    /// Interval between maintenance passes.
    #[serde(default = "default_maintenance_interval_secs")]
    pub maintenance_interval_secs: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            recovery_interval_ms: default_recovery_interval_ms(),
            maintenance_interval_secs: default_maintenance_interval_secs(),
        }
    }
}

const fn default_tick_ms() -> u64 {
    250
}

const fn default_recovery_interval_ms() -> u64 {
    10_000
}

const fn default_maintenance_interval_secs() -> u64 {
    3600
}

/// Path configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathConfig {
    /// Base data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logger: LoggerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub supervisor: SupervisorConfig,

    #[serde(default)]
    pub paths: PathConfig,
}

impl AppConfig {
    /// Get the data directory, using default if not configured.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.paths
            .data_dir
            .clone()
            .unwrap_or_else(Self::default_data_dir)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".flow-logger")
    }

    /// Directory standing in for the removable card.
    #[must_use]
    pub fn card_root(&self) -> PathBuf {
        self.data_dir().join("card")
    }

    /// Directory standing in for internal flash (persisted state).
    #[must_use]
    pub fn flash_dir(&self) -> PathBuf {
        self.data_dir().join("flash")
    }

    /// Get the config file path.
    #[must_use]
    pub fn config_file_path(&self) -> PathBuf {
        self.data_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.logger.log_interval_ms, 1000);
        assert_eq!(config.logger.buffer_capacity, 1000);
        assert_eq!(config.logger.flush_interval_ms, 30_000);
        assert!(config.logger.auto_resume);
        assert_eq!(config.storage.mount_attempts, 3);
        assert_eq!(config.storage.backoff, BackoffStrategy::Fixed);
        assert_eq!(config.supervisor.maintenance_interval_secs, 3600);
    }

    #[test]
    fn test_mount_policy_from_config() {
        let storage = StorageConfig {
            mount_attempts: 4,
            mount_retry_delay_ms: 250,
            backoff: BackoffStrategy::Fixed,
        };
        let policy = storage.mount_policy();
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(policy.delay_for_retry(2), Duration::from_millis(250));
    }

    #[test]
    fn test_paths_derive_from_data_dir() {
        let config = AppConfig {
            paths: PathConfig {
                data_dir: Some(PathBuf::from("/tmp/flow")),
            },
            ..Default::default()
        };
        assert_eq!(config.card_root(), PathBuf::from("/tmp/flow/card"));
        assert_eq!(config.flash_dir(), PathBuf::from("/tmp/flow/flash"));
        assert_eq!(config.config_file_path(), PathBuf::from("/tmp/flow/config.toml"));
    }
}
