//! Domain layer - core types, policies and error types.
//!
//! This layer contains pure models without any I/O.

pub mod config;
pub mod error;
pub mod log_file;
pub mod retry;
pub mod state;
pub mod status;

pub use config::{AppConfig, LoggerConfig, PathConfig, StorageConfig, SupervisorConfig};
pub use error::{AppError, Result};
pub use log_file::LogFileInfo;
pub use retry::{BackoffStrategy, RetryHandle, RetryPolicy};
pub use state::{MountSession, PersistedState, RecoveryPoint};
pub use status::OperationalStatus;
