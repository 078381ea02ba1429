//! Application layer - use cases and orchestration.
//!
//! This layer contains the state machine, storage lifecycle and logging
//! engine, plus the poll-loop supervisor and CLI output formatting.

pub mod formatter;
pub mod log_engine;
pub mod state_machine;
pub mod storage_manager;
pub mod supervisor;

pub use formatter::{
    format_files_table, format_maintenance, format_recovery, format_state, format_summary,
    to_json, OutputFormat,
};
pub use log_engine::{Diagnostics, EngineMaintenance, LogEngine, LogOutcome, RecoveryOutcome};
pub use state_machine::StateMachine;
pub use storage_manager::{
    format_bytes, CleanupResult, FileAnomaly, FileIssue, MaintenanceReport, StorageManager,
    StorageSummary,
};
pub use supervisor::{Supervisor, TickReport};
