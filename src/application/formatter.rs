//! Output formatting for the CLI.
//!
//! Supports human-readable text and JSON.

use chrono::{DateTime, Local};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use serde::Serialize;

use crate::domain::{AppError, LogFileInfo, OperationalStatus, PersistedState, Result};

use super::log_engine::{EngineMaintenance, RecoveryOutcome};
use super::storage_manager::{format_bytes, MaintenanceReport, StorageSummary};

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON format for programmatic use.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {s}. Use: text, json")),
        }
    }
}

/// Serialize any report as pretty JSON.
///
/// # Errors
/// Returns error if serialization fails.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(AppError::json_parse)
}

/// Formats the persisted state record.
pub fn format_state(state: &PersistedState) -> String {
    let status = colored_status(state.status);
    let file = if state.current_log_file.is_empty() {
        "-".dimmed().to_string()
    } else {
        state.current_log_file.clone()
    };
    let last_error = if state.last_error.is_empty() {
        "none".dimmed().to_string()
    } else {
        state.last_error.red().to_string()
    };

    format!(
        "{}\n  Status: {status}\n  Current file: {file}\n  Storage mounted: {}\n  \
         Logging active: {}\n  Writes: {} ok, {} failed\n  Last good write: {} ms\n  \
         Last error: {last_error}",
        "📟 Logger State".bold(),
        yes_no(state.storage_mounted),
        yes_no(state.logging_active),
        state.total_writes.to_string().cyan(),
        state.failed_writes.to_string().yellow(),
        state.last_good_write_ms,
    )
}

/// Formats a table listing of log files.
pub fn format_files_table(files: &[LogFileInfo]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["File", "Size", "Modified", "Uptime"]);

    for file in files {
        let modified = file.modified.map_or_else(
            || "-".to_string(),
            |t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M:%S").to_string(),
        );
        let uptime = file
            .uptime_ms
            .map_or_else(|| "-".to_string(), |ms| format!("{:.3}s", ms as f64 / 1000.0));

        table.add_row(vec![
            truncate(&file.name, 40),
            format_bytes(file.size_bytes),
            modified,
            uptime,
        ]);
    }

    table.to_string()
}

/// Formats the storage summary for display.
pub fn format_summary(summary: &StorageSummary) -> String {
    format!(
        "{}\n  Files: {}\n  Log files: {}\n  Directories: {}\n  Total size: {}",
        "💾 Storage".bold(),
        summary.file_count.to_string().cyan(),
        summary.log_file_count.to_string().green(),
        summary.dir_count.to_string().cyan(),
        summary.total_human().yellow()
    )
}

/// Formats the combined engine and storage maintenance results.
pub fn format_maintenance(engine: &EngineMaintenance, storage: &MaintenanceReport) -> String {
    let mut out = format!("{}\n", "🧹 Maintenance".bold());

    if let Some(err) = &engine.flush_error {
        out.push_str(&format!("  Flush: {}\n", err.red()));
    }
    if let Some(file) = &engine.rotated_to {
        out.push_str(&format!("  Rotated to: {file}\n"));
    }
    out.push_str(&format!(
        "  Old files deleted: {} ({})\n",
        engine.cleanup.deleted_count,
        engine.cleanup.freed_human()
    ));
    if engine.statistics_reset {
        out.push_str("  Statistics reset after repeated overflows\n");
    }
    out.push_str(&format!(
        "  Temp files purged: {}\n  Log files checked: {}",
        storage.temp_files_removed, storage.files_checked
    ));

    for anomaly in &storage.anomalies {
        out.push_str(&format!(
            "\n  {} {} ({:?})",
            "⚠".yellow(),
            anomaly.name,
            anomaly.issue
        ));
    }

    out
}

/// Formats a recovery outcome.
pub fn format_recovery(outcome: &RecoveryOutcome) -> String {
    match outcome {
        RecoveryOutcome::Resumed { file } => format!("{} {file}", "✓ Resumed".green()),
        RecoveryOutcome::Fresh { file, reason } => {
            format!("{} {file}\n  Reason: {reason}", "✓ Started new file".yellow())
        }
    }
}

fn colored_status(status: OperationalStatus) -> String {
    let text = status.as_str();
    if status.is_fault() {
        text.red().bold().to_string()
    } else if status.accepts_records() {
        text.green().to_string()
    } else {
        text.yellow().to_string()
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// Truncates a string to max length with ellipsis.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
