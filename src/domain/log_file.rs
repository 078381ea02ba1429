//! Log file naming, header and record format.

use std::time::SystemTime;

use serde::Serialize;

use super::error::{AppError, Result};

/// Directory holding log files, relative to the card root.
pub const LOG_DIR: &str = "logs";
/// Directory reserved for backups.
pub const BACKUP_DIR: &str = "backups";
/// Scratch directory, purged on maintenance.
pub const TEMP_DIR: &str = "temp";

/// First line of every log file.
pub const LOG_HEADER: &str = "timestamp,flow_rate,temperature,pressure";

/// Tokens accepted as proof that a file starts with a log header.
const HEADER_TOKENS: &[&str] = &["timestamp", "flow_rate"];

const NAME_PREFIX: &str = "log_";
const NAME_EXTENSION: &str = ".csv";

/// Name for a log file created at `uptime_ms`, e.g. `logs/log_12_345.csv`.
#[must_use]
pub fn log_file_name(uptime_ms: u64) -> String {
    format!(
        "{LOG_DIR}/{NAME_PREFIX}{}_{:03}{NAME_EXTENSION}",
        uptime_ms / 1000,
        uptime_ms % 1000
    )
}

/// Same as [`log_file_name`] with a disambiguating suffix.
#[must_use]
pub fn log_file_name_with_suffix(uptime_ms: u64, suffix: u32) -> String {
    format!(
        "{LOG_DIR}/{NAME_PREFIX}{}_{:03}_{suffix}{NAME_EXTENSION}",
        uptime_ms / 1000,
        uptime_ms % 1000
    )
}

/// Recover the uptime embedded in a generated name.
///
/// Accepts bare names and names with a directory prefix.
#[must_use]
pub fn parse_uptime(name: &str) -> Option<u64> {
    let base = name.rsplit('/').next()?;
    let stem = base
        .strip_prefix(NAME_PREFIX)?
        .strip_suffix(NAME_EXTENSION)?;

    let mut parts = stem.split('_');
    let secs: u64 = parts.next()?.parse().ok()?;
    let millis: u64 = parts.next()?.parse().ok()?;
    if millis >= 1000 {
        return None;
    }
    secs.checked_mul(1000)?.checked_add(millis)
}

/// Whether a first line looks like a log header.
#[must_use]
pub fn is_log_header(line: &str) -> bool {
    HEADER_TOKENS.iter().any(|token| line.contains(token))
}

/// Reject records that would break the line-oriented file format.
pub fn validate_record(record: &str) -> Result<()> {
    if record.trim().is_empty() {
        return Err(AppError::validation("record is empty"));
    }
    if record.contains(['\n', '\r']) {
        return Err(AppError::validation("record contains a line break"));
    }
    Ok(())
}

/// Render a record, optionally prefixed with its millisecond timestamp.
#[must_use]
pub fn format_record(record: &str, timestamp_ms: Option<u64>) -> String {
    match timestamp_ms {
        Some(ts) => format!("{ts},{record}"),
        None => record.to_string(),
    }
}

/// A log file as seen on the medium.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogFileInfo {
    /// Path relative to the card root.
    pub name: String,
    pub size_bytes: u64,
    /// Wall-clock modification time, when the medium reports one.
    pub modified: Option<SystemTime>,
    /// Uptime parsed from the generated name.
    pub uptime_ms: Option<u64>,
}

impl LogFileInfo {
    /// Oldest-first ordering used by retention pruning.
    #[must_use]
    pub fn age_key(&self) -> (Option<SystemTime>, Option<u64>, &str) {
        (self.modified, self.uptime_ms, self.name.as_str())
    }
}
