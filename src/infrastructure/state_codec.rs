//! Text encoding of persisted records.
//!
//! The on-flash format is one `key=value` pair per line. Loading is
//! forgiving: lines without `=` (or with an empty key) are skipped, unknown
//! keys are ignored and unparseable numbers leave the field untouched, so
//! newer firmware can add keys without breaking older readers.

use std::str::FromStr;

use crate::domain::{OperationalStatus, PersistedState, RecoveryPoint};

/// Serialization seam between state records and their stored text.
pub trait StateCodec {
    fn encode_state(&self, state: &PersistedState) -> String;

    /// Overlay whatever `text` contains onto `state`.
    fn decode_state(&self, text: &str, state: &mut PersistedState);

    fn encode_recovery(&self, point: &RecoveryPoint) -> String;

    /// Overlay whatever `text` contains onto a default point.
    fn decode_recovery(&self, text: &str) -> RecoveryPoint;
}

/// Line-oriented `key=value` codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyValueCodec;

mod keys {
    pub const STATUS: &str = "status";
    pub const LAST_WRITE_TIME: &str = "lastWriteTime";
    pub const START_TIME: &str = "startTime";
    pub const CURRENT_LOG_FILE: &str = "currentLogFile";
    pub const SD_MOUNTED: &str = "sdMounted";
    pub const LOGGING_ACTIVE: &str = "loggingActive";
    pub const TOTAL_WRITES: &str = "totalWrites";
    pub const FAILED_WRITES: &str = "failedWrites";
    pub const LAST_ERROR: &str = "lastError";
    pub const TIMESTAMP: &str = "timestamp";
}

impl StateCodec for KeyValueCodec {
    fn encode_state(&self, state: &PersistedState) -> String {
        encode_pairs(&[
            (keys::STATUS, state.status.code().to_string()),
            (keys::LAST_WRITE_TIME, state.last_good_write_ms.to_string()),
            (keys::START_TIME, state.start_ms.to_string()),
            (keys::CURRENT_LOG_FILE, state.current_log_file.clone()),
            (keys::SD_MOUNTED, encode_bool(state.storage_mounted)),
            (keys::LOGGING_ACTIVE, encode_bool(state.logging_active)),
            (keys::TOTAL_WRITES, state.total_writes.to_string()),
            (keys::FAILED_WRITES, state.failed_writes.to_string()),
            (keys::LAST_ERROR, state.last_error.clone()),
        ])
    }

    fn decode_state(&self, text: &str, state: &mut PersistedState) {
        for (key, value) in pairs(text) {
            match key {
                keys::STATUS => {
                    state.status = value
                        .parse::<u8>()
                        .ok()
                        .and_then(OperationalStatus::from_code)
                        .unwrap_or_else(|| {
                            tracing::warn!(value, "Persisted status out of range, resetting");
                            OperationalStatus::Initializing
                        });
                }
                keys::LAST_WRITE_TIME => parse_into(value, &mut state.last_good_write_ms),
                keys::START_TIME => parse_into(value, &mut state.start_ms),
                keys::CURRENT_LOG_FILE => state.current_log_file = value.to_string(),
                keys::SD_MOUNTED => state.storage_mounted = decode_bool(value),
                keys::LOGGING_ACTIVE => state.logging_active = decode_bool(value),
                keys::TOTAL_WRITES => parse_into(value, &mut state.total_writes),
                keys::FAILED_WRITES => parse_into(value, &mut state.failed_writes),
                keys::LAST_ERROR => state.last_error = value.to_string(),
                _ => tracing::trace!(key, "Ignoring unknown state key"),
            }
        }
    }

    fn encode_recovery(&self, point: &RecoveryPoint) -> String {
        encode_pairs(&[
            (keys::LAST_WRITE_TIME, point.last_good_write_ms.to_string()),
            (keys::CURRENT_LOG_FILE, point.current_log_file.clone()),
            (keys::TOTAL_WRITES, point.total_writes.to_string()),
            (keys::TIMESTAMP, point.created_at_ms.to_string()),
        ])
    }

    fn decode_recovery(&self, text: &str) -> RecoveryPoint {
        let mut point = RecoveryPoint::default();
        for (key, value) in pairs(text) {
            match key {
                keys::LAST_WRITE_TIME => parse_into(value, &mut point.last_good_write_ms),
                keys::CURRENT_LOG_FILE => point.current_log_file = value.to_string(),
                keys::TOTAL_WRITES => parse_into(value, &mut point.total_writes),
                keys::TIMESTAMP => parse_into(value, &mut point.created_at_ms),
                _ => tracing::trace!(key, "Ignoring unknown recovery key"),
            }
        }
        point
    }
}

fn encode_pairs(pairs: &[(&str, String)]) -> String {
    let mut out = String::new();
    for (key, value) in pairs {
        out.push_str(key);
        out.push('=');
        // Values never span lines; the loader is line-oriented.
        out.push_str(&value.replace(['\n', '\r'], " "));
        out.push('\n');
    }
    out
}

/// Well-formed `(key, value)` pairs; everything else is skipped.
fn pairs(text: &str) -> impl Iterator<Item = (&str, &str)> {
    text.lines().filter_map(|line| {
        let (key, value) = line.trim().split_once('=')?;
        let key = key.trim();
        if key.is_empty() {
            None
        } else {
            Some((key, value.trim()))
        }
    })
}

fn parse_into<T: FromStr>(value: &str, field: &mut T) {
    match value.parse() {
        Ok(parsed) => *field = parsed,
        Err(_) => tracing::debug!(value, "Skipping unparseable persisted value"),
    }
}

fn encode_bool(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

fn decode_bool(value: &str) -> bool {
    value == "1"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> PersistedState {
        PersistedState {
            status: OperationalStatus::Logging,
            last_good_write_ms: 4_200,
            start_ms: 10,
            current_log_file: "logs/log_1_000.csv".into(),
            storage_mounted: true,
            logging_active: true,
            total_writes: 17,
            failed_writes: 2,
            last_error: "Failed to append data to: logs/log_1_000.csv".into(),
        }
    }

    #[test]
    fn test_encode_uses_firmware_keys() {
        let text = KeyValueCodec.encode_state(&sample_state());
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "status=2",
                "lastWriteTime=4200",
                "startTime=10",
                "currentLogFile=logs/log_1_000.csv",
                "sdMounted=1",
                "loggingActive=1",
                "totalWrites=17",
                "failedWrites=2",
                "lastError=Failed to append data to: logs/log_1_000.csv",
            ]
        );
    }

    #[test]
    fn test_decode_restores_encoded_state() {
        let codec = KeyValueCodec;
        let mut decoded = PersistedState::default();
        codec.decode_state(&codec.encode_state(&sample_state()), &mut decoded);
        assert_eq!(decoded, sample_state());
    }

    #[test]
    fn test_decode_skips_malformed_and_unknown_lines() {
        let text = "garbage line\n=orphan\nfutureKey=42\ntotalWrites=abc\n\
                    failedWrites=3\ncurrentLogFile=logs/x.csv\n";
        let mut state = PersistedState {
            total_writes: 9,
            ..Default::default()
        };

        KeyValueCodec.decode_state(text, &mut state);

        assert_eq!(state.total_writes, 9);
        assert_eq!(state.failed_writes, 3);
        assert_eq!(state.current_log_file, "logs/x.csv");
        assert_eq!(state.status, OperationalStatus::Initializing);
    }

    #[test]
    fn test_out_of_range_status_resets_to_initializing() {
        let mut state = PersistedState {
            status: OperationalStatus::Ready,
            ..Default::default()
        };
        KeyValueCodec.decode_state("status=9\n", &mut state);
        assert_eq!(state.status, OperationalStatus::Initializing);

        KeyValueCodec.decode_state("status=-1\n", &mut state);
        assert_eq!(state.status, OperationalStatus::Initializing);
    }

    #[test]
    fn test_values_may_contain_separator() {
        let mut state = PersistedState::default();
        KeyValueCodec.decode_state("lastError=bad value=5\n", &mut state);
        assert_eq!(state.last_error, "bad value=5");
    }

    #[test]
    fn test_newlines_in_values_are_flattened() {
        let state = PersistedState {
            last_error: "line one\nline two".into(),
            ..Default::default()
        };
        let text = KeyValueCodec.encode_state(&state);
        assert!(text.contains("lastError=line one line two\n"));
    }

    #[test]
    fn test_recovery_point_keys() {
        let point = RecoveryPoint {
            last_good_write_ms: 700,
            current_log_file: "logs/log_0_500.csv".into(),
            total_writes: 12,
            created_at_ms: 800,
        };

        let text = KeyValueCodec.encode_recovery(&point);
        assert_eq!(
            text,
            "lastWriteTime=700\ncurrentLogFile=logs/log_0_500.csv\ntotalWrites=12\ntimestamp=800\n"
        );
        assert_eq!(KeyValueCodec.decode_recovery(&text), point);
        assert!(!KeyValueCodec.decode_recovery("junk").is_resumable());
    }
}
