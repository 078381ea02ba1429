//! Operational status and the transition table that guards it.

use serde::{Deserialize, Serialize};

/// Operating mode of the logger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationalStatus {
    /// Booting, or reset after an integrity failure.
    #[default]
    Initializing = 0,
    /// Storage mounted and a log file selected.
    Ready = 1,
    /// Actively logging records.
    Logging = 2,
    /// Generic fault; recovery starts from here.
    Error = 3,
    /// Resumed from a recovery point.
    Recovering = 4,
    /// Medium disappeared while in service.
    StorageMountFailed = 5,
    /// Medium mounted but the file system misbehaves.
    FilesystemError = 6,
}

/// Explicit (from, to) pairs. Transitions *to* `Initializing` and `Error`
/// are legal from every status and are not listed.
const TRANSITIONS: &[(OperationalStatus, OperationalStatus)] = {
    use OperationalStatus::{
        Error, FilesystemError, Initializing, Logging, Ready, Recovering, StorageMountFailed,
    };
    &[
        (Initializing, Ready),
        (Error, Ready),
        (Recovering, Ready),
        (Ready, Logging),
        (Recovering, Logging),
        (Error, Recovering),
        (Ready, StorageMountFailed),
        (Logging, StorageMountFailed),
        (Ready, FilesystemError),
        (Logging, FilesystemError),
    ]
};

impl OperationalStatus {
    /// All statuses in code order.
    pub const ALL: [Self; 7] = [
        Self::Initializing,
        Self::Ready,
        Self::Logging,
        Self::Error,
        Self::Recovering,
        Self::StorageMountFailed,
        Self::FilesystemError,
    ];

    /// Whether moving from `self` to `target` is allowed.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(target, Self::Initializing | Self::Error)
            || TRANSITIONS.contains(&(self, target))
    }

    /// Stable numeric code used by the persisted format.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Inverse of [`Self::code`]. `None` when out of range.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Initializing),
            1 => Some(Self::Ready),
            2 => Some(Self::Logging),
            3 => Some(Self::Error),
            4 => Some(Self::Recovering),
            5 => Some(Self::StorageMountFailed),
            6 => Some(Self::FilesystemError),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initializing => "INITIALIZING",
            Self::Ready => "READY",
            Self::Logging => "LOGGING",
            Self::Error => "ERROR",
            Self::Recovering => "RECOVERING",
            Self::StorageMountFailed => "STORAGE_MOUNT_FAILED",
            Self::FilesystemError => "FILESYSTEM_ERROR",
        }
    }

    /// Statuses in which the engine may accept and write records.
    #[must_use]
    pub const fn accepts_records(self) -> bool {
        matches!(self, Self::Ready | Self::Logging | Self::Recovering)
    }

    /// Statuses the supervisor tries to recover from.
    #[must_use]
    pub const fn is_fault(self) -> bool {
        matches!(
            self,
            Self::Error | Self::StorageMountFailed | Self::FilesystemError
        )
    }
}

impl std::fmt::Display for OperationalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
