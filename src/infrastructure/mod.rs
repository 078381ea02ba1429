//! Infrastructure layer - external adapters (storage medium, flash, clock).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod backend;
pub mod clock;
pub mod config;
pub mod directory_backend;
pub mod state_codec;
pub mod state_store;

pub use backend::{FileEntry, StorageBackend};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ensure_config_exists, load_config, load_config_from_file, save_config};
pub use directory_backend::DirectoryBackend;
pub use state_codec::{KeyValueCodec, StateCodec};
pub use state_store::{FileStateStore, StateStore, RECOVERY_FILE, STATE_FILE};
