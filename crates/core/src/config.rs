//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Content store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Path of the SQLite database file.
    pub path: PathBuf,
    /// Busy timeout applied to every connection, in seconds.
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
    /// Batch size for bounded delete/purge loops.
    #[serde(default = "default_delete_batch_size")]
    pub delete_batch_size: u32,
}

impl ContentConfig {
    /// Create a configuration pointing at the given database file, with defaults.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_secs: default_busy_timeout_secs(),
            delete_batch_size: default_delete_batch_size(),
        }
    }
}

/// Index rebuild configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RebuildConfig {
    /// Page size used when streaming components and assets during a rebuild.
    /// Bounds how much is buffered per store round-trip.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: u32,
}

fn default_busy_timeout_secs() -> u64 {
    5
}

fn default_delete_batch_size() -> u32 {
    100
}

fn default_buffer_size() -> u32 {
    1000
}

impl Default for RebuildConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
        }
    }
}
