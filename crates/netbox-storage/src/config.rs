use std::path::{Path, PathBuf};

use netbox_core::constants::DEFAULT_DATA_DIR;
use serde::{Deserialize, Serialize};

/// Log file configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Directory log files are written to
    pub data_dir: PathBuf,

    /// Whether to create the directory if it doesn't exist
    pub create_dir: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            create_dir: true,
        }
    }
}

impl LogConfig {
    /// Create a new log configuration writing into `data_dir`
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Set whether to create the directory if it doesn't exist
    pub fn create_dir(mut self, create: bool) -> Self {
        self.create_dir = create;
        self
    }

    /// Full path of the log file `filename`.
    #[must_use]
    pub fn path_of(&self, filename: impl AsRef<Path>) -> PathBuf {
        self.data_dir.join(filename)
    }
}
