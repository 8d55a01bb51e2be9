//! Coordinator configuration.

use crate::db::DEFAULT_BUSY_TIMEOUT;
use crate::store::default_app_data_root;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the application-data root.
pub const DATA_DIR_ENV: &str = "DIARYSTORE_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Directory every store path is derived from.
    pub app_data_root: PathBuf,
    /// SQLite busy timeout applied to each attached connection.
    pub busy_timeout: Duration,
}

impl CoordinatorConfig {
    pub fn new(app_data_root: impl Into<PathBuf>) -> Self {
        Self {
            app_data_root: app_data_root.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Reads the root from `DIARYSTORE_DATA_DIR`, falling back to the platform
    /// application-data directory when unset or empty.
    pub fn from_env() -> Self {
        Self::new(resolve_root(std::env::var_os(DATA_DIR_ENV)))
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }
}

fn resolve_root(value: Option<OsString>) -> PathBuf {
    value
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(default_app_data_root)
}
