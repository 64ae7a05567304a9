//! Centralized configuration for pattern sync.
//!
//! Fixed protocol constants live on [`SyncConfig`]; per-engine settings are
//! carried by [`EngineConfig`].

use std::path::PathBuf;
use std::time::Duration;

/// Protocol-level constants shared by the engine and the transport.
pub struct SyncConfig;

impl SyncConfig {
    pub const APP_NAME: &'static str = "strudel-sync";
    pub const DEFAULT_HOST: &'static str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 13121;
    pub const MAX_PAYLOAD_BYTES: usize = 52_428_800; // 50MB
    pub const RECORD_SUFFIX: &'static str = ".st";
    pub const TEMP_SUFFIX: &'static str = ".tmp";
    /// Payload fields that may carry the snapshot, checked in order.
    pub const SNAPSHOT_FIELDS: [&'static str; 2] = ["userPatterns", "strudel-settingsuserPatterns"];
    /// Longest accepted identifier, in bytes.
    pub const MAX_ID_LEN: usize = 200;
}

/// Settings for a filesystem-backed [`crate::PersistenceEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory holding one record per pattern.
    pub data_dir: PathBuf,
    /// Suffix appended to the identifier to form the record file name.
    pub suffix: String,
    /// Deadline for each individual storage read or write.
    pub io_timeout: Option<Duration>,
}

impl EngineConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            suffix: SyncConfig::RECORD_SUFFIX.to_string(),
            io_timeout: None,
        }
    }

    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = Some(timeout);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Debounce settings for [`crate::ChangeNotifier`].
#[derive(Debug, Clone, Copy)]
pub struct NotifierConfig {
    /// How long the notifier waits after the last change before flushing.
    pub quiet_period: Duration,
}

impl NotifierConfig {
    pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(500);
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            quiet_period: Self::DEFAULT_QUIET_PERIOD,
        }
    }
}
