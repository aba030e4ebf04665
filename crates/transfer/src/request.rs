//! Transfer requests and per-task settings

use std::path::{Path, PathBuf};
use std::time::Duration;

use sdkpack_config::constants::{
    ARCHIVE_EXTENSION, CLIENT_SDK_FLAG, DEFAULT_DEADLINE_SECS, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_WINDOW_SIZE, TMP_DIR_NAME, ZIP_FLAG,
};
use sdkpack_config::Config;
use sdkpack_platform::PlatformCommand;

use crate::channel::PeerAddress;

/// A peer's request for a generated client SDK
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub peer: PeerAddress,
    /// Bytes per chunk as asked for by the peer; zero or negative selects
    /// the default window
    pub window_size: i64,
    pub assets_path: PathBuf,
    pub tool_binary: PathBuf,
    /// SDK variant; also the stem of the generated archive
    pub options: String,
}

impl TransferRequest {
    pub fn new(
        peer: impl Into<PeerAddress>,
        window_size: i64,
        assets_path: impl Into<PathBuf>,
        tool_binary: impl Into<PathBuf>,
        options: impl Into<String>,
    ) -> Self {
        Self {
            peer: peer.into(),
            window_size,
            assets_path: assets_path.into(),
            tool_binary: tool_binary.into(),
            options: options.into(),
        }
    }

    /// Window actually used for streaming
    #[must_use]
    pub fn effective_window(&self) -> usize {
        normalize_window(self.window_size)
    }

    /// `<assets>/<tmp>/<options>.zip`
    #[must_use]
    pub fn output_path(&self, tmp_dir_name: &str) -> PathBuf {
        self.assets_path
            .join(tmp_dir_name)
            .join(format!("{}.{ARCHIVE_EXTENSION}", self.options))
    }

    /// `<tool> --clientsdk=<options> --zip=<output>`
    #[must_use]
    pub fn command(&self, output_path: &Path) -> PlatformCommand {
        let mut cmd = PlatformCommand::new(&self.tool_binary);
        cmd.arg(format!("{CLIENT_SDK_FLAG}={}", self.options))
            .arg(format!("{ZIP_FLAG}={}", output_path.display()));
        cmd
    }
}

/// Map a requested window to a usable one
#[must_use]
pub fn normalize_window(requested: i64) -> usize {
    match usize::try_from(requested) {
        Ok(0) | Err(_) => DEFAULT_WINDOW_SIZE,
        Ok(window) => window,
    }
}

/// Timing and layout knobs shared by every task of a scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSettings {
    pub deadline: Duration,
    pub poll_interval: Duration,
    pub tmp_dir_name: String,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(DEFAULT_DEADLINE_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            tmp_dir_name: TMP_DIR_NAME.to_string(),
        }
    }
}

impl From<&Config> for TaskSettings {
    fn from(config: &Config) -> Self {
        Self {
            deadline: config.transfer.deadline(),
            poll_interval: config.transfer.poll_interval(),
            tmp_dir_name: config.paths.tmp_dir_name.clone(),
        }
    }
}
