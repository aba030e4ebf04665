//! Fixed protocol values for SDK package transfers
//!
//! The window and timing values are defaults for [`crate::TransferConfig`].
//! [`TMP_DIR_NAME`] is the default for `paths.tmp_dir_name`; the archive
//! extension and the tool flags are fixed.

/// Window used when a caller supplies zero or a negative size
pub const DEFAULT_WINDOW_SIZE: usize = 1024;

/// Hard wall-clock budget of a transfer task
pub const DEFAULT_DEADLINE_SECS: u64 = 60;

/// Minimum gap between process/file checks
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// How often the CLI scheduler polls its tasks
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 20;

/// Scratch directory under the assets path that receives generated archives
pub const TMP_DIR_NAME: &str = "_tmp";

/// Extension of the generated archive
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Flag naming the SDK variant passed to the packaging tool
pub const CLIENT_SDK_FLAG: &str = "--clientsdk";

/// Flag naming the output archive passed to the packaging tool
pub const ZIP_FLAG: &str = "--zip";
