//! Package transfer error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

/// Failures observed by a package transfer task.
///
/// None of these escape the task: each one is either retried on a later
/// poll or ends the task once the deadline elapses.
#[derive(Debug, Clone, Error)]
pub enum TransferError {
    #[error("packaging tool could not be started: {command} - {message}")]
    LaunchFailure { command: String, message: String },

    #[error("archive not ready: {path} ({reason})")]
    LoadFailure { path: String, reason: String },

    #[error("short read from {path}: expected {expected} bytes, got {actual}")]
    PartialReadFailure {
        path: String,
        expected: u64,
        actual: u64,
    },

    #[error("archive {path} is {size} bytes, larger than the wire limit of {limit}")]
    ArchiveTooLarge { path: String, size: u64, limit: u64 },

    #[error("transfer to {peer} timed out after {elapsed_secs:.1}s")]
    TransferTimeout { peer: String, elapsed_secs: f64 },

    #[error("no channel available for peer {peer}")]
    ChannelUnavailable { peer: String },

    #[error("send to {peer} failed: {message}")]
    SendFailed { peer: String, message: String },

    #[error("malformed chunk: {message}")]
    MalformedChunk { message: String },
}

impl UserFacingError for TransferError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::LaunchFailure { .. } => {
                Some("Check that the packaging tool path exists and is executable.")
            }
            Self::TransferTimeout { .. } => {
                Some("The packaging tool or the peer did not finish in time; request the package again.")
            }
            Self::ArchiveTooLarge { .. } => Some("Reduce the size of the generated SDK package."),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::LoadFailure { .. }
                | Self::PartialReadFailure { .. }
                | Self::ChannelUnavailable { .. }
                | Self::SendFailed { .. }
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::LaunchFailure { .. } => "transfer.launch_failure",
            Self::LoadFailure { .. } => "transfer.load_failure",
            Self::PartialReadFailure { .. } => "transfer.partial_read",
            Self::ArchiveTooLarge { .. } => "transfer.archive_too_large",
            Self::TransferTimeout { .. } => "transfer.timeout",
            Self::ChannelUnavailable { .. } => "transfer.channel_unavailable",
            Self::SendFailed { .. } => "transfer.send_failed",
            Self::MalformedChunk { .. } => "transfer.malformed_chunk",
        })
    }
}
