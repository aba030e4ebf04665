//! Platform-specific operation errors

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

/// Errors that can occur while launching or inspecting external processes
#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    #[error("process launch failed: {command} - {message}")]
    ProcessLaunchFailed { command: String, message: String },

    #[error("process query failed for pid {pid}: {message}")]
    ProcessQueryFailed { pid: u32, message: String },

    #[error("command not found: {command}")]
    CommandNotFound { command: String },

    #[error("filesystem operation failed: {operation} - {message}")]
    FilesystemOperationFailed { operation: String, message: String },
}

impl UserFacingError for PlatformError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::ProcessLaunchFailed { .. } | Self::CommandNotFound { .. } => {
                Some("Check that the packaging tool path exists and is executable.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::ProcessQueryFailed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::ProcessLaunchFailed { .. } => "platform.process_launch_failed",
            Self::ProcessQueryFailed { .. } => "platform.process_query_failed",
            Self::CommandNotFound { .. } => "platform.command_not_found",
            Self::FilesystemOperationFailed { .. } => "platform.filesystem_failed",
        })
    }
}
