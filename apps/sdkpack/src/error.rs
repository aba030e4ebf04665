//! CLI error handling

use std::fmt;

use sdkpack_errors::UserFacingError;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Configuration, transfer or platform error
    Ops(sdkpack_errors::Error),
    /// Invalid command arguments
    InvalidArguments(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Ops(e) => {
                let message = e.user_message();
                write!(f, "{message}")?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this operation.")?;
                }
                Ok(())
            }
            CliError::InvalidArguments(msg) => write!(f, "Invalid arguments: {msg}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Ops(e) => Some(e),
            CliError::InvalidArguments(_) => None,
        }
    }
}

impl From<sdkpack_errors::Error> for CliError {
    fn from(e: sdkpack_errors::Error) -> Self {
        CliError::Ops(e)
    }
}

impl From<sdkpack_errors::TransferError> for CliError {
    fn from(e: sdkpack_errors::TransferError) -> Self {
        CliError::Ops(e.into())
    }
}
