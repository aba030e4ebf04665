use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::EventLevel;

/// General utility events for warnings, errors, and operations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeneralEvent {
    /// Generic warning message with optional context
    Warning {
        message: String,
        context: Option<String>,
    },

    /// Generic error message with optional details
    Error {
        message: String,
        details: Option<String>,
    },

    /// Debug logging with structured context
    DebugLog {
        message: String,
        context: HashMap<String, String>,
    },

    /// Generic operation started notification
    OperationStarted { operation: String },

    /// Generic operation completion with success status
    OperationCompleted { operation: String, success: bool },
}

impl GeneralEvent {
    /// Create a warning event
    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
            context: None,
        }
    }

    /// Create an error event
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            details: None,
        }
    }

    /// Create a debug log event
    pub fn debug(message: impl Into<String>) -> Self {
        Self::DebugLog {
            message: message.into(),
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn level(&self) -> EventLevel {
        match self {
            Self::Warning { .. } => EventLevel::Warn,
            Self::Error { .. } => EventLevel::Error,
            Self::DebugLog { .. } => EventLevel::Debug,
            Self::OperationStarted { .. } => EventLevel::Info,
            Self::OperationCompleted { success, .. } => {
                if *success {
                    EventLevel::Info
                } else {
                    EventLevel::Warn
                }
            }
        }
    }
}
