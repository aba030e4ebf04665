//! Process launch and monitoring events

use serde::{Deserialize, Serialize};

use super::FailureContext;
use crate::EventLevel;

/// Events emitted around the external packaging tool process
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum PlatformEvent {
    /// Process was spawned and detached
    ProcessLaunched {
        /// Program that was started
        program: String,
        /// Program arguments
        args: Vec<String>,
        /// Operating system process id
        pid: u32,
    },

    /// Process could not be spawned
    ProcessLaunchFailed {
        /// Program that failed to start
        program: String,
        failure: FailureContext,
    },

    /// Process has been observed as exited
    ProcessExited {
        pid: u32,
        /// Exit code, when the platform could collect it
        exit_code: Option<i32>,
    },
}

impl PlatformEvent {
    #[must_use]
    pub fn level(&self) -> EventLevel {
        match self {
            Self::ProcessLaunched { .. } | Self::ProcessExited { .. } => EventLevel::Debug,
            Self::ProcessLaunchFailed { .. } => EventLevel::Error,
        }
    }
}
