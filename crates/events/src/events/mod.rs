use serde::{Deserialize, Serialize};

use crate::{EventLevel, EventSource};
use sdkpack_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailureContext {
    /// Optional stable error code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self {
            code: error.user_code().map(Into::into),
            message: error.user_message().into_owned(),
            hint: error.user_hint().map(Into::into),
            retryable: error.is_retryable(),
        }
    }
}

pub mod general;
pub mod platform;
pub mod transfer;

pub use general::*;
pub use platform::*;
pub use transfer::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings, errors, operations)
    General(GeneralEvent),

    /// Package transfer task events
    Transfer(TransferEvent),

    /// Process launch and monitoring events
    Platform(PlatformEvent),
}

impl AppEvent {
    /// Identify the source domain for this event.
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::GENERAL,
            Self::Transfer(_) => EventSource::TRANSFER,
            Self::Platform(_) => EventSource::PLATFORM,
        }
    }

    /// Default severity for this event.
    #[must_use]
    pub fn level(&self) -> EventLevel {
        match self {
            Self::General(event) => event.level(),
            Self::Transfer(event) => event.level(),
            Self::Platform(event) => event.level(),
        }
    }
}
