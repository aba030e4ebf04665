//! Package transfer task events

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::FailureContext;
use crate::EventLevel;

/// Why a transfer task hit its deadline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutKind {
    /// The archive was never loaded from disk
    ArchiveNeverLoaded,
    /// The archive was loaded but not fully streamed
    Generic,
}

/// Lifecycle of a single package transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum TransferEvent {
    /// Task created and packaging tool launch attempted
    Started {
        peer: String,
        options: String,
        output_path: PathBuf,
        window: usize,
    },

    /// Packaging tool could not be started; the task stalls until its deadline
    LaunchFailed { failure: FailureContext },

    /// Output archive was not readable yet
    ArchiveNotReady { path: PathBuf, reason: String },

    /// Output archive was shorter than its reported size
    PartialRead {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// Output archive loaded into memory
    ArchiveLoaded {
        path: PathBuf,
        total_size: u64,
        window: usize,
    },

    /// Peer channel could not be resolved on this poll
    ChannelUnavailable { peer: String },

    /// One chunk handed to the transport
    ChunkSent {
        peer: String,
        offset: u64,
        len: usize,
        total_size: u64,
    },

    /// Every byte of the archive was handed to the transport
    Completed {
        peer: String,
        total_size: u64,
        chunks: u64,
        duration_ms: u64,
    },

    /// Deadline elapsed before the transfer completed
    TimedOut {
        peer: String,
        kind: TimeoutKind,
        path: PathBuf,
        failure: FailureContext,
    },

    /// Task released its resources
    Released {
        peer: String,
        sent: u64,
        total_size: u64,
    },
}

impl TransferEvent {
    #[must_use]
    pub fn level(&self) -> EventLevel {
        match self {
            Self::Started { .. } | Self::ArchiveLoaded { .. } | Self::Completed { .. } => {
                EventLevel::Info
            }
            Self::LaunchFailed { .. } | Self::TimedOut { .. } => EventLevel::Error,
            Self::PartialRead { .. } => EventLevel::Warn,
            Self::ArchiveNotReady { .. } | Self::ChannelUnavailable { .. } | Self::Released { .. } => {
                EventLevel::Debug
            }
            Self::ChunkSent { .. } => EventLevel::Trace,
        }
    }
}
