//! Structured logging integration for events
//!
//! Library crates only emit events; this module turns them into `tracing`
//! records with structured fields.

use sdkpack_events::{AppEvent, EventMessage, GeneralEvent, PlatformEvent, TransferEvent};
use tracing::{debug, error, info, trace, warn};

/// Log an event at its level with structured fields
#[allow(clippy::too_many_lines)]
pub fn log_event_with_tracing(message: &EventMessage) {
    let meta = &message.meta;
    match &message.event {
        AppEvent::Transfer(event) => match event {
            TransferEvent::Started {
                peer,
                options,
                output_path,
                window,
            } => {
                info!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    peer = %peer,
                    options = %options,
                    output_path = %output_path.display(),
                    window = window,
                    "Package transfer started"
                );
            }
            TransferEvent::LaunchFailed { failure } => {
                error!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    code = ?failure.code,
                    message = %failure.message,
                    hint = ?failure.hint,
                    "Packaging tool launch failed"
                );
            }
            TransferEvent::ArchiveNotReady { path, reason } => {
                debug!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    path = %path.display(),
                    reason = %reason,
                    "Archive not ready"
                );
            }
            TransferEvent::PartialRead {
                path,
                expected,
                actual,
            } => {
                warn!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    path = %path.display(),
                    expected = expected,
                    actual = actual,
                    "Short read of archive, will retry"
                );
            }
            TransferEvent::ArchiveLoaded {
                path,
                total_size,
                window,
            } => {
                info!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    path = %path.display(),
                    total_size = total_size,
                    window = window,
                    "Archive loaded"
                );
            }
            TransferEvent::ChannelUnavailable { peer } => {
                debug!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    peer = %peer,
                    "Peer channel unavailable"
                );
            }
            TransferEvent::ChunkSent {
                peer,
                offset,
                len,
                total_size,
            } => {
                trace!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    peer = %peer,
                    offset = offset,
                    len = len,
                    total_size = total_size,
                    "Chunk sent"
                );
            }
            TransferEvent::Completed {
                peer,
                total_size,
                chunks,
                duration_ms,
            } => {
                info!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    peer = %peer,
                    total_size = total_size,
                    chunks = chunks,
                    duration_ms = duration_ms,
                    "Package transfer completed"
                );
            }
            TransferEvent::TimedOut {
                peer,
                kind,
                path,
                failure,
            } => {
                error!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    peer = %peer,
                    kind = ?kind,
                    path = %path.display(),
                    code = ?failure.code,
                    message = %failure.message,
                    "Package transfer timed out"
                );
            }
            TransferEvent::Released {
                peer,
                sent,
                total_size,
            } => {
                debug!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    peer = %peer,
                    sent = sent,
                    total_size = total_size,
                    "Transfer task released"
                );
            }
        },

        AppEvent::Platform(event) => match event {
            PlatformEvent::ProcessLaunched { program, args, pid } => {
                debug!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    program = %program,
                    args = ?args,
                    pid = pid,
                    "Process launched"
                );
            }
            PlatformEvent::ProcessLaunchFailed { program, failure } => {
                error!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    program = %program,
                    code = ?failure.code,
                    message = %failure.message,
                    "Process launch failed"
                );
            }
            PlatformEvent::ProcessExited { pid, exit_code } => {
                if matches!(exit_code, Some(code) if *code != 0) {
                    warn!(
                        source = meta.source.as_str(),
                        correlation = ?meta.correlation_id,
                        pid = pid,
                        exit_code = ?exit_code,
                        "Process exited with failure"
                    );
                } else {
                    debug!(
                        source = meta.source.as_str(),
                        correlation = ?meta.correlation_id,
                        pid = pid,
                        exit_code = ?exit_code,
                        "Process exited"
                    );
                }
            }
        },

        AppEvent::General(event) => match event {
            GeneralEvent::Warning { message, context } => {
                warn!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    context = ?context,
                    "{message}"
                );
            }
            GeneralEvent::Error { message, details } => {
                error!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    details = ?details,
                    "{message}"
                );
            }
            GeneralEvent::DebugLog { message, context } => {
                debug!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    context = ?context,
                    "{message}"
                );
            }
            GeneralEvent::OperationStarted { operation } => {
                info!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    operation = %operation,
                    "Operation started"
                );
            }
            GeneralEvent::OperationCompleted { operation, success } => {
                if *success {
                    info!(
                        source = meta.source.as_str(),
                        correlation = ?meta.correlation_id,
                        operation = %operation,
                        "Operation completed successfully"
                    );
                } else {
                    warn!(
                        source = meta.source.as_str(),
                        correlation = ?meta.correlation_id,
                        operation = %operation,
                        "Operation completed with issues"
                    );
                }
            }
        },
    }
}
