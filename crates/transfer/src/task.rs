//! The package transfer task
//!
//! A task launches the packaging tool, waits for it to exit, loads the
//! archive it produced and streams it to the peer one window per poll.
//! All progress happens inside [`PackageTransferTask::poll`]; nothing
//! blocks and nothing runs in the background apart from the tool itself.
//!
//! ```text
//! Launching -> WaitingProcess -> Loading -> Streaming -> Done
//!                    |  ^            |
//!                    |  +------------+  (archive not ready)
//!                    +--> TimedOut / LaunchFailed  (deadline, from any state)
//! ```

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use sdkpack_errors::TransferError;
use sdkpack_events::{
    EventEmitter, EventSender, FailureContext, PlatformEvent, TimeoutKind, TransferEvent,
};
use sdkpack_platform::{Platform, PlatformContext, ProcessId, ProcessMonitor, ProcessStatus};

use crate::channel::{ChannelRegistry, PeerAddress};
use crate::clock::Clock;
use crate::message::{ImportChunk, Message, MAX_ARCHIVE_SIZE};
use crate::request::{TaskSettings, TransferRequest};

/// Where a task is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Launching,
    WaitingProcess,
    Loading,
    Streaming,
    Done,
    TimedOut,
    LaunchFailed,
}

impl TaskState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::TimedOut | Self::LaunchFailed)
    }
}

/// How a finished task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Completed { total_size: u64, chunks: u64 },
    TimedOut { kind: TimeoutKind },
    /// The tool never started and the deadline elapsed
    LaunchFailed,
}

/// Result of one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    Pending,
    Finished(TransferOutcome),
}

impl PollStatus {
    /// `true` while the scheduler should keep polling the task
    #[must_use]
    pub fn keep_scheduling(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Snapshot of a task's progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub task_id: String,
    pub peer: PeerAddress,
    pub state: TaskState,
    pub window: usize,
    pub sent: u64,
    pub total_size: Option<u64>,
    pub chunks_sent: u64,
    pub timeout_reported: bool,
}

/// Collaborators shared by every task a scheduler runs
#[derive(Clone)]
pub struct TaskContext {
    pub platform: Platform,
    pub channels: Arc<dyn ChannelRegistry>,
    pub clock: Arc<dyn Clock>,
    pub settings: TaskSettings,
    pub events: Option<EventSender>,
}

/// One in-flight SDK package request
pub struct PackageTransferTask {
    id: String,
    request: TransferRequest,
    output_path: PathBuf,
    window: usize,
    process: Option<ProcessId>,
    /// Loaded archive, dropped as soon as the task finishes
    archive: Option<Bytes>,
    total_size: Option<u64>,
    sent: usize,
    chunks_sent: u64,
    state: TaskState,
    outcome: Option<TransferOutcome>,
    exit_observed: bool,
    peer_reachable: bool,
    released: bool,
    created_at: Duration,
    last_check_at: Duration,
    settings: TaskSettings,
    channels: Arc<dyn ChannelRegistry>,
    monitor: Arc<dyn ProcessMonitor>,
    clock: Arc<dyn Clock>,
    events: Option<EventSender>,
}

impl EventEmitter for PackageTransferTask {
    fn event_sender(&self) -> Option<&EventSender> {
        self.events.as_ref()
    }

    fn correlation_id(&self) -> Option<&str> {
        Some(&self.id)
    }
}

impl PackageTransferTask {
    /// Create the task and launch the packaging tool
    ///
    /// A stale archive from an earlier run is removed first. Launch failure
    /// is reported as an event and leaves the task waiting for its deadline.
    #[must_use]
    pub fn start(request: TransferRequest, ctx: &TaskContext) -> Self {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let now = ctx.clock.now();
        let output_path = request.output_path(&ctx.settings.tmp_dir_name);

        let mut task = Self {
            window: request.effective_window(),
            id,
            request,
            output_path,
            process: None,
            archive: None,
            total_size: None,
            sent: 0,
            chunks_sent: 0,
            state: TaskState::Launching,
            outcome: None,
            exit_observed: false,
            peer_reachable: true,
            released: false,
            created_at: now,
            last_check_at: now,
            settings: ctx.settings.clone(),
            channels: Arc::clone(&ctx.channels),
            monitor: ctx.platform.monitor(),
            clock: Arc::clone(&ctx.clock),
            events: ctx.events.clone(),
        };

        task.emit_transfer(TransferEvent::Started {
            peer: task.request.peer.to_string(),
            options: task.request.options.clone(),
            output_path: task.output_path.clone(),
            window: task.window,
        });
        task.launch(&ctx.platform);
        task.state = TaskState::WaitingProcess;
        task
    }

    fn launch(&mut self, platform: &Platform) {
        self.prepare_output_dir();

        let cmd = self.request.command(&self.output_path);
        let platform_ctx =
            PlatformContext::new(self.events.clone()).with_correlation_id(self.id.clone());
        match platform.launcher().launch(&platform_ctx, &cmd) {
            Ok(pid) => self.process = Some(pid),
            Err(e) => {
                let err = TransferError::LaunchFailure {
                    command: cmd.to_string(),
                    message: e.to_string(),
                };
                self.emit_transfer(TransferEvent::LaunchFailed {
                    failure: FailureContext::from_error(&err),
                });
            }
        }
    }

    fn prepare_output_dir(&self) {
        if let Some(dir) = self.output_path.parent() {
            if let Err(e) = std::fs::create_dir_all(dir) {
                self.emit_warning(format!("cannot create {}: {e}", dir.display()));
            }
        }
        match std::fs::remove_file(&self.output_path) {
            Err(e) if e.kind() != ErrorKind::NotFound => self.emit_warning(format!(
                "cannot remove stale archive {}: {e}",
                self.output_path.display()
            )),
            _ => {}
        }
    }

    /// Advance the task by at most one step
    ///
    /// Once this returns [`PollStatus::Finished`] every later call returns
    /// the same status without touching anything.
    pub fn poll(&mut self) -> PollStatus {
        if let Some(outcome) = &self.outcome {
            return PollStatus::Finished(outcome.clone());
        }

        let now = self.clock.now();
        let elapsed = now.saturating_sub(self.created_at);
        if elapsed > self.settings.deadline {
            return self.expire(elapsed);
        }

        if self.state == TaskState::WaitingProcess && !self.try_load(now) {
            return PollStatus::Pending;
        }

        self.stream()
    }

    /// Check the tool and the archive, rate limited; `true` once loaded
    ///
    /// The rate limit is measured from the last check that ran, not from the
    /// last poll.
    fn try_load(&mut self, now: Duration) -> bool {
        let Some(pid) = self.process else {
            // Launch failed: nothing will ever appear, wait for the deadline
            return false;
        };
        if now.saturating_sub(self.last_check_at) < self.settings.poll_interval {
            return false;
        }
        self.last_check_at = now;

        let status = self.monitor.status(pid);
        if !status.has_exited() {
            return false;
        }
        if !self.exit_observed {
            self.exit_observed = true;
            let code = match status {
                ProcessStatus::Exited { code } => code,
                ProcessStatus::Running | ProcessStatus::Unknown => None,
            };
            self.emit_platform(PlatformEvent::ProcessExited {
                pid: pid.as_u32(),
                exit_code: code,
            });
        }

        self.state = TaskState::Loading;
        let loaded = load_archive(&self.output_path);
        self.accept_archive(loaded)
    }

    /// Keep a successful load for streaming; anything else is retried on a
    /// later check
    fn accept_archive(&mut self, loaded: Result<Bytes, TransferError>) -> bool {
        match loaded {
            Ok(archive) => {
                let total = archive.len();
                self.window = self.window.min(total);
                self.total_size = Some(total as u64);
                self.archive = Some(archive);
                self.state = TaskState::Streaming;
                self.emit_transfer(TransferEvent::ArchiveLoaded {
                    path: self.output_path.clone(),
                    total_size: total as u64,
                    window: self.window,
                });
                true
            }
            Err(err) => {
                self.state = TaskState::WaitingProcess;
                self.report_load_failure(&err);
                false
            }
        }
    }

    fn report_load_failure(&self, err: &TransferError) {
        match err {
            TransferError::PartialReadFailure {
                expected, actual, ..
            } => self.emit_transfer(TransferEvent::PartialRead {
                path: self.output_path.clone(),
                expected: *expected,
                actual: *actual,
            }),
            other => self.emit_transfer(TransferEvent::ArchiveNotReady {
                path: self.output_path.clone(),
                reason: other.to_string(),
            }),
        }
    }

    /// Send one window to the peer, or finish when nothing is left
    fn stream(&mut self) -> PollStatus {
        let Some(archive) = self.archive.clone() else {
            return PollStatus::Pending;
        };
        let total = archive.len();
        if self.sent >= total {
            return self.complete(total as u64);
        }

        let Some(channel) = self.channels.find_channel(&self.request.peer) else {
            if self.peer_reachable {
                self.peer_reachable = false;
                self.emit_transfer(TransferEvent::ChannelUnavailable {
                    peer: self.request.peer.to_string(),
                });
            }
            return PollStatus::Pending;
        };
        self.peer_reachable = true;

        let end = (self.sent + self.window).min(total);
        let chunk = match ImportChunk::new(total as u64, archive.slice(self.sent..end)) {
            Ok(chunk) => chunk,
            Err(e) => {
                self.emit_error(e.to_string());
                return PollStatus::Pending;
            }
        };
        if let Err(e) = channel.send(Message::ImportClientSdk(chunk)) {
            self.emit_warning(e.to_string());
            return PollStatus::Pending;
        }

        let offset = self.sent;
        self.sent = end;
        self.chunks_sent += 1;
        self.emit_transfer(TransferEvent::ChunkSent {
            peer: self.request.peer.to_string(),
            offset: offset as u64,
            len: end - offset,
            total_size: total as u64,
        });

        let remaining = total - self.sent;
        if self.window > remaining {
            self.window = remaining;
        }
        PollStatus::Pending
    }

    fn complete(&mut self, total_size: u64) -> PollStatus {
        let duration = self.clock.now().saturating_sub(self.created_at);
        self.state = TaskState::Done;
        self.emit_transfer(TransferEvent::Completed {
            peer: self.request.peer.to_string(),
            total_size,
            chunks: self.chunks_sent,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        });
        self.finish(TransferOutcome::Completed {
            total_size,
            chunks: self.chunks_sent,
        })
    }

    fn expire(&mut self, elapsed: Duration) -> PollStatus {
        let kind = if self.total_size.is_none() {
            TimeoutKind::ArchiveNeverLoaded
        } else {
            TimeoutKind::Generic
        };
        let err = TransferError::TransferTimeout {
            peer: self.request.peer.to_string(),
            elapsed_secs: elapsed.as_secs_f64(),
        };
        self.emit_transfer(TransferEvent::TimedOut {
            peer: self.request.peer.to_string(),
            kind,
            path: self.output_path.clone(),
            failure: FailureContext::from_error(&err),
        });

        if self.process.is_none() {
            self.state = TaskState::LaunchFailed;
            self.finish(TransferOutcome::LaunchFailed)
        } else {
            self.state = TaskState::TimedOut;
            self.finish(TransferOutcome::TimedOut { kind })
        }
    }

    fn finish(&mut self, outcome: TransferOutcome) -> PollStatus {
        self.outcome = Some(outcome.clone());
        self.release();
        PollStatus::Finished(outcome)
    }

    /// Drop the archive and the process registration, once
    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.archive = None;
        if let Some(pid) = self.process {
            self.monitor.release(pid);
        }
        self.emit_transfer(TransferEvent::Released {
            peer: self.request.peer.to_string(),
            sent: self.sent as u64,
            total_size: self.total_size.unwrap_or(0),
        });
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn state(&self) -> TaskState {
        self.state
    }

    #[must_use]
    pub fn peer(&self) -> &PeerAddress {
        &self.request.peer
    }

    #[must_use]
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    #[must_use]
    pub fn process_id(&self) -> Option<ProcessId> {
        self.process
    }

    /// Whether the archive is currently held in memory
    #[must_use]
    pub fn has_archive(&self) -> bool {
        self.archive.is_some()
    }

    #[must_use]
    pub fn report(&self) -> TransferReport {
        TransferReport {
            task_id: self.id.clone(),
            peer: self.request.peer.clone(),
            state: self.state,
            window: self.window,
            sent: self.sent as u64,
            total_size: self.total_size,
            chunks_sent: self.chunks_sent,
            timeout_reported: matches!(
                self.state,
                TaskState::TimedOut | TaskState::LaunchFailed
            ),
        }
    }
}

impl Drop for PackageTransferTask {
    fn drop(&mut self) {
        self.release();
    }
}

/// Read the whole archive, insisting on a non-empty, complete read
fn load_archive(path: &Path) -> Result<Bytes, TransferError> {
    let not_ready = |reason: String| TransferError::LoadFailure {
        path: path.display().to_string(),
        reason,
    };

    let file = File::open(path).map_err(|e| not_ready(e.to_string()))?;
    let expected = file.metadata().map_err(|e| not_ready(e.to_string()))?.len();
    if expected == 0 {
        return Err(not_ready("archive is empty".to_string()));
    }
    if expected > MAX_ARCHIVE_SIZE {
        return Err(TransferError::ArchiveTooLarge {
            path: path.display().to_string(),
            size: expected,
            limit: MAX_ARCHIVE_SIZE,
        });
    }

    read_archive(file, expected, path)
}

/// Read exactly `expected` bytes; fewer is a partial read
fn read_archive(reader: impl Read, expected: u64, path: &Path) -> Result<Bytes, TransferError> {
    let not_ready = |reason: String| TransferError::LoadFailure {
        path: path.display().to_string(),
        reason,
    };

    let capacity = usize::try_from(expected).map_err(|e| not_ready(e.to_string()))?;
    let mut data = Vec::with_capacity(capacity);
    reader
        .take(expected)
        .read_to_end(&mut data)
        .map_err(|e| not_ready(e.to_string()))?;

    if data.len() as u64 != expected {
        return Err(TransferError::PartialReadFailure {
            path: path.display().to_string(),
            expected,
            actual: data.len() as u64,
        });
    }
    Ok(Bytes::from(data))
}
