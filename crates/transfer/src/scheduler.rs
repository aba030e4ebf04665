//! Explicit owner of in-flight transfer tasks
//!
//! Tasks live in an arena keyed by [`TaskHandle`]. Every call to
//! [`Scheduler::poll_all`] polls each task once and reaps the ones that
//! report finished, so a task is dropped on the same step it ends.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};

use crate::request::TransferRequest;
use crate::task::{PackageTransferTask, PollStatus, TaskContext, TransferOutcome, TransferReport};

/// Stable identifier of a task inside one scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// A task that finished during a poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub handle: TaskHandle,
    pub outcome: TransferOutcome,
    pub report: TransferReport,
}

/// Drives transfer tasks one poll at a time
pub struct Scheduler {
    ctx: TaskContext,
    tasks: BTreeMap<TaskHandle, PackageTransferTask>,
    next_handle: u64,
}

impl Scheduler {
    #[must_use]
    pub fn new(ctx: TaskContext) -> Self {
        Self {
            ctx,
            tasks: BTreeMap::new(),
            next_handle: 0,
        }
    }

    #[must_use]
    pub fn context(&self) -> &TaskContext {
        &self.ctx
    }

    /// Start a task for `request` and register it for polling
    pub fn spawn(&mut self, request: TransferRequest) -> TaskHandle {
        let task = PackageTransferTask::start(request, &self.ctx);
        self.insert(task)
    }

    /// Register an already started task
    pub fn insert(&mut self, task: PackageTransferTask) -> TaskHandle {
        let handle = TaskHandle(self.next_handle);
        self.next_handle += 1;
        self.tasks.insert(handle, task);
        handle
    }

    /// Poll every task once and drop the ones that finished
    pub fn poll_all(&mut self) -> Vec<Completion> {
        let mut finished = Vec::new();
        for (handle, task) in &mut self.tasks {
            if let PollStatus::Finished(outcome) = task.poll() {
                finished.push(Completion {
                    handle: *handle,
                    outcome,
                    report: task.report(),
                });
            }
        }
        for completion in &finished {
            self.tasks.remove(&completion.handle);
        }
        finished
    }

    /// Drop a task early; unknown or already reaped handles are ignored
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        self.tasks.remove(&handle).is_some()
    }

    /// Poll on a fixed tick until no task is left
    ///
    /// A zero tick is raised to one millisecond.
    pub async fn drive(&mut self, tick: Duration) -> Vec<Completion> {
        let mut interval = time::interval(tick.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut completions = Vec::new();
        while !self.tasks.is_empty() {
            interval.tick().await;
            completions.extend(self.poll_all());
        }
        completions
    }

    #[must_use]
    pub fn get(&self, handle: TaskHandle) -> Option<&PackageTransferTask> {
        self.tasks.get(&handle)
    }

    #[must_use]
    pub fn contains(&self, handle: TaskHandle) -> bool {
        self.tasks.contains_key(&handle)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("tasks", &self.tasks.keys().collect::<Vec<_>>())
            .field("next_handle", &self.next_handle)
            .finish_non_exhaustive()
    }
}
