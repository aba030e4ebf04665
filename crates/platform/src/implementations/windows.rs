//! Windows process operations
//!
//! The packaging tool gets its own console. Windows has no equivalent of
//! reaping by pid, so child handles are kept until released; releasing a
//! tool that is still running kills it.

use std::collections::HashMap;
use std::os::windows::process::CommandExt;
use std::process::Child;
use std::sync::{Mutex, MutexGuard, PoisonError};

use sdkpack_errors::PlatformError;

use super::spawn_detached;
use crate::core::PlatformContext;
use crate::process::{PlatformCommand, ProcessId, ProcessLauncher, ProcessMonitor, ProcessStatus};

const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;

/// Windows implementation of process operations
#[derive(Debug, Default)]
pub struct WindowsProcessOperations {
    children: Mutex<HashMap<ProcessId, Child>>,
}

impl WindowsProcessOperations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn children(&self) -> MutexGuard<'_, HashMap<ProcessId, Child>> {
        self.children.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ProcessLauncher for WindowsProcessOperations {
    fn launch(
        &self,
        ctx: &PlatformContext,
        cmd: &PlatformCommand,
    ) -> Result<ProcessId, PlatformError> {
        let (pid, child) = spawn_detached(ctx, cmd, |command| {
            command.creation_flags(CREATE_NEW_CONSOLE);
        })?;
        self.children().insert(pid, child);
        Ok(pid)
    }
}

impl ProcessMonitor for WindowsProcessOperations {
    fn status(&self, pid: ProcessId) -> ProcessStatus {
        let mut children = self.children();
        let Some(child) = children.get_mut(&pid) else {
            return ProcessStatus::Unknown;
        };
        match child.try_wait() {
            Ok(Some(status)) => ProcessStatus::Exited {
                code: status.code(),
            },
            Ok(None) => ProcessStatus::Running,
            Err(_) => ProcessStatus::Unknown,
        }
    }

    fn release(&self, pid: ProcessId) {
        let Some(mut child) = self.children().remove(&pid) else {
            return;
        };
        if matches!(child.try_wait(), Ok(None)) {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
