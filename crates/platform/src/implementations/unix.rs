//! Unix process operations
//!
//! The packaging tool runs in its own process group so terminal signals
//! aimed at the server do not reach it. Exit status is collected with a
//! non-blocking `waitpid`; processes that are not our children are probed
//! with signal 0. Releasing a tool that is still running kills its whole
//! group and reaps the leader.

use std::os::unix::process::CommandExt;

use sdkpack_errors::PlatformError;

use super::spawn_detached;
use crate::core::PlatformContext;
use crate::process::{PlatformCommand, ProcessId, ProcessLauncher, ProcessMonitor, ProcessStatus};

/// Unix implementation of process operations
#[derive(Debug, Default)]
pub struct UnixProcessOperations;

impl UnixProcessOperations {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ProcessLauncher for UnixProcessOperations {
    fn launch(
        &self,
        ctx: &PlatformContext,
        cmd: &PlatformCommand,
    ) -> Result<ProcessId, PlatformError> {
        let (pid, _child) = spawn_detached(ctx, cmd, |command| {
            command.process_group(0);
        })?;
        // Dropping the handle neither waits nor kills; `status` reaps it.
        Ok(pid)
    }
}

impl ProcessMonitor for UnixProcessOperations {
    fn status(&self, pid: ProcessId) -> ProcessStatus {
        let Ok(raw) = libc::pid_t::try_from(pid.as_u32()) else {
            return ProcessStatus::Unknown;
        };

        let mut wstatus: libc::c_int = 0;
        // SAFETY: WNOHANG never blocks and only writes through `wstatus`.
        let rc = unsafe { libc::waitpid(raw, &mut wstatus, libc::WNOHANG) };
        match rc {
            0 => ProcessStatus::Running,
            r if r == raw => ProcessStatus::Exited {
                code: libc::WIFEXITED(wstatus).then(|| libc::WEXITSTATUS(wstatus)),
            },
            _ => probe(raw),
        }
    }

    fn release(&self, pid: ProcessId) {
        let Ok(raw) = libc::pid_t::try_from(pid.as_u32()) else {
            return;
        };

        let mut wstatus: libc::c_int = 0;
        // SAFETY: WNOHANG never blocks and only writes through `wstatus`.
        let rc = unsafe { libc::waitpid(raw, &mut wstatus, libc::WNOHANG) };
        if rc != 0 {
            // Reaped just now, or no longer our child
            return;
        }

        // An unreaped child keeps its pid, so the group id still names the tool.
        // SAFETY: plain signal delivery to a process group we created.
        unsafe { libc::kill(-raw, libc::SIGKILL) };
        reap_blocking(raw);
    }
}

/// Wait for a killed child, retrying on `EINTR`
fn reap_blocking(raw: libc::pid_t) {
    let mut wstatus: libc::c_int = 0;
    loop {
        // SAFETY: the child was sent SIGKILL; this only writes through `wstatus`.
        let rc = unsafe { libc::waitpid(raw, &mut wstatus, 0) };
        if rc != -1 || std::io::Error::last_os_error().raw_os_error() != Some(libc::EINTR) {
            return;
        }
    }
}

/// Existence check for processes `waitpid` cannot see
fn probe(raw: libc::pid_t) -> ProcessStatus {
    // SAFETY: signal 0 performs the permission and existence checks only.
    let rc = unsafe { libc::kill(raw, 0) };
    if rc == 0 {
        return ProcessStatus::Running;
    }
    match std::io::Error::last_os_error().raw_os_error() {
        Some(libc::ESRCH) => ProcessStatus::Exited { code: None },
        Some(libc::EPERM) => ProcessStatus::Running,
        _ => ProcessStatus::Unknown,
    }
}
