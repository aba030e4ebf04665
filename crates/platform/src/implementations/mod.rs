//! Per-OS process implementations
//!
//! Exactly one of the submodules is compiled; it exports
//! `NativeProcessOperations`.

use std::process::{Child, Command, Stdio};

use sdkpack_errors::PlatformError;
use sdkpack_events::{EventEmitter, FailureContext, PlatformEvent};

use crate::core::PlatformContext;
use crate::process::{launch_error, PlatformCommand, ProcessId};

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::UnixProcessOperations as NativeProcessOperations;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsProcessOperations as NativeProcessOperations;

/// Spawn `cmd` with no stdio attached, applying platform flags first
fn spawn_detached(
    ctx: &PlatformContext,
    cmd: &PlatformCommand,
    configure: impl FnOnce(&mut Command),
) -> Result<(ProcessId, Child), PlatformError> {
    let mut command = Command::new(cmd.program());
    command
        .args(cmd.get_args())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    if let Some(dir) = cmd.get_current_dir() {
        command.current_dir(dir);
    }
    configure(&mut command);

    let program = cmd.program().display().to_string();
    let spawned = command.spawn().map_err(|e| launch_error(cmd, &e)).and_then(|child| {
        ProcessId::new(child.id())
            .map(|pid| (pid, child))
            .ok_or_else(|| PlatformError::ProcessLaunchFailed {
                command: cmd.to_string(),
                message: "spawned process reported pid 0".to_string(),
            })
    });

    match &spawned {
        Ok((pid, _)) => ctx.emit_platform(PlatformEvent::ProcessLaunched {
            program,
            args: cmd.get_args().to_vec(),
            pid: pid.as_u32(),
        }),
        Err(e) => ctx.emit_platform(PlatformEvent::ProcessLaunchFailed {
            program,
            failure: FailureContext::from_error(e),
        }),
    }
    spawned
}
