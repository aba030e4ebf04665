//! Process launch and exit-detection operations

use std::fmt;
use std::path::PathBuf;

use sdkpack_errors::PlatformError;

use crate::core::PlatformContext;

/// Platform-specific command builder
#[derive(Debug, Clone)]
pub struct PlatformCommand {
    program: PathBuf,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
}

impl PlatformCommand {
    /// Create a new platform command
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    /// Add an argument to the command
    pub fn arg<S: AsRef<str>>(&mut self, arg: S) -> &mut Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    /// Add multiple arguments to the command
    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_string());
        }
        self
    }

    /// Set the working directory for the command
    pub fn current_dir<P: Into<PathBuf>>(&mut self, dir: P) -> &mut Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Get the program path
    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    /// Get the arguments
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Get the current directory
    pub fn get_current_dir(&self) -> Option<&PathBuf> {
        self.current_dir.as_ref()
    }
}

impl fmt::Display for PlatformCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Operating system process identifier of a launched process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId(u32);

impl ProcessId {
    /// Wrap a raw pid; zero is never a valid launched process
    #[must_use]
    pub fn new(raw: u32) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    #[must_use]
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the process table says about a process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Running,
    Exited { code: Option<i32> },
    /// The platform could not tell; callers treat this as still running
    Unknown,
}

impl ProcessStatus {
    #[must_use]
    pub fn has_exited(self) -> bool {
        matches!(self, Self::Exited { .. })
    }
}

/// Starts a process without waiting for it
pub trait ProcessLauncher: Send + Sync {
    /// Spawn the command detached from the caller and return its pid
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::CommandNotFound` if the program does not exist
    /// and `PlatformError::ProcessLaunchFailed` for any other spawn failure.
    fn launch(&self, ctx: &PlatformContext, cmd: &PlatformCommand)
        -> Result<ProcessId, PlatformError>;
}

/// Non-blocking process exit detection
pub trait ProcessMonitor: Send + Sync {
    /// Query the current status of a process; never blocks
    fn status(&self, pid: ProcessId) -> ProcessStatus;

    /// Stop a tool that is still running and drop any per-process
    /// bookkeeping; safe to call more than once
    fn release(&self, pid: ProcessId);
}

/// Launching and monitoring provided by one implementation
pub trait ProcessOperations: ProcessLauncher + ProcessMonitor {}

impl<T: ProcessLauncher + ProcessMonitor> ProcessOperations for T {}

pub(crate) fn launch_error(cmd: &PlatformCommand, err: &std::io::Error) -> PlatformError {
    if err.kind() == std::io::ErrorKind::NotFound {
        PlatformError::CommandNotFound {
            command: cmd.program().display().to_string(),
        }
    } else {
        PlatformError::ProcessLaunchFailed {
            command: cmd.to_string(),
            message: err.to_string(),
        }
    }
}
