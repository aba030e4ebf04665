//! Platform abstraction layer for launching and watching the packaging tool.
//!
//! This crate provides a single interface for process operations:
//! - Launching a detached process and reporting its process id
//! - Non-blocking exit detection for a process id
//! - Releasing whatever the platform keeps per launched process
//!
//! The implementation is selected at build time; callers only see the
//! [`ProcessOperations`] traits and the [`Platform`] handle.

pub mod core;
pub mod implementations;
pub mod process;

pub use core::{Platform, PlatformContext};
pub use implementations::NativeProcessOperations;

/// Re-export commonly used types
pub use process::{
    PlatformCommand, ProcessId, ProcessLauncher, ProcessMonitor, ProcessOperations, ProcessStatus,
};
