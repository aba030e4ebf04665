//! Core platform abstractions and context management

use std::sync::Arc;

use sdkpack_events::{EventEmitter, EventSender};

use crate::implementations::NativeProcessOperations;
use crate::process::{ProcessLauncher, ProcessMonitor, ProcessOperations};

/// Context for platform operations, providing event emission
#[derive(Debug, Clone, Default)]
pub struct PlatformContext {
    event_sender: Option<EventSender>,
    correlation_id: Option<String>,
}

impl PlatformContext {
    /// Create a new platform context with event emission capabilities
    #[must_use]
    pub fn new(event_sender: Option<EventSender>) -> Self {
        Self {
            event_sender,
            correlation_id: None,
        }
    }

    /// Stamp events emitted through this context with a correlation id
    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

impl EventEmitter for PlatformContext {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }

    fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }
}

/// Process capabilities handed to transfer tasks
#[derive(Clone)]
pub struct Platform {
    launcher: Arc<dyn ProcessLauncher>,
    monitor: Arc<dyn ProcessMonitor>,
}

impl Platform {
    /// Create a platform from separate launcher and monitor implementations
    pub fn new(launcher: Arc<dyn ProcessLauncher>, monitor: Arc<dyn ProcessMonitor>) -> Self {
        Self { launcher, monitor }
    }

    /// Create a platform where one implementation launches and monitors
    pub fn from_operations<T: ProcessOperations + 'static>(ops: T) -> Self {
        let ops = Arc::new(ops);
        Self {
            launcher: ops.clone(),
            monitor: ops,
        }
    }

    /// Get the implementation for the platform this binary was built for
    #[must_use]
    pub fn current() -> Self {
        Self::from_operations(NativeProcessOperations::new())
    }

    /// Access the launcher
    pub fn launcher(&self) -> &dyn ProcessLauncher {
        &*self.launcher
    }

    /// Shared handle to the monitor, held by tasks for their whole life
    pub fn monitor(&self) -> Arc<dyn ProcessMonitor> {
        Arc::clone(&self.monitor)
    }
}
