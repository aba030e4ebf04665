//! Loopback transfer: run one task against an in-process peer
//!
//! The peer is an in-memory channel, so the chunks the task streams can be
//! reassembled here and written to disk.

use std::path::PathBuf;
use std::sync::Arc;

use sdkpack_config::Config;
use sdkpack_errors::TransferError;
use sdkpack_events::{EventEmitter, EventSender};
use sdkpack_platform::Platform;
use sdkpack_transfer::{
    Assembly, ChunkAssembler, InMemoryRegistry, MemoryChannel, MonotonicClock, PeerAddress,
    Scheduler, TaskContext, TaskSettings, TransferOutcome, TransferReport, TransferRequest,
};

use crate::error::CliError;

const LOOPBACK_PEER: &str = "loopback";

/// Result of a loopback transfer
#[derive(Debug)]
pub struct TransferSummary {
    pub options: String,
    pub outcome: TransferOutcome,
    pub report: TransferReport,
    pub written: Option<PathBuf>,
}

impl TransferSummary {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, TransferOutcome::Completed { .. })
    }

    pub fn to_json(&self) -> serde_json::Value {
        let outcome = match &self.outcome {
            TransferOutcome::Completed { .. } => "completed".to_string(),
            TransferOutcome::TimedOut { kind } => format!("timed_out:{kind:?}"),
            TransferOutcome::LaunchFailed => "launch_failed".to_string(),
        };
        serde_json::json!({
            "options": self.options,
            "task_id": self.report.task_id,
            "outcome": outcome,
            "state": format!("{:?}", self.report.state),
            "total_size": self.report.total_size,
            "sent": self.report.sent,
            "chunks": self.report.chunks_sent,
            "timeout_reported": self.report.timeout_reported,
            "output": self.written.as_ref().map(|p| p.display().to_string()),
        })
    }
}

/// Build the request from configuration and drive it to completion
pub async fn run_transfer(
    config: &Config,
    options: &str,
    output: Option<PathBuf>,
    events: EventSender,
) -> Result<TransferSummary, CliError> {
    let request = TransferRequest::new(
        LOOPBACK_PEER,
        config.transfer.window_size,
        config.assets_path()?,
        config.tool_binary()?,
        options,
    );

    let registry = Arc::new(InMemoryRegistry::new());
    let channel = registry.connect(PeerAddress::from(LOOPBACK_PEER));
    let ctx = TaskContext {
        platform: Platform::current(),
        channels: registry,
        clock: Arc::new(MonotonicClock::new()),
        settings: TaskSettings::from(config),
        events: Some(events.clone()),
    };

    let operation = format!("transfer {options}");
    events.emit_operation_started(&operation);

    let mut scheduler = Scheduler::new(ctx);
    scheduler.spawn(request);
    let completion = scheduler
        .drive(config.transfer.tick_interval())
        .await
        .into_iter()
        .next()
        .ok_or_else(|| sdkpack_errors::Error::internal("scheduler finished without a task"))?;

    let mut summary = TransferSummary {
        options: options.to_string(),
        outcome: completion.outcome,
        report: completion.report,
        written: None,
    };
    events.emit_operation_completed(&operation, summary.succeeded());

    if summary.succeeded() {
        if let Some(path) = output {
            let archive = reassemble(&channel)?;
            tokio::fs::write(&path, &archive)
                .await
                .map_err(|e| sdkpack_errors::Error::io_with_path(&e, &path))?;
            events.emit_debug(format!(
                "wrote {} bytes to {}",
                archive.len(),
                path.display()
            ));
            summary.written = Some(path);
        }
    }

    Ok(summary)
}

fn reassemble(channel: &MemoryChannel) -> Result<Vec<u8>, TransferError> {
    let mut assembler = ChunkAssembler::new();
    for chunk in channel.drain_chunks()? {
        if let Assembly::Complete(data) = assembler.push(&chunk)? {
            return Ok(data.to_vec());
        }
    }
    Err(TransferError::MalformedChunk {
        message: format!(
            "archive incomplete after {} chunks",
            assembler.chunks()
        ),
    })
}
