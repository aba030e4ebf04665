//! Integration tests for the transfer crate

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use proptest::prelude::*;
    use sdkpack_errors::PlatformError;
    use sdkpack_events::{AppEvent, EventReceiver, TimeoutKind, TransferEvent};
    use sdkpack_platform::{
        Platform, PlatformCommand, PlatformContext, ProcessId, ProcessLauncher, ProcessMonitor,
        ProcessStatus,
    };
    use sdkpack_transfer::{
        Assembly, ChunkAssembler, ImportChunk, InMemoryRegistry, ManualClock, PackageTransferTask,
        PeerAddress, PollStatus, Scheduler, TaskContext, TaskSettings, TaskState,
        TransferOutcome, TransferRequest,
    };
    use tempfile::TempDir;

    const PID: u32 = 4242;

    #[derive(Default)]
    struct FakeProcesses {
        fail_launch: bool,
        exited: AtomicBool,
        status_calls: AtomicUsize,
        launched: Mutex<Vec<PlatformCommand>>,
        released: Mutex<Vec<ProcessId>>,
    }

    impl FakeProcesses {
        fn exit(&self) {
            self.exited.store(true, Ordering::SeqCst);
        }

        fn status_calls(&self) -> usize {
            self.status_calls.load(Ordering::SeqCst)
        }

        fn released(&self) -> Vec<ProcessId> {
            self.released.lock().unwrap().clone()
        }
    }

    impl ProcessLauncher for FakeProcesses {
        fn launch(
            &self,
            _ctx: &PlatformContext,
            cmd: &PlatformCommand,
        ) -> Result<ProcessId, PlatformError> {
            if self.fail_launch {
                return Err(PlatformError::CommandNotFound {
                    command: cmd.program().display().to_string(),
                });
            }
            self.launched.lock().unwrap().push(cmd.clone());
            Ok(ProcessId::new(PID).unwrap())
        }
    }

    impl ProcessMonitor for FakeProcesses {
        fn status(&self, _pid: ProcessId) -> ProcessStatus {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            if self.exited.load(Ordering::SeqCst) {
                ProcessStatus::Exited { code: Some(0) }
            } else {
                ProcessStatus::Running
            }
        }

        fn release(&self, pid: ProcessId) {
            self.released.lock().unwrap().push(pid);
        }
    }

    struct Harness {
        dir: TempDir,
        clock: Arc<ManualClock>,
        procs: Arc<FakeProcesses>,
        registry: Arc<InMemoryRegistry>,
        events: EventReceiver,
        ctx: TaskContext,
        peer: PeerAddress,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_processes(FakeProcesses::default(), TaskSettings::default())
        }

        fn with_processes(procs: FakeProcesses, settings: TaskSettings) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let clock = Arc::new(ManualClock::new());
            let procs = Arc::new(procs);
            let registry = Arc::new(InMemoryRegistry::new());
            let (tx, events) = sdkpack_events::channel();
            let ctx = TaskContext {
                platform: Platform::new(procs.clone(), procs.clone()),
                channels: registry.clone(),
                clock: clock.clone(),
                settings,
                events: Some(tx),
            };
            Self {
                dir,
                clock,
                procs,
                registry,
                events,
                ctx,
                peer: PeerAddress::from("10.0.0.7:20013"),
            }
        }

        fn request(&self, window: i64, options: &str) -> TransferRequest {
            TransferRequest::new(
                self.peer.clone(),
                window,
                self.dir.path(),
                "/opt/sdk/kbcmd",
                options,
            )
        }

        fn start(&self, window: i64) -> PackageTransferTask {
            PackageTransferTask::start(self.request(window, "unity"), &self.ctx)
        }

        fn archive_path(&self, options: &str) -> PathBuf {
            self.dir.path().join("_tmp").join(format!("{options}.zip"))
        }

        fn write_archive(&self, options: &str, len: usize) -> Vec<u8> {
            let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            std::fs::write(self.archive_path(options), &data).unwrap();
            data
        }

        fn advance_ms(&self, ms: u64) {
            self.clock.advance(Duration::from_millis(ms));
        }

        fn transfer_events(&mut self) -> Vec<TransferEvent> {
            let mut out = Vec::new();
            while let Ok(message) = self.events.try_recv() {
                if let AppEvent::Transfer(event) = message.event {
                    out.push(event);
                }
            }
            out
        }
    }

    fn chunk_sizes(chunks: &[ImportChunk]) -> Vec<usize> {
        chunks.iter().map(|c| c.payload().len()).collect()
    }

    fn reassemble(chunks: &[ImportChunk]) -> Vec<u8> {
        let mut assembler = ChunkAssembler::new();
        let mut result = None;
        for chunk in chunks {
            if let Assembly::Complete(data) = assembler.push(chunk).unwrap() {
                result = Some(data.to_vec());
            }
        }
        result.expect("archive incomplete")
    }

    #[test]
    fn streams_archive_in_windows() {
        let h = Harness::new();
        let channel = h.registry.connect(h.peer.clone());
        let mut task = h.start(4096);
        assert_eq!(task.state(), TaskState::WaitingProcess);

        h.procs.exit();
        let data = h.write_archive("unity", 10_000);

        // First poll is inside the rate limit window
        assert_eq!(task.poll(), PollStatus::Pending);
        assert_eq!(channel.frame_count(), 0);

        h.advance_ms(100);
        assert_eq!(task.poll(), PollStatus::Pending);
        assert_eq!(task.state(), TaskState::Streaming);
        assert_eq!(task.poll(), PollStatus::Pending);
        assert_eq!(task.poll(), PollStatus::Pending);
        assert_eq!(task.report().window, 0);

        assert_eq!(
            task.poll(),
            PollStatus::Finished(TransferOutcome::Completed {
                total_size: 10_000,
                chunks: 3
            })
        );
        assert_eq!(task.state(), TaskState::Done);

        let chunks = channel.drain_chunks().unwrap();
        assert_eq!(chunk_sizes(&chunks), vec![4096, 4096, 1808]);
        assert!(chunks.iter().all(|c| c.total_size() == 10_000));
        assert_eq!(reassemble(&chunks), data);

        // Resources go on the finishing poll, not at drop
        assert!(!task.has_archive());
        assert_eq!(h.procs.released(), vec![ProcessId::new(PID).unwrap()]);
        let report = task.report();
        assert_eq!(report.sent, 10_000);
        assert_eq!(report.total_size, Some(10_000));
        assert!(!report.timeout_reported);
    }

    #[test]
    fn launch_passes_options_and_output_path() {
        let h = Harness::new();
        let task = h.start(0);
        let launched = h.procs.launched.lock().unwrap().clone();
        assert_eq!(launched.len(), 1);
        assert_eq!(launched[0].program(), &PathBuf::from("/opt/sdk/kbcmd"));
        assert_eq!(
            launched[0].get_args(),
            &[
                "--clientsdk=unity".to_string(),
                format!("--zip={}", h.archive_path("unity").display()),
            ]
        );
        assert_eq!(task.output_path(), h.archive_path("unity"));
        assert!(h.archive_path("unity").parent().unwrap().is_dir());
    }

    #[test]
    fn non_positive_window_uses_default() {
        for window in [0, -5] {
            let h = Harness::new();
            let channel = h.registry.connect(h.peer.clone());
            let mut task = h.start(window);
            h.procs.exit();
            h.write_archive("unity", 3000);
            h.advance_ms(100);

            while task.poll().keep_scheduling() {}
            assert_eq!(
                chunk_sizes(&channel.drain_chunks().unwrap()),
                vec![1024, 1024, 952]
            );
        }
    }

    #[test]
    fn window_larger_than_archive_sends_one_chunk() {
        let h = Harness::new();
        let channel = h.registry.connect(h.peer.clone());
        let mut task = h.start(1_000_000);
        h.procs.exit();
        h.write_archive("unity", 500);
        h.advance_ms(100);

        assert_eq!(task.poll(), PollStatus::Pending);
        assert_eq!(
            task.poll(),
            PollStatus::Finished(TransferOutcome::Completed {
                total_size: 500,
                chunks: 1
            })
        );
        assert_eq!(chunk_sizes(&channel.drain_chunks().unwrap()), vec![500]);
    }

    #[test]
    fn process_checks_are_rate_limited() {
        let h = Harness::new();
        let mut task = h.start(0);

        h.advance_ms(50);
        task.poll();
        assert_eq!(h.procs.status_calls(), 0);

        h.advance_ms(50);
        task.poll();
        assert_eq!(h.procs.status_calls(), 1);

        h.advance_ms(50);
        task.poll();
        task.poll();
        assert_eq!(h.procs.status_calls(), 1);

        h.advance_ms(50);
        task.poll();
        assert_eq!(h.procs.status_calls(), 2);
        assert_eq!(task.state(), TaskState::WaitingProcess);
    }

    #[test]
    fn tool_that_never_exits_times_out() {
        let mut h = Harness::new();
        let channel = h.registry.connect(h.peer.clone());
        let mut task = h.start(0);

        h.advance_ms(60_000);
        assert_eq!(task.poll(), PollStatus::Pending);

        h.advance_ms(1);
        let expected = PollStatus::Finished(TransferOutcome::TimedOut {
            kind: TimeoutKind::ArchiveNeverLoaded,
        });
        assert_eq!(task.poll(), expected);
        assert_eq!(task.state(), TaskState::TimedOut);
        assert!(task.report().timeout_reported);
        assert!(!task.has_archive());
        assert_eq!(channel.frame_count(), 0);

        // Finished tasks stay finished
        h.advance_ms(1_000);
        assert_eq!(task.poll(), expected);

        let events = h.transfer_events();
        let timeouts = events
            .iter()
            .filter(|e| matches!(e, TransferEvent::TimedOut { .. }))
            .count();
        assert_eq!(timeouts, 1);
    }

    #[test]
    fn empty_archive_is_never_streamed() {
        let h = Harness::new();
        let channel = h.registry.connect(h.peer.clone());
        let mut task = h.start(0);
        h.procs.exit();
        h.write_archive("unity", 0);

        for _ in 0..10 {
            h.advance_ms(500);
            assert_eq!(task.poll(), PollStatus::Pending);
            assert_eq!(task.state(), TaskState::WaitingProcess);
        }

        h.advance_ms(60_000);
        assert_eq!(
            task.poll(),
            PollStatus::Finished(TransferOutcome::TimedOut {
                kind: TimeoutKind::ArchiveNeverLoaded
            })
        );
        assert_eq!(channel.frame_count(), 0);
    }

    #[test]
    fn archive_appearing_late_is_picked_up() {
        let h = Harness::new();
        let channel = h.registry.connect(h.peer.clone());
        let mut task = h.start(0);
        h.procs.exit();

        h.advance_ms(100);
        assert_eq!(task.poll(), PollStatus::Pending);
        assert!(!task.has_archive());

        h.write_archive("unity", 10);
        h.advance_ms(100);
        assert_eq!(task.poll(), PollStatus::Pending);
        assert!(task.has_archive());
        assert_eq!(channel.frame_count(), 1);
    }

    #[test]
    fn failed_launch_ends_as_launch_failed() {
        let mut h = Harness::with_processes(
            FakeProcesses {
                fail_launch: true,
                ..FakeProcesses::default()
            },
            TaskSettings::default(),
        );
        let mut task = h.start(0);
        assert!(task.process_id().is_none());
        assert_eq!(task.state(), TaskState::WaitingProcess);

        h.advance_ms(30_000);
        assert_eq!(task.poll(), PollStatus::Pending);
        assert_eq!(h.procs.status_calls(), 0);

        h.advance_ms(30_001);
        assert_eq!(
            task.poll(),
            PollStatus::Finished(TransferOutcome::LaunchFailed)
        );
        assert_eq!(task.state(), TaskState::LaunchFailed);
        assert!(task.report().timeout_reported);
        assert!(h.procs.released().is_empty());

        let events = h.transfer_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, TransferEvent::LaunchFailed { .. })));
    }

    #[test]
    fn missing_channel_skips_the_tick() {
        let mut h = Harness::new();
        let mut task = h.start(0);
        h.procs.exit();
        h.write_archive("unity", 2000);

        h.advance_ms(100);
        assert_eq!(task.poll(), PollStatus::Pending);
        assert_eq!(task.poll(), PollStatus::Pending);
        assert_eq!(task.state(), TaskState::Streaming);
        assert_eq!(task.report().sent, 0);

        let unavailable = h
            .transfer_events()
            .into_iter()
            .filter(|e| matches!(e, TransferEvent::ChannelUnavailable { .. }))
            .count();
        assert_eq!(unavailable, 1);

        let channel = h.registry.connect(h.peer.clone());
        assert_eq!(task.poll(), PollStatus::Pending);
        assert_eq!(chunk_sizes(&channel.drain_chunks().unwrap()), vec![1024]);
    }

    #[test]
    fn stalled_stream_times_out_generically() {
        let h = Harness::new();
        let mut task = h.start(0);
        h.procs.exit();
        h.write_archive("unity", 2000);
        h.advance_ms(100);
        task.poll();
        assert!(task.has_archive());

        h.advance_ms(61_000);
        assert_eq!(
            task.poll(),
            PollStatus::Finished(TransferOutcome::TimedOut {
                kind: TimeoutKind::Generic
            })
        );
        assert!(!task.has_archive());
        assert_eq!(task.report().total_size, Some(2000));
    }

    #[test]
    fn closed_channel_does_not_advance_offset() {
        let h = Harness::new();
        let channel = h.registry.connect(h.peer.clone());
        channel.close();
        let mut task = h.start(0);
        h.procs.exit();
        h.write_archive("unity", 2000);
        h.advance_ms(100);

        assert_eq!(task.poll(), PollStatus::Pending);
        assert_eq!(task.report().sent, 0);
        assert_eq!(task.report().chunks_sent, 0);
    }

    #[test]
    fn stale_archive_is_removed_on_start() {
        let h = Harness::new();
        std::fs::create_dir_all(h.archive_path("unity").parent().unwrap()).unwrap();
        h.write_archive("unity", 64);

        let _task = h.start(0);
        assert!(!h.archive_path("unity").exists());
    }

    #[test]
    fn dropping_unfinished_task_releases_once() {
        let mut h = Harness::new();
        let task = h.start(0);
        drop(task);

        assert_eq!(h.procs.released(), vec![ProcessId::new(PID).unwrap()]);
        let released = h
            .transfer_events()
            .into_iter()
            .filter(|e| matches!(e, TransferEvent::Released { .. }))
            .count();
        assert_eq!(released, 1);
    }

    #[test]
    fn finished_task_releases_once_including_drop() {
        let mut h = Harness::new();
        let mut task = h.start(0);
        h.advance_ms(61_000);
        assert!(!task.poll().keep_scheduling());
        drop(task);

        assert_eq!(h.procs.released().len(), 1);
        let released = h
            .transfer_events()
            .into_iter()
            .filter(|e| matches!(e, TransferEvent::Released { .. }))
            .count();
        assert_eq!(released, 1);
    }

    #[test]
    fn scheduler_reaps_finished_tasks() {
        let h = Harness::new();
        let channel = h.registry.connect(h.peer.clone());
        let mut scheduler = Scheduler::new(h.ctx.clone());

        let fast = scheduler.spawn(h.request(0, "unity"));
        let slow = scheduler.spawn(h.request(0, "unreal"));
        assert_ne!(fast, slow);
        assert_eq!(scheduler.len(), 2);

        h.procs.exit();
        h.write_archive("unity", 100);
        h.advance_ms(100);

        assert!(scheduler.poll_all().is_empty());
        let done = scheduler.poll_all();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].handle, fast);
        assert_eq!(
            done[0].outcome,
            TransferOutcome::Completed {
                total_size: 100,
                chunks: 1
            }
        );
        assert!(!scheduler.contains(fast));
        assert!(scheduler.contains(slow));
        assert_eq!(channel.drain_chunks().unwrap().len(), 1);

        // Cancelling reaped or unknown handles is harmless
        assert!(!scheduler.cancel(fast));
        assert!(scheduler.cancel(slow));
        assert!(!scheduler.cancel(slow));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn scheduler_reports_timeouts() {
        let h = Harness::new();
        let mut scheduler = Scheduler::new(h.ctx.clone());
        let handle = scheduler.spawn(h.request(0, "unity"));
        assert_eq!(
            scheduler.get(handle).map(PackageTransferTask::state),
            Some(TaskState::WaitingProcess)
        );

        h.advance_ms(60_001);
        let done = scheduler.poll_all();
        assert_eq!(done.len(), 1);
        assert!(done[0].report.timeout_reported);
        assert_eq!(done[0].report.state, TaskState::TimedOut);
        assert!(scheduler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn drive_runs_until_all_tasks_finish() {
        let settings = TaskSettings {
            poll_interval: Duration::ZERO,
            ..TaskSettings::default()
        };
        let h = Harness::with_processes(FakeProcesses::default(), settings);
        let channel = h.registry.connect(h.peer.clone());
        let mut scheduler = Scheduler::new(h.ctx.clone());
        scheduler.spawn(h.request(256, "unity"));
        h.procs.exit();
        let data = h.write_archive("unity", 1000);

        let done = scheduler.drive(Duration::from_millis(20)).await;
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].report.chunks_sent, 4);
        assert_eq!(reassemble(&channel.drain_chunks().unwrap()), data);
    }

    #[tokio::test(start_paused = true)]
    async fn drive_tolerates_zero_tick() {
        let settings = TaskSettings {
            poll_interval: Duration::ZERO,
            ..TaskSettings::default()
        };
        let h = Harness::with_processes(FakeProcesses::default(), settings);
        let channel = h.registry.connect(h.peer.clone());
        let mut scheduler = Scheduler::new(h.ctx.clone());
        scheduler.spawn(h.request(512, "unity"));
        h.procs.exit();
        let data = h.write_archive("unity", 1000);

        let done = scheduler.drive(Duration::ZERO).await;
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].report.chunks_sent, 2);
        assert_eq!(reassemble(&channel.drain_chunks().unwrap()), data);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn chunks_cover_archive_exactly(window in -8i64..3000, size in 1usize..12_000) {
            let h = Harness::new();
            let channel = h.registry.connect(h.peer.clone());
            let mut task = h.start(window);
            h.procs.exit();
            let data = h.write_archive("unity", size);
            h.advance_ms(100);

            let mut polls = 0;
            while task.poll().keep_scheduling() {
                polls += 1;
                prop_assert!(polls <= size + 1);
            }

            let chunks = channel.drain_chunks().unwrap();
            let effective = sdkpack_transfer::normalize_window(window).min(size);
            prop_assert_eq!(chunks.len(), size.div_ceil(effective));
            prop_assert!(chunks.iter().all(|c| c.payload().len() <= effective));
            prop_assert!(chunks.iter().all(|c| c.total_size() == size as u64));
            prop_assert_eq!(reassemble(&chunks), data);
        }
    }
}
