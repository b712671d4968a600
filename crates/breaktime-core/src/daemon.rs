use crate::{
    events::{EventReceiver, SchedulerEvent},
    ipc::{listen, CommandReceiver, CommandSender, DaemonIpcHandler, IpcRequest, IpcResponse},
    monitor::create_monitor,
    notifier::{format_duration, Notifier},
    probe::SystemActivityProbe,
    scheduler::{Interruption, TickOutcome, UsageScheduler},
    settings::FileSettingsStore,
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::{path::Path, sync::Arc, time::Duration};
use tokio::{
    sync::mpsc,
    time::{interval, MissedTickBehavior},
};

/// Wall-clock gap between ticks that means the machine was asleep
const SUSPEND_GAP_SECS: i64 = 30;

const COMMAND_QUEUE_DEPTH: usize = 32;

pub struct Daemon {
    scheduler: UsageScheduler,
    events: EventReceiver,
    commands_tx: CommandSender,
    commands_rx: Option<CommandReceiver>,
    started_at: DateTime<Utc>,
    last_tick: Option<DateTime<Utc>>,
    shutdown_requested: bool,
}

impl Daemon {
    #[must_use]
    pub fn new(mut scheduler: UsageScheduler) -> Self {
        let events = scheduler.subscribe();
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);

        Self {
            scheduler,
            events,
            commands_tx,
            commands_rx: Some(commands_rx),
            started_at: Utc::now(),
            last_tick: None,
            shutdown_requested: false,
        }
    }

    /// Build a daemon with the platform idle monitor and settings from `data_dir`
    ///
    /// # Errors
    ///
    /// Returns an error if no idle monitor exists for this platform
    pub fn with_platform_probe(data_dir: &Path, notifier: Box<dyn Notifier>) -> Result<Self> {
        let store = FileSettingsStore::in_dir(data_dir);
        let settings = store.load_or_default();
        let probe = SystemActivityProbe::new(create_monitor()?);

        let scheduler = UsageScheduler::new(Box::new(probe), Box::new(store), notifier)
            .with_monitoring(settings.auto_start);

        log::info!(
            "Break threshold {}, monitoring {}",
            format_duration(scheduler.break_threshold_seconds()),
            if settings.auto_start { "on" } else { "off" }
        );
        Ok(Self::new(scheduler))
    }

    #[must_use]
    pub fn scheduler(&self) -> &UsageScheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn command_sender(&self) -> CommandSender {
        self.commands_tx.clone()
    }

    /// Drive the scheduler at 1 Hz and serve IPC on `sock_path` until a
    /// shutdown request or Ctrl-C
    ///
    /// # Errors
    ///
    /// Returns an error if the loop was already started
    pub async fn run_with_signals(&mut self, sock_path: &Path) -> Result<()> {
        let mut commands = self
            .commands_rx
            .take()
            .ok_or_else(|| anyhow::anyhow!("Daemon is already running"))?;

        let ipc_handler = Arc::new(DaemonIpcHandler::new(self.command_sender()));
        let sock_path = sock_path.to_path_buf();
        tokio::spawn(async move {
            if let Err(e) = listen(ipc_handler, &sock_path).await {
                log::error!("IPC listener failed: {e}");
            }
        });

        let mut ticker = interval(Duration::from_secs(1));
        // A slow probe must not cause a burst of catch-up ticks
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        log::info!("Daemon started with signal handling and IPC");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.on_tick(Utc::now()).await;
                }
                Some(command) = commands.recv() => {
                    let response = self.apply(command.request);
                    if command.reply.send(response).is_err() {
                        log::debug!("IPC client went away before the reply");
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Received Ctrl-C, shutting down...");
                    self.shutdown_requested = true;
                }
            }

            self.drain_events();
            if self.shutdown_requested {
                break;
            }
        }

        log::info!(
            "Daemon shut down gracefully (usage at exit: {})",
            format_duration(self.scheduler.usage_seconds())
        );
        Ok(())
    }

    /// One pass of the 1 Hz loop. A wall-clock jump since the previous tick
    /// means the machine slept, which counts as a resume interruption.
    pub async fn on_tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        if let Some(previous) = self.last_tick.replace(now) {
            let gap = now.signed_duration_since(previous).num_seconds();
            if gap > SUSPEND_GAP_SECS {
                log::info!("Detected {gap}s gap between ticks, assuming system resumed");
                self.scheduler.handle_interruption(Interruption::Resume);
            }
        }

        self.scheduler.tick_at(now).await
    }

    /// Apply an IPC request to the scheduler
    pub fn apply(&mut self, request: IpcRequest) -> IpcResponse {
        match request {
            IpcRequest::Status => {
                let snapshot = self.scheduler.snapshot();
                let uptime = Utc::now()
                    .signed_duration_since(self.started_at)
                    .num_seconds();
                IpcResponse::Status {
                    state: snapshot.scheduler_state(),
                    usage_seconds: snapshot.usage_seconds,
                    break_threshold_seconds: snapshot.break_threshold_seconds,
                    is_monitoring: snapshot.is_monitoring,
                    is_break_active: snapshot.is_break_active,
                    uptime_seconds: u64::try_from(uptime).unwrap_or(0),
                }
            }
            IpcRequest::ToggleMonitoring => IpcResponse::Monitoring {
                is_monitoring: self.scheduler.toggle_monitoring(),
            },
            IpcRequest::ResetTimer => {
                self.scheduler.reset_timer();
                IpcResponse::Ok
            }
            IpcRequest::StartBreak => {
                self.scheduler.start_break();
                IpcResponse::Ok
            }
            IpcRequest::SnoozeBreak => {
                self.scheduler.snooze_break();
                IpcResponse::Ok
            }
            IpcRequest::SetThreshold { minutes } => {
                match self.scheduler.set_break_threshold(minutes) {
                    Ok(()) => IpcResponse::Ok,
                    Err(e) => IpcResponse::Error {
                        message: e.to_string(),
                    },
                }
            }
            IpcRequest::Interrupt { kind } => {
                self.scheduler.handle_interruption(kind);
                IpcResponse::Ok
            }
            IpcRequest::Shutdown => {
                self.shutdown_requested = true;
                IpcResponse::Shutdown
            }
        }
    }

    #[must_use]
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                SchedulerEvent::UsageChanged { usage_seconds, .. } => {
                    log::trace!("Usage {}", format_duration(usage_seconds));
                }
                SchedulerEvent::BreakAlert { usage_seconds } => {
                    log::info!("Break alert at {}", format_duration(usage_seconds));
                }
                SchedulerEvent::TimerReset => log::debug!("Timer reset"),
                SchedulerEvent::MonitoringToggled { is_monitoring } => {
                    log::debug!("Monitoring toggled: {is_monitoring}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        scheduler::SchedulerState,
        testing::{scheduler_with, MemoryStore, RecordingNotifier, ScriptedProbe},
    };

    fn daemon() -> (Daemon, ScriptedProbe, MemoryStore) {
        let probe = ScriptedProbe::default();
        let store = MemoryStore::default();
        let scheduler = scheduler_with(&probe, &store, &RecordingNotifier::default());
        (Daemon::new(scheduler), probe, store)
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_consecutive_ticks_count() {
        let (mut daemon, _, _) = daemon();
        for s in 0..10 {
            daemon.on_tick(at(s)).await;
        }
        assert_eq!(daemon.scheduler().usage_seconds(), 10);
    }

    #[tokio::test]
    async fn test_tick_gap_is_treated_as_resume() {
        let (mut daemon, _, _) = daemon();
        for s in 0..100 {
            daemon.on_tick(at(s)).await;
        }

        let outcome = daemon.on_tick(at(100 + 3600)).await;

        assert_eq!(outcome, TickOutcome::Counted);
        assert_eq!(daemon.scheduler().usage_seconds(), 1);
    }

    #[tokio::test]
    async fn test_short_gap_keeps_usage() {
        let (mut daemon, _, _) = daemon();
        daemon.on_tick(at(0)).await;
        daemon.on_tick(at(20)).await;
        assert_eq!(daemon.scheduler().usage_seconds(), 2);
    }

    #[test]
    fn test_status_reflects_scheduler() {
        let (mut daemon, _, _) = daemon();
        match daemon.apply(IpcRequest::Status) {
            IpcResponse::Status {
                state,
                usage_seconds,
                break_threshold_seconds,
                is_monitoring,
                is_break_active,
                ..
            } => {
                assert_eq!(state, SchedulerState::Monitoring);
                assert_eq!(usage_seconds, 0);
                assert_eq!(break_threshold_seconds, 1800);
                assert!(is_monitoring);
                assert!(!is_break_active);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_set_threshold_validation_surfaces_as_error_response() {
        let (mut daemon, _, store) = daemon();

        let rejected = daemon.apply(IpcRequest::SetThreshold { minutes: 10 });
        assert!(matches!(rejected, IpcResponse::Error { message } if message.contains("10")));

        assert_eq!(
            daemon.apply(IpcRequest::SetThreshold { minutes: 45 }),
            IpcResponse::Ok
        );
        assert_eq!(daemon.scheduler().break_threshold_seconds(), 2700);
        assert_eq!(*store.minutes.lock().unwrap(), Some(45));
    }

    #[tokio::test]
    async fn test_commands_apply_between_ticks() {
        let (mut daemon, probe, _) = daemon();
        for s in 0..5 {
            daemon.on_tick(at(s)).await;
        }

        assert_eq!(
            daemon.apply(IpcRequest::ToggleMonitoring),
            IpcResponse::Monitoring {
                is_monitoring: false
            }
        );
        let calls = probe.calls.load(std::sync::atomic::Ordering::SeqCst);
        assert_eq!(daemon.on_tick(at(5)).await, TickOutcome::Skipped);
        assert_eq!(
            probe.calls.load(std::sync::atomic::Ordering::SeqCst),
            calls
        );

        daemon.apply(IpcRequest::ToggleMonitoring);
        daemon.apply(IpcRequest::Interrupt {
            kind: Interruption::Unlock,
        });
        assert_eq!(daemon.scheduler().usage_seconds(), 0);
    }

    #[tokio::test]
    async fn test_break_commands() {
        let (mut daemon, _, _) = daemon();
        daemon.apply(IpcRequest::SetThreshold { minutes: 15 });
        for s in 0..900 {
            daemon.on_tick(at(s)).await;
        }
        assert_eq!(daemon.scheduler().state(), SchedulerState::BreakPending);

        assert_eq!(daemon.apply(IpcRequest::SnoozeBreak), IpcResponse::Ok);
        assert_eq!(daemon.scheduler().usage_seconds(), 600);

        daemon.apply(IpcRequest::ResetTimer);
        assert_eq!(daemon.scheduler().usage_seconds(), 0);

        daemon.apply(IpcRequest::StartBreak);
        assert_eq!(daemon.scheduler().state(), SchedulerState::Monitoring);
    }

    #[tokio::test]
    async fn test_run_loop_serves_ipc_until_shutdown() {
        use crate::ipc::IpcClient;
        use tempfile::tempdir;

        let dir = tempdir().unwrap();
        let sock_path = dir.path().join("breaktime.sock");
        let (mut daemon, _, _) = daemon();

        let client_side = async {
            while !sock_path.exists() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            let client = IpcClient::new(&sock_path);

            match client.send_command(IpcRequest::Status).await.unwrap() {
                IpcResponse::Status {
                    state,
                    is_monitoring,
                    break_threshold_seconds,
                    ..
                } => {
                    assert_eq!(state, SchedulerState::Monitoring);
                    assert!(is_monitoring);
                    assert_eq!(break_threshold_seconds, 1800);
                }
                other => panic!("unexpected response: {other:?}"),
            }

            assert_eq!(
                client
                    .send_command(IpcRequest::ToggleMonitoring)
                    .await
                    .unwrap(),
                IpcResponse::Monitoring {
                    is_monitoring: false
                }
            );
            assert_eq!(
                client.send_command(IpcRequest::Shutdown).await.unwrap(),
                IpcResponse::Shutdown
            );
        };

        let (result, ()) = tokio::time::timeout(
            Duration::from_secs(10),
            async { tokio::join!(daemon.run_with_signals(&sock_path), client_side) },
        )
        .await
        .unwrap();

        result.unwrap();
        assert!(daemon.shutdown_requested());
        assert!(!daemon.scheduler().snapshot().is_monitoring);
    }

    #[test]
    fn test_shutdown_request_sets_flag() {
        let (mut daemon, _, _) = daemon();
        assert!(!daemon.shutdown_requested());
        assert_eq!(daemon.apply(IpcRequest::Shutdown), IpcResponse::Shutdown);
        assert!(daemon.shutdown_requested());
    }
}
