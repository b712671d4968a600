//! Usage accumulation and break scheduling.
//!
//! The scheduler is driven by a 1 Hz tick. Each tick asks the activity probe
//! whether the user is present; active seconds accumulate until the break
//! threshold is reached, at which point a break alert is raised and counting
//! stops until the user starts or snoozes the break.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::{
    error::Result,
    events::{EventBus, EventReceiver, SchedulerEvent},
    notifier::{format_duration, Notifier},
    probe::ActivityProbe,
    settings::{
        clamp_threshold_minutes, validate_threshold_minutes, SettingsStore,
        DEFAULT_THRESHOLD_MINUTES,
    },
};

/// Inactivity after which accumulated usage is discarded
pub const IDLE_RESET_SECS: i64 = 300;

/// Usage credited back by a snooze
pub const SNOOZE_CREDIT_SECS: u64 = 300;

/// Coarse scheduler state derived from the monitoring and break flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerState {
    /// Monitoring is switched off
    Idle,
    /// Counting active seconds
    Monitoring,
    /// Threshold reached, waiting for the user to start or snooze a break
    BreakPending,
}

/// System-level signals that invalidate accumulated usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interruption {
    Suspend,
    Resume,
    Lock,
    Unlock,
}

impl Interruption {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Suspend => "suspend",
            Self::Resume => "resume",
            Self::Lock => "lock",
            Self::Unlock => "unlock",
        }
    }
}

impl fmt::Display for Interruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interruption {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "suspend" | "sleep" => Ok(Self::Suspend),
            "resume" | "wake" => Ok(Self::Resume),
            "lock" => Ok(Self::Lock),
            "unlock" => Ok(Self::Unlock),
            other => Err(format!(
                "Unknown interruption '{other}'. Use suspend, resume, lock or unlock"
            )),
        }
    }
}

/// Snapshot of the scheduler's mutable state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageState {
    pub usage_seconds: u64,
    pub break_threshold_seconds: u64,
    pub is_monitoring: bool,
    pub is_break_active: bool,
    pub last_activity: DateTime<Utc>,
}

impl UsageState {
    #[must_use]
    pub fn scheduler_state(&self) -> SchedulerState {
        if self.is_break_active {
            SchedulerState::BreakPending
        } else if self.is_monitoring {
            SchedulerState::Monitoring
        } else {
            SchedulerState::Idle
        }
    }
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not monitoring, or a break is pending
    Skipped,
    /// One active second was added
    Counted,
    /// The active second crossed the threshold
    BreakTriggered,
    /// User inactive, still within the grace window
    Inactive,
    /// User inactive past the grace window; usage was reset
    IdleReset,
}

pub struct UsageScheduler {
    state: UsageState,
    probe: Box<dyn ActivityProbe>,
    settings: Box<dyn SettingsStore>,
    notifier: Box<dyn Notifier>,
    events: EventBus,
    // Set once the idle grace window has reset usage; cleared by activity
    idle_reset_done: bool,
}

impl UsageScheduler {
    /// Create a scheduler with the persisted threshold, or the 30 minute
    /// default when settings cannot be read. Monitoring starts off.
    #[must_use]
    pub fn new(
        probe: Box<dyn ActivityProbe>,
        settings: Box<dyn SettingsStore>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        let minutes = match settings.load_threshold_minutes() {
            Ok(minutes) => {
                let clamped = clamp_threshold_minutes(minutes);
                if clamped != minutes {
                    log::warn!("Stored break threshold {minutes}m out of range, using {clamped}m");
                }
                clamped
            }
            Err(e) => {
                log::warn!("{e}; using default break threshold of {DEFAULT_THRESHOLD_MINUTES}m");
                DEFAULT_THRESHOLD_MINUTES
            }
        };

        Self {
            state: UsageState {
                usage_seconds: 0,
                break_threshold_seconds: u64::from(minutes) * 60,
                is_monitoring: false,
                is_break_active: false,
                last_activity: Utc::now(),
            },
            probe,
            settings,
            notifier,
            events: EventBus::new(),
            idle_reset_done: false,
        }
    }

    /// Set the initial monitoring flag without emitting an event
    #[must_use]
    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.state.is_monitoring = enabled;
        self
    }

    pub fn subscribe(&mut self) -> EventReceiver {
        self.events.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> UsageState {
        self.state.clone()
    }

    #[must_use]
    pub fn state(&self) -> SchedulerState {
        self.state.scheduler_state()
    }

    #[must_use]
    pub fn usage_seconds(&self) -> u64 {
        self.state.usage_seconds
    }

    #[must_use]
    pub fn break_threshold_seconds(&self) -> u64 {
        self.state.break_threshold_seconds
    }

    /// Advance by one second of wall-clock time
    pub async fn tick(&mut self) -> TickOutcome {
        self.tick_at(Utc::now()).await
    }

    /// Advance with an explicit wall-clock instant
    pub async fn tick_at(&mut self, now: DateTime<Utc>) -> TickOutcome {
        if !self.state.is_monitoring || self.state.is_break_active {
            return TickOutcome::Skipped;
        }

        let active = match self.probe.is_user_active().await {
            Ok(active) => active,
            Err(e) => {
                log::warn!("{e}; assuming user is active");
                true
            }
        };

        if active {
            self.record_active(now)
        } else {
            self.record_inactive(now)
        }
    }

    fn record_active(&mut self, now: DateTime<Utc>) -> TickOutcome {
        self.state.usage_seconds += 1;
        self.state.last_activity = now;
        self.idle_reset_done = false;
        self.events.publish(&SchedulerEvent::UsageChanged {
            usage_seconds: self.state.usage_seconds,
            is_monitoring: self.state.is_monitoring,
            is_break_active: self.state.is_break_active,
        });

        if self.state.usage_seconds >= self.state.break_threshold_seconds {
            self.trigger_break();
            TickOutcome::BreakTriggered
        } else {
            TickOutcome::Counted
        }
    }

    fn record_inactive(&mut self, now: DateTime<Utc>) -> TickOutcome {
        let idle_for = now.signed_duration_since(self.state.last_activity);
        if self.idle_reset_done || idle_for <= Duration::seconds(IDLE_RESET_SECS) {
            return TickOutcome::Inactive;
        }

        log::info!(
            "Inactive for {}s, discarding {}s of usage",
            idle_for.num_seconds(),
            self.state.usage_seconds
        );
        self.reset_timer();
        self.idle_reset_done = true;
        TickOutcome::IdleReset
    }

    /// Raise the break alert. The counter is left as is for display.
    pub fn trigger_break(&mut self) {
        self.state.is_break_active = true;
        let usage = self.state.usage_seconds;
        log::info!("Break threshold reached after {}", format_duration(usage));

        self.notifier.notify(&format!(
            "Break Time! You've been using your computer for {}",
            format_duration(usage)
        ));
        self.events.publish(&SchedulerEvent::BreakAlert {
            usage_seconds: usage,
        });
    }

    /// User confirmed the break; counting resumes from zero
    pub fn start_break(&mut self) {
        self.reset_timer();
        self.state.is_break_active = false;
        log::info!("Break started");
        self.notifier.notify("Break started! Timer reset.");
    }

    /// Defer the break by crediting back `SNOOZE_CREDIT_SECS`
    pub fn snooze_break(&mut self) {
        self.state.usage_seconds = self.state.usage_seconds.saturating_sub(SNOOZE_CREDIT_SECS);
        self.state.is_break_active = false;
        log::info!("Break snoozed, usage now {}s", self.state.usage_seconds);
        self.notifier.notify("Break reminder snoozed for 5 minutes");
    }

    pub fn reset_timer(&mut self) {
        self.state.usage_seconds = 0;
        self.state.is_break_active = false;
        log::debug!("Usage timer reset");
        self.events.publish(&SchedulerEvent::TimerReset);
    }

    /// Flip monitoring; the counter is kept
    pub fn toggle_monitoring(&mut self) -> bool {
        self.state.is_monitoring = !self.state.is_monitoring;
        log::info!(
            "Monitoring {}",
            if self.state.is_monitoring { "enabled" } else { "paused" }
        );
        self.events.publish(&SchedulerEvent::MonitoringToggled {
            is_monitoring: self.state.is_monitoring,
        });
        self.state.is_monitoring
    }

    /// Change the break threshold and persist it.
    ///
    /// A persistence failure is logged; the new threshold still applies to
    /// the running session.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfiguration` when `minutes` is outside
    /// 15..=120; state is left unchanged.
    pub fn set_break_threshold(&mut self, minutes: u32) -> Result<()> {
        let minutes = validate_threshold_minutes(minutes)?;
        self.state.break_threshold_seconds = u64::from(minutes) * 60;
        log::info!("Break threshold set to {minutes}m");

        if let Err(e) = self.settings.save_threshold_minutes(minutes) {
            log::warn!("{e}; threshold applies to this session only");
        }
        Ok(())
    }

    /// Sleep, wake, lock and unlock all discard accumulated usage
    pub fn handle_interruption(&mut self, kind: Interruption) {
        log::info!("System {kind}, resetting usage timer");
        self.reset_timer();
    }
}
