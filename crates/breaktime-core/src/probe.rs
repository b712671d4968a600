use async_trait::async_trait;
use std::time::Duration;

use crate::{
    error::{Error, Result},
    monitor::SystemMonitor,
};

/// Input idle time below which the user counts as active
pub const DEFAULT_ACTIVE_WINDOW_SECS: u64 = 60;

/// Upper bound on a single probe query, kept under the 1 Hz tick period
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(900);

/// Answers "is the user at the computer right now?"
#[async_trait]
pub trait ActivityProbe: Send + Sync {
    /// # Errors
    ///
    /// Returns `Error::ProbeUnavailable` when idle time cannot be determined
    async fn is_user_active(&self) -> Result<bool>;
}

/// Activity probe backed by the platform idle monitor
pub struct SystemActivityProbe {
    monitor: Box<dyn SystemMonitor>,
    active_window_secs: u64,
    timeout: Duration,
}

impl SystemActivityProbe {
    #[must_use]
    pub fn new(monitor: Box<dyn SystemMonitor>) -> Self {
        Self {
            monitor,
            active_window_secs: DEFAULT_ACTIVE_WINDOW_SECS,
            timeout: PROBE_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_active_window(mut self, secs: u64) -> Self {
        self.active_window_secs = secs;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ActivityProbe for SystemActivityProbe {
    async fn is_user_active(&self) -> Result<bool> {
        let idle = tokio::time::timeout(self.timeout, self.monitor.get_idle_seconds())
            .await
            .map_err(|_| {
                Error::ProbeUnavailable(format!(
                    "{} did not answer within {}ms",
                    self.monitor.name(),
                    self.timeout.as_millis()
                ))
            })?
            .map_err(|e| Error::ProbeUnavailable(format!("{}: {e:#}", self.monitor.name())))?;

        log::trace!("Idle for {idle}s ({})", self.monitor.name());
        Ok(idle < self.active_window_secs)
    }
}
