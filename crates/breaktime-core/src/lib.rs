pub mod config;
pub mod daemon;
pub mod error;
pub mod events;
pub mod ipc;
pub mod monitor;
pub mod notifier;
pub mod probe;
pub mod scheduler;
pub mod settings;

#[cfg(test)]
mod testing;

pub use daemon::Daemon;
pub use error::{Error, Result};
pub use events::SchedulerEvent;
pub use scheduler::{Interruption, SchedulerState, TickOutcome, UsageScheduler, UsageState};
