//! Test doubles for the scheduler's collaborators.

use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use crate::{
    error::{Error, Result},
    notifier::Notifier,
    probe::ActivityProbe,
    scheduler::UsageScheduler,
    settings::{SettingsStore, DEFAULT_THRESHOLD_MINUTES},
};

#[derive(Clone, Default)]
pub struct ScriptedProbe {
    pub inactive: Arc<AtomicBool>,
    pub broken: Arc<AtomicBool>,
    pub calls: Arc<AtomicUsize>,
}

impl ScriptedProbe {
    pub fn set_active(&self, active: bool) {
        self.inactive.store(!active, Ordering::SeqCst);
    }
}

#[async_trait]
impl ActivityProbe for ScriptedProbe {
    async fn is_user_active(&self) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.broken.load(Ordering::SeqCst) {
            return Err(Error::ProbeUnavailable(String::from("xprintidle missing")));
        }
        Ok(!self.inactive.load(Ordering::SeqCst))
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    pub minutes: Arc<Mutex<Option<u32>>>,
    pub fail_load: bool,
    pub fail_save: bool,
}

impl SettingsStore for MemoryStore {
    fn load_threshold_minutes(&self) -> Result<u32> {
        if self.fail_load {
            return Err(Error::PersistenceFailure {
                path: "settings.json".into(),
                reason: String::from("permission denied"),
            });
        }
        Ok(self
            .minutes
            .lock()
            .unwrap()
            .unwrap_or(DEFAULT_THRESHOLD_MINUTES))
    }

    fn save_threshold_minutes(&self, minutes: u32) -> Result<()> {
        if self.fail_save {
            return Err(Error::PersistenceFailure {
                path: "settings.json".into(),
                reason: String::from("read-only file system"),
            });
        }
        *self.minutes.lock().unwrap() = Some(minutes);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub messages: Arc<Mutex<Vec<String>>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// Monitoring scheduler wired to fresh doubles
pub fn scheduler_with(
    probe: &ScriptedProbe,
    store: &MemoryStore,
    notifier: &RecordingNotifier,
) -> UsageScheduler {
    UsageScheduler::new(
        Box::new(probe.clone()),
        Box::new(store.clone()),
        Box::new(notifier.clone()),
    )
    .with_monitoring(true)
}
