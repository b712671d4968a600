use anyhow::{bail, Result};
use async_trait::async_trait;

use super::SystemMonitor;

// CoreGraphics bindings for idle time detection
#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGEventSourceSecondsSinceLastEventType(source_state_id: u32, event_type: u32) -> f64;
}

// CGEventSourceStateID
const K_CG_EVENT_SOURCE_STATE_COMBINED_SESSION_STATE: u32 = 0;

// kCGAnyInputEventType
const K_CG_ANY_INPUT_EVENT_TYPE: u32 = u32::MAX;

pub struct MacOSMonitor;

impl MacOSMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Time since the last keyboard/mouse/trackpad event
    fn get_system_idle_seconds() -> f64 {
        unsafe {
            CGEventSourceSecondsSinceLastEventType(
                K_CG_EVENT_SOURCE_STATE_COMBINED_SESSION_STATE,
                K_CG_ANY_INPUT_EVENT_TYPE,
            )
        }
    }
}

impl Default for MacOSMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SystemMonitor for MacOSMonitor {
    async fn get_idle_seconds(&self) -> Result<u64> {
        let idle = Self::get_system_idle_seconds();
        if !idle.is_finite() || idle < 0.0 {
            bail!("CoreGraphics returned invalid idle time: {idle}");
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(idle as u64)
    }

    fn name(&self) -> &'static str {
        "CoreGraphics"
    }
}
