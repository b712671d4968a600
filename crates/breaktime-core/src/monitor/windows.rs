use anyhow::{bail, Result};
use async_trait::async_trait;
use windows::Win32::System::SystemInformation::GetTickCount;
use windows::Win32::UI::Input::KeyboardAndMouse::{GetLastInputInfo, LASTINPUTINFO};

use super::SystemMonitor;

pub struct WindowsMonitor;

impl WindowsMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowsMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SystemMonitor for WindowsMonitor {
    async fn get_idle_seconds(&self) -> Result<u64> {
        #[allow(clippy::cast_possible_truncation)]
        let mut info = LASTINPUTINFO {
            cbSize: std::mem::size_of::<LASTINPUTINFO>() as u32,
            dwTime: 0,
        };

        let ok = unsafe { GetLastInputInfo(&mut info) };
        if !ok.as_bool() {
            bail!("GetLastInputInfo failed");
        }

        // Both counters wrap after ~49.7 days
        let now = unsafe { GetTickCount() };
        let idle_millis = now.wrapping_sub(info.dwTime);
        Ok(u64::from(idle_millis) / 1000)
    }

    fn name(&self) -> &'static str {
        "GetLastInputInfo"
    }
}
