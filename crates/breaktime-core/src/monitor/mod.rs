use anyhow::Result;
use async_trait::async_trait;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "windows")]
pub mod windows;

/// Platform idle-time source
#[async_trait]
pub trait SystemMonitor: Send + Sync {
    /// Get seconds since the last keyboard/mouse input
    async fn get_idle_seconds(&self) -> Result<u64>;

    /// Short name used in log messages
    fn name(&self) -> &'static str;
}

/// Create platform-specific monitor
///
/// # Errors
///
/// Returns an error if the current platform is not supported
pub fn create_monitor() -> Result<Box<dyn SystemMonitor>> {
    #[cfg(target_os = "macos")]
    {
        Ok(Box::new(macos::MacOSMonitor::new()))
    }

    #[cfg(target_os = "linux")]
    {
        Ok(Box::new(linux::LinuxMonitor::new()))
    }

    #[cfg(target_os = "windows")]
    {
        Ok(Box::new(windows::WindowsMonitor::new()))
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        anyhow::bail!("Unsupported platform")
    }
}
