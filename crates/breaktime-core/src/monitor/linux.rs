use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

use super::SystemMonitor;

/// Idle detection through `xprintidle`, which reports X11 idle time in milliseconds
pub struct LinuxMonitor {
    program: String,
}

impl LinuxMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: String::from("xprintidle"),
        }
    }
}

impl Default for LinuxMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse `xprintidle` output (milliseconds) into whole seconds
fn parse_idle_millis(stdout: &str) -> Result<u64> {
    let millis: u64 = stdout
        .trim()
        .parse()
        .with_context(|| format!("Unexpected xprintidle output: {:?}", stdout.trim()))?;
    Ok(millis / 1000)
}

#[async_trait]
impl SystemMonitor for LinuxMonitor {
    async fn get_idle_seconds(&self) -> Result<u64> {
        let output = Command::new(&self.program)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.program))?;

        if !output.status.success() {
            bail!("{} exited with {}", self.program, output.status);
        }

        parse_idle_millis(&String::from_utf8_lossy(&output.stdout))
    }

    fn name(&self) -> &'static str {
        "xprintidle"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_idle_millis_rounds_down() {
        assert_eq!(parse_idle_millis("59999\n").unwrap(), 59);
        assert_eq!(parse_idle_millis("60000").unwrap(), 60);
    }

    #[test]
    fn test_parse_idle_millis_rejects_garbage() {
        assert!(parse_idle_millis("").is_err());
        assert!(parse_idle_millis("couldn't open display").is_err());
    }

    #[tokio::test]
    async fn test_missing_binary_is_an_error() {
        let monitor = LinuxMonitor {
            program: String::from("breaktime-no-such-idle-binary"),
        };
        assert!(monitor.get_idle_seconds().await.is_err());
    }
}
