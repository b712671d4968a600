//! Break threshold get/set

use anyhow::{bail, Result};
use breaktime_core::{
    ipc::{IpcRequest, IpcResponse},
    settings::{
        clamp_threshold_minutes, validate_threshold_minutes, FileSettingsStore, SettingsStore,
    },
};
use std::path::Path;

use super::control::send_request;

pub async fn show_threshold(data_dir: &Path) -> Result<()> {
    let minutes = match send_request(data_dir, IpcRequest::Status).await {
        Ok(Some(IpcResponse::Status {
            break_threshold_seconds,
            ..
        })) => break_threshold_seconds / 60,
        Ok(Some(other)) => bail!("Unexpected response from daemon: {other:?}"),
        Ok(None) | Err(_) => {
            let settings = FileSettingsStore::in_dir(data_dir).load_or_default();
            u64::from(clamp_threshold_minutes(settings.break_threshold_minutes))
        }
    };
    println!("breakThresholdMinutes = {minutes}");
    Ok(())
}

pub async fn set_threshold(data_dir: &Path, minutes: u32) -> Result<()> {
    validate_threshold_minutes(minutes)?;

    match send_request(data_dir, IpcRequest::SetThreshold { minutes }).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            // Daemon not running: write settings for the next start
            FileSettingsStore::in_dir(data_dir).save_threshold_minutes(minutes)?;
        }
        Err(e) => {
            log::warn!("Daemon not reachable ({e}), saving threshold to the settings file");
            FileSettingsStore::in_dir(data_dir).save_threshold_minutes(minutes)?;
        }
    }
    println!("Set breakThresholdMinutes = {minutes}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::daemon::SOCK_FILE;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_set_threshold_without_daemon_writes_settings() {
        let dir = tempdir().unwrap();

        set_threshold(dir.path(), 45).await.unwrap();

        let store = FileSettingsStore::in_dir(dir.path());
        assert_eq!(store.load_threshold_minutes().unwrap(), 45);
    }

    #[tokio::test]
    async fn test_set_threshold_with_stale_socket_writes_settings() {
        let dir = tempdir().unwrap();
        // Left behind by a daemon that was killed
        fs::write(dir.path().join(SOCK_FILE), b"").unwrap();

        set_threshold(dir.path(), 45).await.unwrap();

        let store = FileSettingsStore::in_dir(dir.path());
        assert_eq!(store.load_threshold_minutes().unwrap(), 45);
    }

    #[tokio::test]
    async fn test_set_threshold_rejects_out_of_range() {
        let dir = tempdir().unwrap();

        assert!(set_threshold(dir.path(), 10).await.is_err());
        assert!(!FileSettingsStore::in_dir(dir.path()).path().exists());
    }
}
