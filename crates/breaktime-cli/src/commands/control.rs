//! Scheduler control commands forwarded to the running daemon

use anyhow::{bail, Result};
use breaktime_core::{
    ipc::{IpcClient, IpcRequest, IpcResponse},
    Interruption,
};
use std::path::Path;

use super::daemon::SOCK_FILE;

/// Send a request to the daemon, or `None` when it is not running
pub async fn send_request(data_dir: &Path, request: IpcRequest) -> Result<Option<IpcResponse>> {
    let sock_path = data_dir.join(SOCK_FILE);
    if !sock_path.exists() {
        return Ok(None);
    }

    let client = IpcClient::new(&sock_path);
    match client.send_command(request).await? {
        IpcResponse::Error { message } => bail!(message),
        response => Ok(Some(response)),
    }
}

async fn send_or_explain(data_dir: &Path, request: IpcRequest) -> Result<Option<IpcResponse>> {
    let response = send_request(data_dir, request).await?;
    if response.is_none() {
        println!("Daemon is not running. Start it with `breaktime start`.");
    }
    Ok(response)
}

pub async fn toggle_monitoring(data_dir: &Path) -> Result<()> {
    match send_or_explain(data_dir, IpcRequest::ToggleMonitoring).await? {
        Some(IpcResponse::Monitoring { is_monitoring }) => {
            println!(
                "Monitoring {}",
                if is_monitoring { "resumed" } else { "paused" }
            );
        }
        Some(other) => bail!("Unexpected response from daemon: {other:?}"),
        None => {}
    }
    Ok(())
}

pub async fn reset_timer(data_dir: &Path) -> Result<()> {
    if send_or_explain(data_dir, IpcRequest::ResetTimer)
        .await?
        .is_some()
    {
        println!("Usage timer reset");
    }
    Ok(())
}

pub async fn start_break(data_dir: &Path) -> Result<()> {
    if send_or_explain(data_dir, IpcRequest::StartBreak)
        .await?
        .is_some()
    {
        println!("Enjoy your break. The usage timer starts over afterwards.");
    }
    Ok(())
}

pub async fn snooze_break(data_dir: &Path) -> Result<()> {
    if send_or_explain(data_dir, IpcRequest::SnoozeBreak)
        .await?
        .is_some()
    {
        println!("Break reminder snoozed for 5 minutes");
    }
    Ok(())
}

/// Relay an OS sleep/lock hook to the daemon. Silent when it is not running
/// so hook scripts stay quiet.
pub async fn interrupt(data_dir: &Path, kind: Interruption) -> Result<()> {
    if send_request(data_dir, IpcRequest::Interrupt { kind })
        .await?
        .is_none()
    {
        log::debug!("Ignoring {kind}: daemon is not running");
    }
    Ok(())
}
