use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{UnixListener, UnixStream},
    sync::{mpsc, oneshot},
};

use crate::scheduler::{Interruption, SchedulerState};

/// IPC request from CLI to daemon
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum IpcRequest {
    Status,
    ToggleMonitoring,
    ResetTimer,
    StartBreak,
    SnoozeBreak,
    SetThreshold { minutes: u32 },
    Interrupt { kind: Interruption },
    Shutdown,
}

/// IPC response from daemon to CLI
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum IpcResponse {
    Status {
        state: SchedulerState,
        usage_seconds: u64,
        break_threshold_seconds: u64,
        is_monitoring: bool,
        is_break_active: bool,
        uptime_seconds: u64,
    },
    Monitoring {
        is_monitoring: bool,
    },
    Ok,
    Error {
        message: String,
    },
    Shutdown,
}

/// A request waiting to be applied by the daemon loop
#[derive(Debug)]
pub struct DaemonCommand {
    pub request: IpcRequest,
    pub reply: oneshot::Sender<IpcResponse>,
}

pub type CommandSender = mpsc::Sender<DaemonCommand>;
pub type CommandReceiver = mpsc::Receiver<DaemonCommand>;

#[derive(Debug)]
pub struct IpcClient {
    sock_path: PathBuf,
}

impl IpcClient {
    #[must_use]
    pub fn new(sock_path: &Path) -> Self {
        Self {
            sock_path: sock_path.to_path_buf(),
        }
    }

    /// Send a single request and wait for the reply
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon is unreachable or replies with garbage
    pub async fn send_command(&self, request: IpcRequest) -> Result<IpcResponse> {
        let mut stream = UnixStream::connect(&self.sock_path).await?;

        let encoded = bincode::serialize(&request)?;
        stream.write_all(&encoded).await?;
        stream.shutdown().await?;

        let mut buffer = Vec::new();
        stream.read_to_end(&mut buffer).await?;
        let response: IpcResponse = bincode::deserialize(&buffer)?;

        Ok(response)
    }
}

/// Forwards socket requests into the daemon loop so they are applied
/// between ticks
pub struct DaemonIpcHandler {
    commands: CommandSender,
}

impl DaemonIpcHandler {
    #[must_use]
    pub fn new(commands: CommandSender) -> Self {
        Self { commands }
    }

    /// # Errors
    ///
    /// Returns an error if the daemon loop has stopped
    pub async fn dispatch(&self, request: IpcRequest) -> Result<IpcResponse> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(DaemonCommand { request, reply })
            .await
            .map_err(|_| crate::Error::Ipc(String::from("daemon loop is not running")))?;
        Ok(response
            .await
            .map_err(|_| crate::Error::Ipc(String::from("daemon dropped the request")))?)
    }

    pub async fn handle(&self, stream: &mut UnixStream, request: IpcRequest) -> Result<()> {
        let response = match self.dispatch(request).await {
            Ok(response) => response,
            Err(e) => IpcResponse::Error {
                message: e.to_string(),
            },
        };

        let encoded = bincode::serialize(&response)?;
        stream.write_all(&encoded).await?;
        Ok(())
    }
}

pub async fn listen(handler: Arc<DaemonIpcHandler>, sock_path: &Path) -> io::Result<()> {
    if sock_path.exists() {
        fs::remove_file(sock_path)?;
    }
    let listener = UnixListener::bind(sock_path)?;
    log::info!("IPC listening on {}", sock_path.display());

    loop {
        match listener.accept().await {
            Ok((mut stream, _)) => {
                let handler = handler.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0; 1024];
                    match stream.read(&mut buf).await {
                        Ok(n) if n > 0 => match bincode::deserialize::<IpcRequest>(&buf[..n]) {
                            Ok(request) => {
                                log::debug!("IPC request: {request:?}");
                                if let Err(e) = handler.handle(&mut stream, request).await {
                                    log::error!("IPC handle error: {e}");
                                }
                            }
                            Err(e) => {
                                log::error!("IPC deserialize error: {e}");
                            }
                        },
                        Ok(_) => {} // Connection closed
                        Err(e) => {
                            log::error!("IPC read error: {e}");
                        }
                    }
                });
            }
            Err(e) => {
                log::error!("IPC accept error: {e}");
            }
        }
    }
}
