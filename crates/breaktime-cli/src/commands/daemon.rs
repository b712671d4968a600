//! Daemon lifecycle management commands

use anyhow::Result;
use breaktime_core::{
    config::get_data_dir,
    ipc::{IpcClient, IpcRequest, IpcResponse},
    notifier::{format_duration, DesktopNotifier, LogNotifier, Notifier},
    Daemon,
};
use std::{env, fs, io, path::Path, process::Command, thread::sleep, time};
use sysinfo::{Pid, System};
use tabled::{settings::Style, Table, Tabled};

const PID_FILE: &str = "breaktime.pid";
pub const SOCK_FILE: &str = "breaktime.sock";

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

pub fn start_daemon(data_dir: &Path, notify: bool) -> Result<()> {
    let pid_file_path = data_dir.join(PID_FILE);
    let sock_path = data_dir.join(SOCK_FILE);

    // 1. Check if daemon is already running
    if pid_file_path.exists() {
        if let Ok(pid_str) = fs::read_to_string(&pid_file_path) {
            if let Ok(pid) = pid_str.trim().parse::<usize>() {
                let mut sys = System::new();
                if sys.refresh_process(Pid::from(pid)) {
                    log::info!("Daemon is already running (PID: {pid}).");
                    return Ok(());
                }
            }
        }
        log::warn!("Removing stale PID file.");
        let _ = fs::remove_file(&pid_file_path);
    }

    // 2. Clean up old socket if it exists
    if sock_path.exists() {
        log::warn!("Removing stale socket file.");
        fs::remove_file(&sock_path)?;
    }

    fs::create_dir_all(data_dir)?;
    log::info!("Starting breaktime daemon...");

    // 3. Spawn a new process for the daemon
    let current_exe = env::current_exe()?;
    let mut command = Command::new(current_exe);
    command.arg("daemon-internal-start");
    if !notify {
        command.arg("--no-notify");
    }
    let child = command.current_dir(env::current_dir()?).spawn()?;

    // 4. In parent process, write PID and exit
    log::info!("Daemon process started with PID: {}", child.id());
    fs::write(&pid_file_path, child.id().to_string())?;

    Ok(())
}

pub async fn run_daemon_process(notify: bool) -> Result<()> {
    // Detached process: nothing else has set up logging yet
    if let Err(e) = setup_daemon_logging() {
        panic!("Failed to set up daemon logging: {e}");
    }
    log::info!("Daemon process started internally.");

    if let Err(e) = daemon_main_logic(notify).await {
        log::error!("Daemon main logic exited with a fatal error: {e:#}");
        return Err(e);
    }

    Ok(())
}

/// Run the daemon attached to the terminal until Ctrl-C
pub async fn run_foreground(notify: bool) -> Result<()> {
    let result = daemon_main_logic(notify).await;
    let sock_path = get_data_dir()?.join(SOCK_FILE);
    if sock_path.exists() {
        fs::remove_file(&sock_path)?;
    }
    result
}

async fn daemon_main_logic(notify: bool) -> Result<()> {
    let data_dir = get_data_dir()?;
    fs::create_dir_all(&data_dir)?;

    let notifier: Box<dyn Notifier> = if notify {
        Box::new(DesktopNotifier)
    } else {
        Box::new(LogNotifier)
    };
    let mut daemon = Daemon::with_platform_probe(&data_dir, notifier)?;
    daemon.run_with_signals(&data_dir.join(SOCK_FILE)).await
}

pub async fn stop_daemon(data_dir: &Path) -> Result<()> {
    let pid_file_path = data_dir.join(PID_FILE);
    let sock_path = data_dir.join(SOCK_FILE);

    if !pid_file_path.exists() {
        log::info!("Daemon is not running (no PID file).");
        if sock_path.exists() {
            fs::remove_file(&sock_path)?;
        }
        return Ok(());
    }

    let pid_str = fs::read_to_string(&pid_file_path)?;
    let pid = pid_str
        .trim()
        .parse::<usize>()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    log::info!("Stopping breaktime daemon (PID: {pid})...");
    let client = IpcClient::new(&sock_path);

    match client.send_command(IpcRequest::Shutdown).await {
        Ok(IpcResponse::Shutdown) => {
            log::info!("Daemon shutdown signal sent. Waiting for process to exit...");
            sleep(time::Duration::from_secs(2));

            let mut sys = System::new();
            if sys.refresh_process(Pid::from(pid)) {
                log::warn!("Daemon did not stop gracefully. Force killing...");
                if let Some(process) = sys.process(Pid::from(pid)) {
                    process.kill();
                }
            } else {
                log::info!("Daemon stopped successfully.");
            }
        }
        Ok(resp) => log::error!("Received unexpected response from daemon: {resp:?}"),
        Err(e) => {
            log::error!("Failed to send shutdown command: {e}. Forcing cleanup.");
            let mut sys = System::new();
            if sys.refresh_process(Pid::from(pid)) {
                if let Some(process) = sys.process(Pid::from(pid)) {
                    process.kill();
                    log::info!("Process killed.");
                }
            }
        }
    }

    // Cleanup
    fs::remove_file(&pid_file_path)?;
    if sock_path.exists() {
        fs::remove_file(&sock_path)?;
    }

    Ok(())
}

pub async fn show_status(data_dir: &Path) -> Result<()> {
    let sock_path = data_dir.join(SOCK_FILE);

    if !sock_path.exists() {
        println!("Daemon Status: Not running");
        return Ok(());
    }

    let client = IpcClient::new(&sock_path);
    match client.send_command(IpcRequest::Status).await {
        Ok(IpcResponse::Status {
            state,
            usage_seconds,
            break_threshold_seconds,
            is_monitoring,
            is_break_active,
            uptime_seconds,
        }) => {
            println!("Daemon Status: Running\n");
            let remaining = break_threshold_seconds.saturating_sub(usage_seconds);
            let rows = vec![
                StatusRow {
                    field: "State",
                    value: format!("{state:?}"),
                },
                StatusRow {
                    field: "Usage",
                    value: format_duration(usage_seconds),
                },
                StatusRow {
                    field: "Break threshold",
                    value: format_duration(break_threshold_seconds),
                },
                StatusRow {
                    field: "Until break",
                    value: if is_break_active {
                        String::from("break due now")
                    } else {
                        format_duration(remaining)
                    },
                },
                StatusRow {
                    field: "Monitoring",
                    value: String::from(if is_monitoring { "on" } else { "paused" }),
                },
                StatusRow {
                    field: "Daemon uptime",
                    value: format_duration(uptime_seconds),
                },
            ];
            println!("{}", Table::new(rows).with(Style::rounded()));
        }
        Ok(_) => anyhow::bail!("Unexpected response from daemon"),
        Err(e) => {
            log::error!("Failed to get status: {e}");
            println!("Daemon Status: Not running (or not responding)");
        }
    }
    Ok(())
}

fn setup_daemon_logging() -> Result<()> {
    use std::fs::{create_dir_all, OpenOptions};

    let log_path = get_data_dir()?.join("breaktime.log");

    if let Some(parent) = log_path.parent() {
        create_dir_all(parent)?;
    }

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter_level(log::LevelFilter::Debug)
        .init();

    Ok(())
}
