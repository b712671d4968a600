mod commands;

use anyhow::Result;
use breaktime_core::{config::get_data_dir, Interruption};
use clap::{Parser, Subcommand};

use commands::{
    control,
    daemon::{run_daemon_process, run_foreground, show_status, start_daemon, stop_daemon},
    threshold,
};

#[derive(Parser)]
#[command(name = "breaktime")]
#[command(about = "Screen-time tracker that reminds you to take breaks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the tracking daemon in the background
    Start {
        /// Log break reminders instead of showing desktop notifications
        #[arg(long)]
        no_notify: bool,
    },
    /// (Internal) Run the daemon process
    #[command(hide = true)]
    DaemonInternalStart {
        #[arg(long)]
        no_notify: bool,
    },
    /// Run the tracker in the foreground until Ctrl-C
    Run {
        /// Log break reminders instead of showing desktop notifications
        #[arg(long)]
        no_notify: bool,
    },
    /// Stop the tracking daemon
    Stop,
    /// Show current usage and break status
    Status,
    /// Pause or resume usage monitoring
    Toggle,
    /// Reset the usage timer to zero
    Reset,
    /// Start a break now (resets the usage timer)
    Break,
    /// Snooze the pending break reminder by 5 minutes
    Snooze,
    /// Show or set the break threshold in minutes (15-120)
    Threshold {
        /// New threshold in minutes
        minutes: Option<u32>,
    },
    /// Report a system sleep/wake/lock/unlock event (for OS hook scripts)
    Interrupt {
        /// One of: suspend, resume, lock, unlock
        kind: Interruption,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if !matches!(cli.command, Commands::DaemonInternalStart { .. }) {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp_secs()
            .init();
    }

    let data_dir = get_data_dir()?;

    match cli.command {
        Commands::Start { no_notify } => start_daemon(&data_dir, !no_notify),
        Commands::DaemonInternalStart { no_notify } => run_daemon_process(!no_notify).await,
        Commands::Run { no_notify } => run_foreground(!no_notify).await,
        Commands::Stop => stop_daemon(&data_dir).await,
        Commands::Status => show_status(&data_dir).await,
        Commands::Toggle => control::toggle_monitoring(&data_dir).await,
        Commands::Reset => control::reset_timer(&data_dir).await,
        Commands::Break => control::start_break(&data_dir).await,
        Commands::Snooze => control::snooze_break(&data_dir).await,
        Commands::Threshold { minutes } => match minutes {
            Some(minutes) => threshold::set_threshold(&data_dir, minutes).await,
            None => threshold::show_threshold(&data_dir).await,
        },
        Commands::Interrupt { kind } => control::interrupt(&data_dir, kind).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_interrupt_kind() {
        let cli = Cli::try_parse_from(["breaktime", "interrupt", "sleep"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Interrupt {
                kind: Interruption::Suspend
            }
        ));
        assert!(Cli::try_parse_from(["breaktime", "interrupt", "reboot"]).is_err());
    }

    #[test]
    fn test_parse_threshold() {
        let cli = Cli::try_parse_from(["breaktime", "threshold", "45"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Threshold { minutes: Some(45) }
        ));
        let cli = Cli::try_parse_from(["breaktime", "threshold"]).unwrap();
        assert!(matches!(cli.command, Commands::Threshold { minutes: None }));
    }

    #[test]
    fn test_parse_start_flags() {
        let cli = Cli::try_parse_from(["breaktime", "start", "--no-notify"]).unwrap();
        assert!(matches!(cli.command, Commands::Start { no_notify: true }));
    }
}
