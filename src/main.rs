use clap::{Parser, Subcommand};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use lapse::app_state::AppState;
use lapse::commands::{self, IntervalOptions};
use lapse::error::CommandError;
use lapse::logging;
use lapse::repl::readline;
use tokio::sync::RwLock;

#[tokio::main]
async fn main() -> Result<(), String> {
    let _log_guard = logging::init();
    let state = Arc::new(RwLock::new(AppState::new()));

    loop {
        let line = readline()?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match respond(line, Arc::clone(&state)).await {
            Ok(quit) => {
                if quit {
                    break;
                }
            }
            Err(err) => report(&err, &mut std::io::stdout()).map_err(|e| e.to_string())?,
        }
    }

    Ok(())
}

/// Print a failed command. clap renders its own output, which is plain text
/// for `--help` and `--version` and carries its own `error:` prefix otherwise.
fn report(err: &CommandError, out: &mut impl Write) -> std::io::Result<()> {
    match err {
        CommandError::Usage(err) => write!(out, "{}", err.render())?,
        err => writeln!(out, "error: {err}")?,
    }
    out.flush()
}

#[derive(Parser)]
#[command(version, about = "pausable timers")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run once after MS milliseconds (configured default if omitted)
    Timeout {
        ms: Option<u64>,
        #[arg(short, long)]
        label: Option<String>,
    },
    /// Run every MS milliseconds (configured default if omitted)
    Interval {
        ms: Option<u64>,
        #[arg(short = 'n', long)]
        max_executions: Option<u64>,
        /// Stop after this many milliseconds of running time
        #[arg(short = 't', long)]
        max_time: Option<u64>,
        /// Count paused time toward --max-time
        #[arg(long)]
        include_pauses: bool,
        /// Run immediately on resume instead of finishing the paused period
        #[arg(short, long)]
        reset_on_pause: bool,
        #[arg(short, long)]
        label: Option<String>,
    },
    Pause {
        id: u32,
    },
    Resume {
        id: u32,
    },
    /// Cancel a timeout; `rerun` schedules it again
    Stop {
        id: u32,
    },
    /// Schedule a finished timeout again
    Rerun {
        id: u32,
        ms: Option<u64>,
    },
    /// Change an interval's period
    Delay {
        id: u32,
        ms: u64,
    },
    List {
        /// Forget finished and stopped timers first
        #[arg(short, long)]
        prune: bool,
    },
    Sleep {
        ms: u64,
    },
    Config,
    Exit,
}

async fn respond(line: &str, state: Arc<RwLock<AppState>>) -> Result<bool, CommandError> {
    let mut args = shlex::split(line).ok_or(CommandError::Quoting)?;
    args.insert(0, "lapse".to_string());
    let cli = Cli::try_parse_from(args)?;

    match cli.command {
        Some(Commands::Timeout { ms, label }) => {
            commands::start_timeout(ms.map(Duration::from_millis), label, state).await;
        }
        Some(Commands::Interval {
            ms,
            max_executions,
            max_time,
            include_pauses,
            reset_on_pause,
            label,
        }) => {
            let options = IntervalOptions {
                max_executions,
                max_time: max_time.map(Duration::from_millis),
                include_pauses,
                reset_on_pause,
            };
            commands::start_interval(ms.map(Duration::from_millis), options, label, state).await;
        }
        Some(Commands::Pause { id }) => commands::pause(id, state).await?,
        Some(Commands::Resume { id }) => commands::resume(id, state).await?,
        Some(Commands::Stop { id }) => commands::stop(id, state).await?,
        Some(Commands::Rerun { id, ms }) => {
            commands::rerun(id, ms.map(Duration::from_millis), state).await?;
        }
        Some(Commands::Delay { id, ms }) => {
            commands::set_delay(id, Duration::from_millis(ms), state).await?;
        }
        Some(Commands::List { prune }) => commands::list(prune, state).await,
        Some(Commands::Sleep { ms }) => commands::sleep(Duration::from_millis(ms)).await,
        Some(Commands::Config) => commands::show_config(state).await?,
        Some(Commands::Exit) => {
            writeln!(std::io::stdout(), "quitting...")?;
            std::io::stdout().flush()?;
            return Ok(true);
        }
        None => {}
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(line: &[&str]) -> String {
        let err = match Cli::try_parse_from(line.iter().copied()) {
            Err(err) => CommandError::Usage(err),
            Ok(_) => panic!("expected clap to stop parsing"),
        };
        let mut out = Vec::new();
        report(&err, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_help_is_printed_without_error_prefix() {
        let text = rendered(&["lapse", "--help"]);
        assert!(!text.starts_with("error"));
        assert!(text.contains("Usage:"));
    }

    #[test]
    fn test_version_is_printed_without_error_prefix() {
        let text = rendered(&["lapse", "--version"]);
        assert!(text.starts_with("lapse "));
    }

    #[test]
    fn test_parse_failure_keeps_a_single_error_prefix() {
        let text = rendered(&["lapse", "bogus"]);
        assert!(text.starts_with("error:"));
        assert!(!text.contains("error: error:"));
    }

    #[test]
    fn test_command_errors_get_an_error_prefix() {
        let mut out = Vec::new();
        report(&CommandError::UnknownTimer { id: 9 }, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "error: no timer with id 9\n");
    }
}
