//! Error types for REPL commands

use thiserror::Error;

use crate::app_state::TimerKind;

/// Errors while running a single REPL command
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("no timer with id {id}")]
    UnknownTimer { id: u32 },

    #[error("timer {id} is {actual}, `{command}` needs {expected}")]
    WrongKind {
        id: u32,
        command: &'static str,
        actual: TimerKind,
        expected: TimerKind,
    },

    #[error("invalid quoting")]
    Quoting,

    #[error("{0}")]
    Usage(#[from] clap::Error),

    #[error("failed to write output")]
    Output(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration")]
    Load(#[source] confy::ConfyError),

    #[error("failed to locate configuration file")]
    Locate(#[source] confy::ConfyError),
}
