pub mod app_state;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod repl;
