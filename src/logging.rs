//! Logging configuration with file-based output and size-based rotation.
//!
//! The REPL owns stdout, so logs go to `~/.config/lapse/lapse.log` (or the
//! platform equivalent) with 10 MB size-based rotation. Set `DEBUG_LOGGING=1`
//! to enable debug output for lapse crates.

use rolling_file::{BasicRollingFileAppender, RollingConditionBasic};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Initialize file logging.
///
/// Returns a `WorkerGuard` that MUST be held for the application lifetime
/// to ensure all buffered logs are flushed on shutdown.
///
/// # Fallback
/// If the log file cannot be created, returns `None` and logs to stderr.
pub fn init() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let debug_logging = std::env::var("DEBUG_LOGGING").is_ok();

    let log_dir = match dirs::config_dir() {
        Some(config) => config.join("lapse"),
        None => {
            init_stderr_only(debug_logging);
            return None;
        }
    };

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        // Can't use tracing yet since subscriber not initialized
        eprintln!(
            "Failed to create log directory {:?}: {}, using stderr only",
            log_dir, e
        );
        init_stderr_only(debug_logging);
        return None;
    }

    let log_path = log_dir.join("lapse.log");
    let file_appender = match BasicRollingFileAppender::new(
        &log_path,
        RollingConditionBasic::new().max_size(10 * 1024 * 1024), // 10 MB
        1, // Keep only the latest rotated file (lapse.log and lapse.log.1)
    ) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("Failed to create log file at {:?}: {}", log_path, e);
            init_stderr_only(debug_logging);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(filter(debug_logging))
        .init();

    tracing::info!(
        log_file = ?log_path,
        debug_logging,
        "lapse logging initialized"
    );

    Some(guard)
}

/// Fallback: log to stderr so the prompt on stdout stays readable.
fn init_stderr_only(debug_logging: bool) {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(filter(debug_logging))
        .init();

    tracing::info!(debug_logging, "lapse logging initialized (stderr only)");
}

fn filter(debug_logging: bool) -> EnvFilter {
    if debug_logging {
        // DEBUG_LOGGING=1: debug for lapse crates, info for dependencies
        EnvFilter::new("info,lapse=debug,lapse_core=debug")
    } else {
        EnvFilter::new("info")
    }
}
