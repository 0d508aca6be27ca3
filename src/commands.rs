use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::app_state::{AppState, TimerEntry};
use crate::config;
use crate::error::CommandError;

/// Options for the `interval` command beyond its period
#[derive(Debug, Clone, Default)]
pub struct IntervalOptions {
    pub max_executions: Option<u64>,
    pub max_time: Option<Duration>,
    pub include_pauses: bool,
    pub reset_on_pause: bool,
}

pub async fn start_timeout(
    delay: Option<Duration>,
    label: Option<String>,
    state: Arc<RwLock<AppState>>,
) {
    let mut s = state.write().await;
    let id = s.start_timeout(delay, label);
    if let Ok(TimerEntry::Timeout(timeout)) = s.get(id) {
        println!("timeout #{id} fires in {}ms", timeout.delay().as_millis());
    }
}

pub async fn start_interval(
    delay: Option<Duration>,
    options: IntervalOptions,
    label: Option<String>,
    state: Arc<RwLock<AppState>>,
) {
    let mut s = state.write().await;
    let id = s.start_interval(
        delay,
        |mut params| {
            if let Some(max_executions) = options.max_executions {
                params.max_executions = Some(max_executions);
            }
            if let Some(max_time) = options.max_time {
                params.max_time = Some(max_time);
            }
            params.max_time_includes_pauses |= options.include_pauses;
            params.reset_delay_on_pause |= options.reset_on_pause;
            params
        },
        label,
    );
    println!("interval #{id} started");
}

pub async fn pause(id: u32, state: Arc<RwLock<AppState>>) -> Result<(), CommandError> {
    state.read().await.pause(id)?;
    println!("paused #{id}");
    Ok(())
}

pub async fn resume(id: u32, state: Arc<RwLock<AppState>>) -> Result<(), CommandError> {
    state.read().await.resume(id)?;
    println!("resumed #{id}");
    Ok(())
}

pub async fn stop(id: u32, state: Arc<RwLock<AppState>>) -> Result<(), CommandError> {
    state.read().await.stop(id)?;
    println!("stopped #{id}");
    Ok(())
}

pub async fn rerun(
    id: u32,
    delay: Option<Duration>,
    state: Arc<RwLock<AppState>>,
) -> Result<(), CommandError> {
    state.read().await.rerun(id, delay)?;
    println!("rerun #{id}");
    Ok(())
}

pub async fn set_delay(
    id: u32,
    period: Duration,
    state: Arc<RwLock<AppState>>,
) -> Result<(), CommandError> {
    state.read().await.set_delay(id, period)?;
    println!("#{id} period is now {}ms", period.as_millis());
    Ok(())
}

pub async fn list(prune: bool, state: Arc<RwLock<AppState>>) {
    if prune {
        let removed = state.write().await.prune();
        if removed > 0 {
            println!("pruned {removed} timer(s)");
        }
    }

    let s = state.read().await;
    let rows = s.summaries();
    if rows.is_empty() {
        println!("no timers");
        return;
    }
    for row in rows {
        println!("{row}");
    }
}

/// Block the prompt without holding the state lock, so timers keep announcing.
pub async fn sleep(duration: Duration) {
    lapse_core::sleep(duration).await;
    println!("slept {}ms", duration.as_millis());
}

pub async fn show_config(state: Arc<RwLock<AppState>>) -> Result<(), CommandError> {
    let path = config::path()?;
    println!("config file: {}", path.display());

    let s = state.read().await;
    println!("{:#?}", s.config);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn quiet_state(timeout_delay: Duration) -> Arc<RwLock<AppState>> {
        Arc::new(RwLock::new(AppState::with_config(AppConfig {
            timeout_delay,
            announce_fires: false,
            ..AppConfig::default()
        })))
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_command_falls_back_to_configured_delay() {
        let state = quiet_state(Duration::from_millis(2500));

        start_timeout(None, None, Arc::clone(&state)).await;
        start_timeout(Some(Duration::from_millis(40)), None, Arc::clone(&state)).await;

        let delays: Vec<_> = state
            .read()
            .await
            .summaries()
            .iter()
            .map(|row| row.delay)
            .collect();
        assert_eq!(
            delays,
            vec![Duration::from_millis(2500), Duration::from_millis(40)]
        );
    }
}
