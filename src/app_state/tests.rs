use std::time::Duration;

use tokio::time::{Instant, sleep_until};

use super::{AppState, TimerEntry, TimerKind};
use crate::config::AppConfig;
use crate::error::CommandError;

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn quiet_state() -> AppState {
    AppState::with_config(AppConfig {
        announce_fires: false,
        ..AppConfig::default()
    })
}

#[tokio::test(start_paused = true)]
async fn test_ids_are_sequential_across_kinds() {
    let mut state = quiet_state();

    assert_eq!(state.start_timeout(Some(ms(100)), None), 1);
    assert_eq!(state.start_interval(Some(ms(100)), |p| p, None), 2);
    assert_eq!(state.start_timeout(None, Some("tea".into())), 3);

    let kinds: Vec<_> = state.summaries().iter().map(|row| row.kind).collect();
    assert_eq!(
        kinds,
        vec![TimerKind::Timeout, TimerKind::Interval, TimerKind::Timeout]
    );
}

#[tokio::test(start_paused = true)]
async fn test_timeout_uses_configured_default_delay() {
    let mut state = AppState::with_config(AppConfig {
        timeout_delay: ms(2500),
        announce_fires: false,
        ..AppConfig::default()
    });

    let id = state.start_timeout(None, None);
    match state.get(id) {
        Ok(TimerEntry::Timeout(timeout)) => assert_eq!(timeout.delay(), ms(2500)),
        _ => panic!("expected a timeout"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_interval_overrides_apply_on_top_of_config() {
    let mut state = quiet_state();

    let id = state.start_interval(
        Some(ms(300)),
        |params| params.with_max_executions(2).with_reset_delay_on_pause(true),
        None,
    );
    match state.get(id) {
        Ok(TimerEntry::Interval(interval)) => {
            assert_eq!(interval.delay(), ms(300));
            assert_eq!(interval.max_executions(), Some(2));
            assert!(interval.reset_delay_on_pause());
        }
        _ => panic!("expected an interval"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_unknown_id_is_reported() {
    let state = quiet_state();

    assert!(matches!(
        state.pause(42),
        Err(CommandError::UnknownTimer { id: 42 })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_only_commands_reject_intervals() {
    let mut state = quiet_state();
    let id = state.start_interval(Some(ms(100)), |p| p, None);

    let err = state.stop(id).unwrap_err();
    assert!(matches!(
        err,
        CommandError::WrongKind {
            command: "stop",
            actual: TimerKind::Interval,
            expected: TimerKind::Timeout,
            ..
        }
    ));
    assert_eq!(
        err.to_string(),
        "timer 1 is an interval, `stop` needs a timeout"
    );
    assert!(state.rerun(id, None).is_err());
}

#[tokio::test(start_paused = true)]
async fn test_delay_rejects_timeouts() {
    let mut state = quiet_state();
    let id = state.start_timeout(Some(ms(100)), None);

    assert!(matches!(
        state.set_delay(id, ms(50)),
        Err(CommandError::WrongKind {
            expected: TimerKind::Interval,
            ..
        })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_pause_and_resume_reach_both_kinds() {
    let start = Instant::now();
    let mut state = quiet_state();
    let timeout = state.start_timeout(Some(ms(1000)), None);
    let interval = state.start_interval(Some(ms(1000)), |p| p, None);

    sleep_until(start + ms(400)).await;
    state.pause(timeout).unwrap();
    state.pause(interval).unwrap();

    let statuses: Vec<_> = state.summaries().iter().map(|row| row.status).collect();
    assert_eq!(statuses, vec!["paused", "paused"]);

    state.resume(timeout).unwrap();
    state.resume(interval).unwrap();
    sleep_until(start + ms(1100)).await;

    let rows = state.summaries();
    assert_eq!(rows[0].status, "finished");
    assert_eq!(rows[1].executions, Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_prune_forgets_finished_and_stopped_timers() {
    let start = Instant::now();
    let mut state = quiet_state();
    state.start_timeout(Some(ms(100)), None);
    state.start_interval(Some(ms(100)), |p| p.with_max_executions(1), None);
    let running = state.start_interval(Some(ms(100)), |p| p, None);

    sleep_until(start + ms(500)).await;
    assert_eq!(state.summaries()[1].status, "stopped (max executions)");

    assert_eq!(state.prune(), 2);
    let ids: Vec<_> = state.summaries().iter().map(|row| row.id).collect();
    assert_eq!(ids, vec![running]);
}

#[tokio::test(start_paused = true)]
async fn test_summary_line_shows_label_and_runs() {
    let start = Instant::now();
    let mut state = quiet_state();
    state.start_interval(Some(ms(200)), |p| p, Some("stretch".into()));

    sleep_until(start + ms(450)).await;
    let line = state.summaries()[0].to_string();
    assert!(line.starts_with("#1"));
    assert!(line.contains("running"));
    assert!(line.contains("runs=2"));
    assert!(line.contains("due in 150ms"));
    assert!(line.ends_with("stretch"));
}
