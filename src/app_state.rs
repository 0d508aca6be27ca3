use std::fmt;
use std::time::Duration;

use hashbrown::HashMap;
use lapse_core::{Interval, IntervalParams, StopReason, Timeout};
use time::OffsetDateTime;
use tokio::time::Instant;

use crate::config::{self, AppConfig};
use crate::error::CommandError;

/// Which kind of timer an id refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Timeout,
    Interval,
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerKind::Timeout => write!(f, "a timeout"),
            TimerKind::Interval => write!(f, "an interval"),
        }
    }
}

/// Arguments bound to every REPL timer callback
#[derive(Debug, Clone)]
pub struct FireNotice {
    pub id: u32,
    pub label: Option<String>,
    pub announce: bool,
}

pub enum TimerEntry {
    Timeout(Timeout<FireNotice>),
    Interval(Interval<FireNotice>),
}

impl TimerEntry {
    pub fn kind(&self) -> TimerKind {
        match self {
            TimerEntry::Timeout(_) => TimerKind::Timeout,
            TimerEntry::Interval(_) => TimerKind::Interval,
        }
    }
}

/// One row of `list` output
#[derive(Debug, Clone, PartialEq)]
pub struct TimerSummary {
    pub id: u32,
    pub kind: TimerKind,
    pub label: Option<String>,
    pub status: &'static str,
    pub delay: Duration,
    pub executions: Option<u64>,
    pub due_in: Option<Duration>,
}

impl fmt::Display for TimerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            TimerKind::Timeout => "timeout",
            TimerKind::Interval => "interval",
        };
        write!(
            f,
            "#{:<3} {:<8} {:<24} {:>7}ms",
            self.id,
            kind,
            self.status,
            self.delay.as_millis()
        )?;
        if let Some(executions) = self.executions {
            write!(f, "  runs={executions}")?;
        }
        if let Some(due_in) = self.due_in {
            write!(f, "  due in {}ms", due_in.as_millis())?;
        }
        if let Some(label) = &self.label {
            write!(f, "  {label}")?;
        }
        Ok(())
    }
}

pub struct AppState {
    pub config: AppConfig,
    timers: HashMap<u32, TimerEntry>,
    next_id: u32,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_config(AppConfig::default())
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::with_config(config::load_or_default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self {
            config,
            timers: HashMap::new(),
            next_id: 1,
        }
    }

    fn notice(&mut self, label: Option<String>) -> FireNotice {
        let id = self.next_id;
        self.next_id += 1;
        FireNotice {
            id,
            label,
            announce: self.config.announce_fires,
        }
    }

    /// Start a timeout; `delay` falls back to the configured default.
    pub fn start_timeout(&mut self, delay: Option<Duration>, label: Option<String>) -> u32 {
        let delay = delay.unwrap_or(self.config.timeout_delay);
        let notice = self.notice(label);
        let id = notice.id;
        let timeout = Timeout::new(announce_fire, delay, notice);
        self.timers.insert(id, TimerEntry::Timeout(timeout));
        tracing::info!(id, delay_ms = delay.as_millis(), "Timeout started");
        id
    }

    /// Start an interval; `delay` replaces the configured default period.
    pub fn start_interval(
        &mut self,
        delay: Option<Duration>,
        configure: impl FnOnce(IntervalParams) -> IntervalParams,
        label: Option<String>,
    ) -> u32 {
        let mut params = self.config.interval;
        if let Some(delay) = delay {
            params.delay = delay;
        }
        let params = configure(params);
        let notice = self.notice(label);
        let id = notice.id;
        let interval = Interval::new(announce_fire, params, notice);
        self.timers.insert(id, TimerEntry::Interval(interval));
        tracing::info!(id, period_ms = params.delay.as_millis(), "Interval started");
        id
    }

    pub fn get(&self, id: u32) -> Result<&TimerEntry, CommandError> {
        self.timers.get(&id).ok_or(CommandError::UnknownTimer { id })
    }

    pub fn pause(&self, id: u32) -> Result<(), CommandError> {
        match self.get(id)? {
            TimerEntry::Timeout(timeout) => timeout.pause(),
            TimerEntry::Interval(interval) => interval.pause(),
        }
        Ok(())
    }

    pub fn resume(&self, id: u32) -> Result<(), CommandError> {
        match self.get(id)? {
            TimerEntry::Timeout(timeout) => timeout.resume(),
            TimerEntry::Interval(interval) => interval.resume(),
        }
        Ok(())
    }

    pub fn stop(&self, id: u32) -> Result<(), CommandError> {
        self.timeout(id, "stop")?.stop();
        Ok(())
    }

    pub fn rerun(&self, id: u32, delay: Option<Duration>) -> Result<(), CommandError> {
        self.timeout(id, "rerun")?.rerun(delay);
        Ok(())
    }

    pub fn set_delay(&self, id: u32, period: Duration) -> Result<(), CommandError> {
        self.interval(id, "delay")?.set_delay(period);
        Ok(())
    }

    /// Forget finished timeouts and stopped intervals
    pub fn prune(&mut self) -> usize {
        let before = self.timers.len();
        self.timers.retain(|_, entry| match entry {
            TimerEntry::Timeout(timeout) => !timeout.is_finished(),
            TimerEntry::Interval(interval) => !interval.is_stopped(),
        });
        before - self.timers.len()
    }

    /// Summaries of every timer, ordered by id
    pub fn summaries(&self) -> Vec<TimerSummary> {
        let now = Instant::now();
        let mut rows: Vec<TimerSummary> = self
            .timers
            .iter()
            .map(|(&id, entry)| summarize(id, entry, now))
            .collect();
        rows.sort_by_key(|row| row.id);
        rows
    }

    fn timeout(&self, id: u32, command: &'static str) -> Result<&Timeout<FireNotice>, CommandError> {
        match self.get(id)? {
            TimerEntry::Timeout(timeout) => Ok(timeout),
            entry => Err(CommandError::WrongKind {
                id,
                command,
                actual: entry.kind(),
                expected: TimerKind::Timeout,
            }),
        }
    }

    fn interval(
        &self,
        id: u32,
        command: &'static str,
    ) -> Result<&Interval<FireNotice>, CommandError> {
        match self.get(id)? {
            TimerEntry::Interval(interval) => Ok(interval),
            entry => Err(CommandError::WrongKind {
                id,
                command,
                actual: entry.kind(),
                expected: TimerKind::Interval,
            }),
        }
    }
}

fn summarize(id: u32, entry: &TimerEntry, now: Instant) -> TimerSummary {
    match entry {
        TimerEntry::Timeout(timeout) => {
            let status = if timeout.is_finished() {
                "finished"
            } else if timeout.is_paused() {
                "paused"
            } else {
                "scheduled"
            };
            TimerSummary {
                id,
                kind: TimerKind::Timeout,
                label: timeout.args().label.clone(),
                status,
                delay: timeout.delay(),
                executions: None,
                due_in: (!timeout.is_finished()).then(|| timeout.remaining()),
            }
        }
        TimerEntry::Interval(interval) => {
            let status = match interval.stop_reason() {
                Some(StopReason::MaxExecutions) => "stopped (max executions)",
                Some(StopReason::MaxTime) => "stopped (max time)",
                None if interval.is_paused() => "paused",
                None => "running",
            };
            TimerSummary {
                id,
                kind: TimerKind::Interval,
                label: interval.args().label.clone(),
                status,
                delay: interval.delay(),
                executions: Some(interval.executions()),
                due_in: interval
                    .will_execute_at()
                    .map(|at| at.saturating_duration_since(now)),
            }
        }
    }
}

/// Callback shared by every REPL timer
async fn announce_fire(notice: FireNotice) {
    tracing::info!(id = notice.id, label = ?notice.label, "Timer fired");
    if !notice.announce {
        return;
    }

    let stamp = clock_stamp().unwrap_or_default();
    match &notice.label {
        Some(label) => println!("\n[{stamp}] #{} {label} fired", notice.id),
        None => println!("\n[{stamp}] #{} fired", notice.id),
    }
}

/// Local wall-clock time, UTC when the local offset can't be determined
fn clock_stamp() -> Option<String> {
    let format =
        time::format_description::parse("[hour]:[minute]:[second].[subsecond digits:3]").ok()?;
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .format(&format)
        .ok()
}

#[cfg(test)]
mod tests;
