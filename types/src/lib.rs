//! Shared configuration types for lapse
//!
//! This crate contains serializable configuration types that are shared between
//! the timer library (lapse-core) and the interactive binary. Durations are
//! written as whole milliseconds.

use serde::{Deserialize, Serialize};
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Interval Parameters
// ─────────────────────────────────────────────────────────────────────────────

/// Parameters of a recurring timer.
///
/// Deserializes either from a bare number (the delay in milliseconds) or
/// from a table:
///
/// ```toml
/// interval = 250
/// # or
/// interval = { delay = 1000, max_executions = 3, reset_delay_on_pause = true }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawIntervalParams")]
pub struct IntervalParams {
    /// The delay between each callback execution.
    #[serde(with = "millis")]
    pub delay: Duration,

    /// Executions after which the interval stops for good. Zero is the
    /// same as no ceiling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_executions: Option<u64>,

    /// Total time the interval may run before it stops for good.
    #[serde(with = "millis::option", skip_serializing_if = "Option::is_none")]
    pub max_time: Option<Duration>,

    /// Whether paused time counts against `max_time`.
    pub max_time_includes_pauses: bool,

    /// Whether pausing discards the progress made toward the next execution.
    ///
    /// Given a 1000ms interval paused 300ms after its last execution:
    /// - `false`: the next execution happens 700ms after resuming
    /// - `true`: the next execution happens as soon as it is resumed, and
    ///   full periods follow from there
    pub reset_delay_on_pause: bool,
}

impl IntervalParams {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            max_executions: None,
            max_time: None,
            max_time_includes_pauses: false,
            reset_delay_on_pause: false,
        }
    }

    pub fn with_max_executions(mut self, max_executions: u64) -> Self {
        self.max_executions = Some(max_executions);
        self
    }

    pub fn with_max_time(mut self, max_time: Duration) -> Self {
        self.max_time = Some(max_time);
        self
    }

    pub fn with_max_time_includes_pauses(mut self, includes_pauses: bool) -> Self {
        self.max_time_includes_pauses = includes_pauses;
        self
    }

    pub fn with_reset_delay_on_pause(mut self, reset: bool) -> Self {
        self.reset_delay_on_pause = reset;
        self
    }

    /// The execution ceiling, with zero folded into "no ceiling".
    pub fn execution_ceiling(&self) -> Option<u64> {
        self.max_executions.filter(|&max| max > 0)
    }
}

impl From<Duration> for IntervalParams {
    fn from(delay: Duration) -> Self {
        Self::new(delay)
    }
}

/// A bare number is read as a delay in milliseconds.
impl From<u64> for IntervalParams {
    fn from(delay_ms: u64) -> Self {
        Self::new(Duration::from_millis(delay_ms))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawIntervalParams {
    Delay(u64),
    Table(IntervalTable),
}

#[derive(Deserialize)]
struct IntervalTable {
    #[serde(with = "millis")]
    delay: Duration,
    #[serde(default)]
    max_executions: Option<u64>,
    #[serde(default, with = "millis::option")]
    max_time: Option<Duration>,
    #[serde(default)]
    max_time_includes_pauses: bool,
    #[serde(default)]
    reset_delay_on_pause: bool,
}

impl From<RawIntervalParams> for IntervalParams {
    fn from(raw: RawIntervalParams) -> Self {
        match raw {
            RawIntervalParams::Delay(ms) => Self::from(ms),
            RawIntervalParams::Table(table) => Self {
                delay: table.delay,
                max_executions: table.max_executions,
                max_time: table.max_time,
                max_time_includes_pauses: table.max_time_includes_pauses,
                reset_delay_on_pause: table.reset_delay_on_pause,
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Application Config
// ─────────────────────────────────────────────────────────────────────────────

/// Settings of the interactive binary, persisted with confy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Delay used by `timeout` when none is given
    #[serde(default = "default_timeout_delay", with = "millis")]
    pub timeout_delay: Duration,

    /// Print a line every time a timer fires
    #[serde(default = "default_true")]
    pub announce_fires: bool,

    /// Parameters used by `interval` when no delay is given
    #[serde(default = "default_interval")]
    pub interval: IntervalParams,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timeout_delay: default_timeout_delay(),
            announce_fires: true,
            interval: default_interval(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Serde Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}
fn default_timeout_delay() -> Duration {
    Duration::from_secs(1)
}
fn default_interval() -> IntervalParams {
    IntervalParams::new(Duration::from_secs(1))
}

/// `Duration` as whole milliseconds.
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    fn as_millis(duration: &Duration) -> u64 {
        u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
    }

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(as_millis(duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            duration: &Option<Duration>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match duration {
                Some(duration) => serializer.serialize_some(&as_millis(duration)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error> {
            Option::<u64>::deserialize(deserializer).map(|ms| ms.map(Duration::from_millis))
        }
    }
}
