//! Pausable recurring timer
//!
//! An `Interval` invokes its callback once per period until it is exhausted.
//! Pausing records how much of the period is left since the last execution;
//! resuming waits out the rest of it on a single-use [`Timeout`], fires
//! once, then re-arms the regular cadence.
//!
//! # Stopping
//!
//! An interval stops for good when it reaches `max_executions` or runs out
//! of its `max_time` budget. A stopped interval ignores `pause` and `resume`
//! but stays inspectable.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use lapse_types::IntervalParams;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

use super::Timeout;
use super::callback::{self, Callback};

/// Why an interval stopped for good
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The callback ran `max_executions` times
    MaxExecutions,
    /// The interval used up its `max_time` budget
    MaxTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    Paused,
    Stopped(StopReason),
}

struct IntervalState {
    phase: Phase,
    period: Duration,
    last_execution: Option<Instant>,
    executions: u64,

    /// Deadline of the in-flight wait while running
    next_at: Instant,

    /// Wait owed on resume, `None` when resuming should fire right away
    pending_resume_delay: Option<Duration>,

    /// Bumped on every disarm; cadence and resume waits act only for their own epoch
    epoch: u64,

    // ─── Primitives (at most one of cadence / resume_wait is armed) ─────────
    cadence: Option<JoinHandle<()>>,
    resume_wait: Option<Timeout<u64>>,

    /// Fires when the `max_time` budget runs out
    expiry: Option<Timeout<()>>,
}

struct IntervalInner<A> {
    callback: Callback<A>,
    args: A,
    created_at: Instant,
    max_executions: Option<u64>,
    reset_delay_on_pause: bool,
    max_time: Option<Duration>,
    max_time_includes_pauses: bool,
    state: Mutex<IntervalState>,
}

/// A recurring callback that can be paused, resumed and re-timed.
///
/// Cloning yields another handle to the same interval. Dropping every
/// handle does not stop a running interval; pause it first.
pub struct Interval<A> {
    inner: Arc<IntervalInner<A>>,
}

impl<A> Clone for Interval<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> std::fmt::Debug for Interval<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("Interval")
            .field("period", &state.period)
            .field("phase", &state.phase)
            .field("executions", &state.executions)
            .finish()
    }
}

impl<A> Interval<A>
where
    A: Clone + Send + Sync + 'static,
{
    /// Run `callback(args)` every period.
    ///
    /// `params` is either a full [`IntervalParams`], a [`Duration`], or a
    /// number of milliseconds. The first execution happens one full period
    /// after creation. Must be called from within a Tokio runtime.
    pub fn new<F, Fut>(callback: F, params: impl Into<IntervalParams>, args: A) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let params = params.into();
        let now = Instant::now();
        let inner = Arc::new(IntervalInner {
            callback: callback::boxed(callback),
            args,
            created_at: now,
            max_executions: params.execution_ceiling(),
            reset_delay_on_pause: params.reset_delay_on_pause,
            max_time: params.max_time,
            max_time_includes_pauses: params.max_time_includes_pauses,
            state: Mutex::new(IntervalState {
                phase: Phase::Running,
                period: params.delay,
                last_execution: None,
                executions: 0,
                next_at: now + params.delay,
                pending_resume_delay: None,
                epoch: 0,
                cadence: None,
                resume_wait: None,
                expiry: None,
            }),
        });

        {
            let mut state = inner.lock();
            if let Some(max_time) = params.max_time {
                state.expiry = Some(IntervalInner::expiry_timer(&inner, max_time));
            }
            let epoch = state.epoch;
            state.cadence = Some(IntervalInner::spawn_cadence(&inner, epoch));
        }
        tracing::debug!(period_ms = params.delay.as_millis(), "Interval started");

        Self { inner }
    }

    /// Stop the cadence, remembering what is left of the current period
    /// measured from the last execution (or creation, before the first one).
    /// Nothing is remembered when `reset_delay_on_pause` is set. No-op unless
    /// running.
    pub fn pause(&self) {
        let mut state = self.inner.lock();
        if state.phase != Phase::Running {
            tracing::debug!(phase = ?state.phase, "Ignoring pause");
            return;
        }

        let now = Instant::now();
        disarm(&mut state);
        state.pending_resume_delay = if self.inner.reset_delay_on_pause {
            None
        } else {
            let reference = state.last_execution.unwrap_or(self.inner.created_at);
            Some(
                state
                    .period
                    .saturating_sub(now.saturating_duration_since(reference)),
            )
        };
        if !self.inner.max_time_includes_pauses {
            if let Some(expiry) = &state.expiry {
                expiry.pause();
            }
        }
        state.phase = Phase::Paused;
        tracing::debug!(pending = ?state.pending_resume_delay, "Interval paused");
    }

    /// Wait out the remembered delay (none when it was reset), fire once,
    /// then continue every period. No-op unless paused.
    ///
    /// `is_paused` reports `false` as soon as this returns.
    pub fn resume(&self) {
        let mut state = self.inner.lock();
        if state.phase != Phase::Paused {
            tracing::debug!(phase = ?state.phase, "Ignoring resume");
            return;
        }

        let now = Instant::now();
        let wait = state.pending_resume_delay.take().unwrap_or(Duration::ZERO);
        state.phase = Phase::Running;
        state.next_at = now + wait;
        if let Some(expiry) = &state.expiry {
            expiry.resume();
        }
        let epoch = state.epoch;
        state.resume_wait = Some(IntervalInner::resume_timer(&self.inner, wait, epoch));
        tracing::debug!(wait_ms = wait.as_millis(), "Interval resumed");
    }

    /// Change the period.
    ///
    /// The wait already in flight keeps its original length; the new period
    /// applies from the next execution on.
    pub fn set_delay(&self, period: Duration) {
        let mut state = self.inner.lock();
        state.period = period;
        tracing::debug!(period_ms = period.as_millis(), "Interval period changed");
    }
}

impl<A> Interval<A> {
    pub fn args(&self) -> &A {
        &self.inner.args
    }

    pub fn callback(&self) -> &Callback<A> {
        &self.inner.callback
    }

    pub fn created_at(&self) -> Instant {
        self.inner.created_at
    }

    /// When the callback last ran
    pub fn last_execution(&self) -> Option<Instant> {
        self.inner.lock().last_execution
    }

    pub fn max_executions(&self) -> Option<u64> {
        self.inner.max_executions
    }

    pub fn max_time(&self) -> Option<Duration> {
        self.inner.max_time
    }

    pub fn reset_delay_on_pause(&self) -> bool {
        self.inner.reset_delay_on_pause
    }

    /// Number of times the callback has run
    pub fn executions(&self) -> u64 {
        self.inner.lock().executions
    }

    /// Current period
    pub fn delay(&self) -> Duration {
        self.inner.lock().period
    }

    pub fn is_paused(&self) -> bool {
        self.inner.lock().phase == Phase::Paused
    }

    pub fn is_stopped(&self) -> bool {
        self.stop_reason().is_some()
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        match self.inner.lock().phase {
            Phase::Stopped(reason) => Some(reason),
            _ => None,
        }
    }

    /// When the callback is expected to run next, `None` unless running
    pub fn will_execute_at(&self) -> Option<Instant> {
        let state = self.inner.lock();
        match state.phase {
            Phase::Running => Some(state.next_at),
            _ => None,
        }
    }
}

impl<A> IntervalInner<A> {
    fn lock(&self) -> MutexGuard<'_, IntervalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<A> IntervalInner<A>
where
    A: Clone + Send + Sync + 'static,
{
    fn spawn_cadence(this: &Arc<Self>, epoch: u64) -> JoinHandle<()> {
        let inner = Arc::clone(this);
        tokio::spawn(async move { inner.run_cadence(epoch).await })
    }

    async fn run_cadence(&self, epoch: u64) {
        loop {
            let deadline = {
                let state = self.lock();
                if state.epoch != epoch || state.phase != Phase::Running {
                    return;
                }
                state.next_at
            };

            sleep_until(deadline).await;
            if !self.tick(epoch) {
                return;
            }
        }
    }

    /// One regular execution. Returns whether the cadence should go on.
    fn tick(&self, epoch: u64) -> bool {
        let mut state = self.lock();
        if state.epoch != epoch || state.phase != Phase::Running {
            return false;
        }

        let now = Instant::now();
        if budget_spent(&state, now) {
            halt(&mut state, StopReason::MaxTime);
            return false;
        }
        if !self.execute(&mut state, now) {
            return false;
        }

        // Keep the cadence anchored to its deadlines unless we fell a whole period behind
        let next = state.next_at + state.period;
        state.next_at = if next > now { next } else { now + state.period };
        true
    }

    /// Single-use wait armed by `resume`
    fn resume_timer(this: &Arc<Self>, wait: Duration, epoch: u64) -> Timeout<u64> {
        let inner = Arc::clone(this);
        Timeout::new(
            move |epoch| {
                let inner = Arc::clone(&inner);
                async move { inner.finish_resume(epoch) }
            },
            wait,
            epoch,
        )
    }

    fn finish_resume(self: &Arc<Self>, epoch: u64) {
        let mut state = self.lock();
        if state.epoch != epoch || state.phase != Phase::Running {
            return;
        }
        state.resume_wait = None;

        let now = Instant::now();
        if budget_spent(&state, now) {
            halt(&mut state, StopReason::MaxTime);
            return;
        }
        if !self.execute(&mut state, now) {
            return;
        }

        state.next_at = now + state.period;
        state.cadence = Some(Self::spawn_cadence(self, epoch));
    }

    /// The `max_time` watchdog. Holds the interval weakly so an otherwise
    /// unreachable, paused interval can still be dropped.
    fn expiry_timer(this: &Arc<Self>, max_time: Duration) -> Timeout<()> {
        let weak: Weak<Self> = Arc::downgrade(this);
        Timeout::new(
            move |()| {
                let weak = Weak::clone(&weak);
                async move {
                    if let Some(inner) = weak.upgrade() {
                        let mut state = inner.lock();
                        if !matches!(state.phase, Phase::Stopped(_)) {
                            halt(&mut state, StopReason::MaxTime);
                        }
                    }
                }
            },
            max_time,
            (),
        )
    }

    /// Invoke the callback and count it. Returns whether the interval is
    /// still running afterwards.
    fn execute(&self, state: &mut IntervalState, now: Instant) -> bool {
        state.last_execution = Some(now);
        callback::detach(&self.callback, self.args.clone(), "interval");
        state.executions = state.executions.saturating_add(1);
        tracing::debug!(executions = state.executions, "Interval fired");

        if self
            .max_executions
            .is_some_and(|max| state.executions >= max)
        {
            halt(state, StopReason::MaxExecutions);
            return false;
        }
        true
    }
}

/// Whether the `max_time` budget ran out by `now`
fn budget_spent(state: &IntervalState, now: Instant) -> bool {
    state
        .expiry
        .as_ref()
        .and_then(Timeout::will_execute_at)
        .is_some_and(|at| at <= now)
}

/// Drop whichever primitive is armed and invalidate any that is already waking.
fn disarm(state: &mut IntervalState) {
    state.epoch = state.epoch.wrapping_add(1);
    if let Some(cadence) = state.cadence.take() {
        cadence.abort();
    }
    if let Some(resume_wait) = state.resume_wait.take() {
        resume_wait.stop();
    }
}

fn halt(state: &mut IntervalState, reason: StopReason) {
    disarm(state);
    if let Some(expiry) = state.expiry.take() {
        expiry.stop();
    }
    state.pending_resume_delay = None;
    state.phase = Phase::Stopped(reason);
    tracing::debug!(?reason, executions = state.executions, "Interval stopped");
}
