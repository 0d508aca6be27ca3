//! Pausable one-shot timer
//!
//! A `Timeout` wraps a single delayed callback invocation. Tokio's sleep cannot
//! be paused, only dropped, so pausing records how much of the wait is left
//! and resuming arms a fresh sleep for exactly that remainder.
//!
//! # Lifecycle
//!
//! ```text
//! Scheduled ──pause──▶ Paused ──resume──▶ Scheduled
//!     │                                       │
//!     └──────────── elapses ──▶ Firing ──▶ Finished ──rerun──▶ Scheduled
//! ```
//!
//! `stop` moves any state to `Finished` without invoking the callback.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

use super::callback::{self, Callback};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// A sleep is armed for `remaining`
    Scheduled,
    /// The sleep elapsed and the callback has not settled yet
    Firing,
    Paused,
    Finished,
}

struct TimeoutState {
    phase: Phase,
    remaining: Duration,
    resumed_at: Instant,
    /// Bumped on every arm and disarm; a sleep only fires for its own epoch
    epoch: u64,
    sleeper: Option<JoinHandle<()>>,
}

struct TimeoutInner<A> {
    callback: Callback<A>,
    args: A,
    created_at: Instant,
    delay: Duration,
    state: Mutex<TimeoutState>,
}

/// A delayed callback that can be paused, resumed, stopped and rerun.
///
/// Cloning yields another handle to the same timer. Dropping every handle
/// does not cancel an armed timer; call [`Timeout::stop`] for that.
pub struct Timeout<A> {
    inner: Arc<TimeoutInner<A>>,
}

impl<A> Clone for Timeout<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> std::fmt::Debug for Timeout<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("Timeout")
            .field("delay", &self.inner.delay)
            .field("phase", &state.phase)
            .field("remaining", &state.remaining)
            .finish()
    }
}

impl<A> Timeout<A>
where
    A: Clone + Send + Sync + 'static,
{
    /// Schedule `callback(args)` to run after `delay`.
    ///
    /// The timer is armed on return. Must be called from within a Tokio
    /// runtime.
    pub fn new<F, Fut>(callback: F, delay: Duration, args: A) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let now = Instant::now();
        let inner = Arc::new(TimeoutInner {
            callback: callback::boxed(callback),
            args,
            created_at: now,
            delay,
            state: Mutex::new(TimeoutState {
                phase: Phase::Scheduled,
                remaining: delay,
                resumed_at: now,
                epoch: 0,
                sleeper: None,
            }),
        });

        {
            let mut state = inner.lock();
            TimeoutInner::arm(&inner, &mut state, now);
        }

        Self { inner }
    }

    /// Freeze the remaining wait. No-op unless the timer is scheduled.
    pub fn pause(&self) {
        let mut state = self.inner.lock();
        if state.phase != Phase::Scheduled {
            tracing::debug!(phase = ?state.phase, "Ignoring pause");
            return;
        }

        let now = Instant::now();
        disarm(&mut state);
        let elapsed = now.saturating_duration_since(state.resumed_at);
        state.remaining = state.remaining.saturating_sub(elapsed);
        state.phase = Phase::Paused;
        tracing::debug!(remaining_ms = state.remaining.as_millis(), "Timeout paused");
    }

    /// Continue waiting for the frozen remainder. No-op unless paused.
    pub fn resume(&self) {
        let mut state = self.inner.lock();
        if state.phase != Phase::Paused {
            tracing::debug!(phase = ?state.phase, "Ignoring resume");
            return;
        }

        TimeoutInner::arm(&self.inner, &mut state, Instant::now());
    }

    /// Schedule the callback again once it has finished.
    ///
    /// Waits `delay` if given, the original delay otherwise. The original
    /// delay itself never changes. No-op unless finished.
    pub fn rerun(&self, delay: Option<Duration>) {
        let mut state = self.inner.lock();
        if state.phase != Phase::Finished {
            tracing::debug!(phase = ?state.phase, "Ignoring rerun");
            return;
        }

        state.remaining = delay.unwrap_or(self.inner.delay);
        TimeoutInner::arm(&self.inner, &mut state, Instant::now());
    }

    /// Finish without invoking the callback.
    ///
    /// A later `rerun(None)` waits the original delay again.
    pub fn stop(&self) {
        let mut state = self.inner.lock();
        disarm(&mut state);
        state.phase = Phase::Finished;
        state.remaining = self.inner.delay;
        tracing::debug!("Timeout stopped");
    }
}

impl<A> Timeout<A> {
    pub fn args(&self) -> &A {
        &self.inner.args
    }

    pub fn callback(&self) -> &Callback<A> {
        &self.inner.callback
    }

    pub fn created_at(&self) -> Instant {
        self.inner.created_at
    }

    /// When the timer was last scheduled (creation, resume or rerun)
    pub fn resumed_at(&self) -> Instant {
        self.inner.lock().resumed_at
    }

    /// The delay the timer was created with
    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    /// Whether the callback ran (or the timer was stopped) and nothing is scheduled
    pub fn is_finished(&self) -> bool {
        self.inner.lock().phase == Phase::Finished
    }

    pub fn is_paused(&self) -> bool {
        self.inner.lock().phase == Phase::Paused
    }

    /// When the callback is expected to run, `None` once finished.
    ///
    /// While paused this reports the instant it would have run had the
    /// timer been resumed right at `resumed_at`.
    pub fn will_execute_at(&self) -> Option<Instant> {
        let state = self.inner.lock();
        match state.phase {
            Phase::Finished => None,
            _ => Some(state.resumed_at + state.remaining),
        }
    }

    /// Wait left before the callback runs.
    pub fn remaining(&self) -> Duration {
        let state = self.inner.lock();
        match state.phase {
            Phase::Scheduled => state
                .remaining
                .saturating_sub(Instant::now().saturating_duration_since(state.resumed_at)),
            Phase::Paused => state.remaining,
            Phase::Firing | Phase::Finished => Duration::ZERO,
        }
    }
}

impl<A> TimeoutInner<A> {
    fn lock(&self) -> MutexGuard<'_, TimeoutState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<A> TimeoutInner<A>
where
    A: Clone + Send + Sync + 'static,
{
    /// Arm a fresh sleep for `state.remaining`, replacing any previous one.
    fn arm(this: &Arc<Self>, state: &mut TimeoutState, now: Instant) {
        disarm(state);
        state.phase = Phase::Scheduled;
        state.resumed_at = now;

        let epoch = state.epoch;
        let deadline = now + state.remaining;
        let inner = Arc::clone(this);
        state.sleeper = Some(tokio::spawn(async move {
            sleep_until(deadline).await;
            inner.fire(epoch).await;
        }));
        tracing::debug!(delay_ms = state.remaining.as_millis(), "Timeout armed");
    }

    async fn fire(&self, epoch: u64) {
        {
            let mut state = self.lock();
            if state.epoch != epoch || state.phase != Phase::Scheduled {
                return;
            }
            state.phase = Phase::Firing;
        }

        callback::invoke(&self.callback, self.args.clone(), "timeout").await;

        let mut state = self.lock();
        if state.epoch == epoch && state.phase == Phase::Firing {
            state.phase = Phase::Finished;
            state.sleeper = None;
        }
    }
}

/// Drop the armed sleep, if any, and invalidate it should it already be waking.
fn disarm(state: &mut TimeoutState) {
    state.epoch = state.epoch.wrapping_add(1);
    if let Some(sleeper) = state.sleeper.take() {
        sleeper.abort();
    }
}
