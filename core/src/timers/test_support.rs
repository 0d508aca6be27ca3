//! Helpers shared by the timer tests

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Records the instant of every callback invocation
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    fired: Arc<Mutex<Vec<Instant>>>,
}

impl Recorder {
    pub fn hit(&self) {
        self.fired.lock().unwrap().push(Instant::now());
    }

    pub fn count(&self) -> usize {
        self.fired.lock().unwrap().len()
    }

    /// Milliseconds from `origin` to each invocation
    pub fn offsets(&self, origin: Instant) -> Vec<u64> {
        self.fired
            .lock()
            .unwrap()
            .iter()
            .map(|at| at.duration_since(origin).as_millis() as u64)
            .collect()
    }
}

/// Assert that each invocation happened within a couple of milliseconds of
/// the expected offset.
#[track_caller]
pub fn assert_fired_at(recorder: &Recorder, origin: Instant, expected: &[u64]) {
    let actual = recorder.offsets(origin);
    assert_eq!(
        actual.len(),
        expected.len(),
        "expected firings at {expected:?}, got {actual:?}"
    );
    for (got, want) in actual.iter().zip(expected) {
        assert!(
            got.abs_diff(*want) <= 2,
            "expected firings at {expected:?}, got {actual:?}"
        );
    }
}
