pub mod timers;

// Re-exports for convenience
pub use lapse_types::IntervalParams;
pub use timers::{Callback, CallbackFuture, Interval, StopReason, Timeout, sleep};
