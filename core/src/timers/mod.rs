//! Timer system
//!
//! This module provides:
//! - **Timeout**: a one-shot delayed callback that can be paused, resumed,
//!   stopped and rerun
//! - **Interval**: a recurring callback with pause/resume, a mutable period,
//!   and optional execution and running-time ceilings
//! - **sleep**: an awaitable delay built on `Timeout`
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐        resume / max_time
//! │           Interval           │ ─────────────────────────────┐
//! │  cadence task (every period) │                              ▼
//! └──────────────────────────────┘               ┌──────────────────────────┐
//!                                                │  Timeout (single-use)    │
//!                                                │  sleep_until(remaining)  │
//!                                                └──────────────────────────┘
//! ```
//!
//! Both kinds run on Tokio. A paused timer has no task armed; it only
//! remembers how long it still has to wait.

mod callback;
mod interval;
mod sleep;
mod timeout;

#[cfg(test)]
mod test_support;

pub use callback::{Callback, CallbackFuture};
pub use interval::{Interval, StopReason};
pub use sleep::sleep;
pub use timeout::Timeout;
