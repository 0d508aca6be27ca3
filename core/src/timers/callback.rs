//! Callback plumbing shared by both timer kinds
//!
//! A callback is bound once, at construction, together with its arguments.
//! Every firing clones the arguments and runs the returned future on its own
//! task, so a panicking callback is reported without unwinding through the
//! timer bookkeeping that fired it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Future produced by one callback invocation.
pub type CallbackFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Type-erased callback taking the bound arguments by value.
pub type Callback<A> = Arc<dyn Fn(A) -> CallbackFuture + Send + Sync>;

/// Erase a closure into a [`Callback`].
pub(crate) fn boxed<A, F, Fut>(callback: F) -> Callback<A>
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |args| Box::pin(callback(args)))
}

/// Run one invocation to completion on its own task.
///
/// Returns once the callback settles, whether it completed or panicked.
pub(crate) async fn invoke<A>(callback: &Callback<A>, args: A, timer: &'static str) {
    let task = tokio::spawn(callback(args));
    if let Err(err) = task.await {
        if err.is_panic() {
            tracing::error!(timer, error = %err, "Timer callback panicked");
        }
    }
}

/// Start an invocation without waiting for it to settle.
pub(crate) fn detach<A>(callback: &Callback<A>, args: A, timer: &'static str)
where
    A: Send + 'static,
{
    let callback = Arc::clone(callback);
    tokio::spawn(async move { invoke(&callback, args, timer).await });
}
