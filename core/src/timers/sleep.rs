//! Awaitable delay built on [`Timeout`]

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;

use super::Timeout;

/// Suspend the caller for `duration`.
///
/// ```no_run
/// # async fn demo() {
/// println!("Hey");
/// lapse_core::sleep(std::time::Duration::from_secs(1)).await;
/// println!("Hey, one second later");
/// # }
/// ```
pub async fn sleep(duration: Duration) {
    let (tx, rx) = oneshot::channel();
    let tx = Mutex::new(Some(tx));
    let _timeout = Timeout::new(
        move |()| {
            let tx = tx.lock().unwrap_or_else(PoisonError::into_inner).take();
            async move {
                if let Some(tx) = tx {
                    let _ = tx.send(());
                }
            }
        },
        duration,
        (),
    );

    // The sender only disappears once the timeout fired or the runtime shut down
    let _ = rx.await;
}
