//! Cancellation for in-flight requests.
//!
//! A `watch` channel carries a generation counter. Each request records the
//! generation it started under and is abandoned as soon as the counter moves.
//! Cancelling with nothing in flight is harmless: the next request starts
//! from the new generation. The handle also sees whether a request is in
//! flight, so an interrupt at an idle prompt can be treated as quit.

#[cfg(test)]
#[path = "cancel_test.rs"]
mod cancel_test;

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

use crate::api::types::ApiError;

/// Sender side. Cheap to clone and safe to move into a signal handler task.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<u64>>,
    busy: Arc<AtomicBool>,
}

/// Receiver side, owned by the controller.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<u64>,
    busy: Arc<AtomicBool>,
}

#[must_use]
pub fn channel() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(0_u64);
    let busy = Arc::new(AtomicBool::new(false));
    (
        CancelHandle { tx: Arc::new(tx), busy: Arc::clone(&busy) },
        CancelToken { rx, busy },
    )
}

impl CancelHandle {
    /// Abort whatever request is currently in flight. Returns whether one was.
    pub fn cancel(&self) -> bool {
        let in_flight = self.is_busy();
        self.tx.send_modify(|generation| *generation = generation.wrapping_add(1));
        in_flight
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

impl CancelToken {
    /// A token that is never cancelled.
    #[must_use]
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(0_u64);
        // A closed channel never fires.
        drop(tx);
        Self { rx, busy: Arc::new(AtomicBool::new(false)) }
    }

    /// Run `request`, resolving to [`ApiError::Cancelled`] if a cancel arrives first.
    ///
    /// # Errors
    ///
    /// Propagates the request's own error, or `Cancelled`.
    pub async fn run<F, T>(&mut self, request: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let start = *self.rx.borrow_and_update();
        let _in_flight = InFlight::enter(Arc::clone(&self.busy));
        tokio::select! {
            result = request => result,
            () = changed_from(&mut self.rx, start) => Err(ApiError::Cancelled),
        }
    }
}

/// Marks the token busy until dropped, even if `run` is abandoned mid-flight.
struct InFlight(Arc<AtomicBool>);

impl InFlight {
    fn enter(busy: Arc<AtomicBool>) -> Self {
        busy.store(true, Ordering::SeqCst);
        Self(busy)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

async fn changed_from(rx: &mut watch::Receiver<u64>, start: u64) {
    let moved = rx.wait_for(|generation| *generation != start).await.is_ok();
    if !moved {
        std::future::pending::<()>().await;
    }
}
