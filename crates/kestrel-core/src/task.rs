//! Task primitives and the session task registry.
//!
//! Two shapes of asynchronous work are used throughout the orchestrator:
//!
//! - [`Completable`]: work that produces no value, only completion or failure.
//! - [`Observable`]: work that produces zero or more values and then completes,
//!   or fails part-way through.
//!
//! [`TaskRegistry`] tracks background work spawned on behalf of one session and
//! cancels all of it at once on teardown. Work awaited in place goes through
//! [`TaskRegistry::run_until_shutdown`] and resolves to `None` once cancelled.
//!
//! # Blocking Lock Usage
//!
//! Uses `parking_lot::Mutex` for JoinHandle storage because:
//! 1. Operations are O(1) push or O(n) drain (shutdown only)
//! 2. Lock is never held across `.await` points
//! 3. No I/O or async work inside lock scope

use std::future::Future;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Asynchronous work that yields only completion or failure.
///
/// Borrows from whoever runs it; combine with [`compose`](crate::compose).
pub type Completable<'a, E> = BoxFuture<'a, Result<(), E>>;

/// Asynchronous work that yields zero or more values, then ends.
///
/// An `Err` item terminates the stream from the consumer's point of view.
pub type Observable<T, E> = BoxStream<'static, Result<T, E>>;

/// Tracks the background tasks of a single session.
///
/// Once [`shutdown`](Self::shutdown) has run, every tracked task is aborted and
/// any task spawned afterwards is dropped without being polled.
#[derive(Debug)]
pub struct TaskRegistry {
    shutdown_tx: watch::Sender<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskRegistry {
    /// Empty registry, not shut down.
    pub fn new() -> Self {
        let (shutdown_tx, _shutdown_rx) = watch::channel(false);
        Self {
            shutdown_tx,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Whether the registry has been shut down.
    pub fn is_shut_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Spawn a task that stops as soon as the registry shuts down.
    pub fn spawn_cancellable<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_shut_down() {
            tracing::debug!("task registry shut down; dropping spawned task");
            return;
        }
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown_rx) => {}
                _ = fut => {}
            }
        });
        let mut handles = self.handles.lock();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Run `fut` to completion unless the registry shuts down first.
    ///
    /// Returns `None` when cancelled.
    pub async fn run_until_shutdown<F, T>(&self, fut: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        if self.is_shut_down() {
            return None;
        }
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        tokio::select! {
            biased;
            _ = wait_for_shutdown(&mut shutdown_rx) => None,
            value = fut => Some(value),
        }
    }

    /// Cancel every tracked task. Calling this more than once is a no-op.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
        for handle in self.handles.lock().drain(..) {
            handle.abort();
        }
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskRegistry {
    fn drop(&mut self) {
        self.shutdown_tx.send_replace(true);
        for handle in self.handles.lock().drain(..) {
            handle.abort();
        }
    }
}

async fn wait_for_shutdown(shutdown_rx: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown_rx.borrow() {
            return;
        }
        if shutdown_rx.changed().await.is_err() {
            return;
        }
    }
}
