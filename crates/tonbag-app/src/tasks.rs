//! Task registry for scope-bound background work.
//!
//! Tracks spawned tasks and supports cooperative shutdown. One registry is
//! owned per selected scope; shutting it down (or dropping it) stops the
//! poll loop and every other task spawned for that scope.
//!
//! # Blocking Lock Usage
//!
//! Uses `parking_lot::Mutex` for JoinHandle storage because:
//! 1. Operations are O(1) push or O(n) drain (shutdown only)
//! 2. Lock is never held across `.await` points
//! 3. No I/O or async work inside lock scope

use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Owner of a set of spawned tasks.
#[derive(Debug)]
pub struct TaskRegistry {
    shutdown_tx: watch::Sender<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        let (shutdown_tx, _shutdown_rx) = watch::channel(false);
        Self {
            shutdown_tx,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawn `fut`; it is dropped at its next suspension point after
    /// [`TaskRegistry::shutdown`].
    pub fn spawn_cancellable<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_rx.changed() => {}
                _ = fut => {}
            }
        });
        self.track(handle);
    }

    /// Run `f` every `interval` until it returns `false` or the registry
    /// shuts down.
    ///
    /// The first run happens immediately. A run that outlasts the interval
    /// delays the next one; missed ticks are skipped, never queued, so runs
    /// never overlap.
    pub fn spawn_interval_until<F, Fut>(&self, interval: Duration, mut f: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        tokio::select! {
                            _ = shutdown_rx.changed() => break,
                            keep_going = f() => {
                                if !keep_going {
                                    break;
                                }
                            }
                        }
                    }
                }
            }
        });
        self.track(handle);
    }

    /// Token that fires when this registry shuts down.
    pub fn cancellation_token(&self) -> CancellationToken {
        CancellationToken {
            shutdown_rx: self.shutdown_tx.subscribe(),
        }
    }

    /// Whether [`TaskRegistry::shutdown`] has been called.
    pub fn is_shut_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Number of tracked tasks that have not finished yet.
    pub fn active_tasks(&self) -> usize {
        let mut handles = self.handles.lock();
        handles.retain(|handle| !handle.is_finished());
        handles.len()
    }

    /// Signal every task to stop and abort the ones still running.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        for handle in self.handles.lock().drain(..) {
            handle.abort();
        }
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut handles = self.handles.lock();
        handles.retain(|handle| !handle.is_finished());
        handles.push(handle);
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Cloneable handle observing a shutdown signal.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    shutdown_rx: watch::Receiver<bool>,
}

impl CancellationToken {
    pub(crate) fn from_receiver(shutdown_rx: watch::Receiver<bool>) -> Self {
        Self { shutdown_rx }
    }

    /// Resolve once cancellation is signalled (or the signal source is gone).
    pub async fn cancelled(&self) {
        let mut shutdown_rx = self.shutdown_rx.clone();
        loop {
            if *shutdown_rx.borrow() {
                return;
            }
            if shutdown_rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Whether cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Run `fut` unless cancellation fires first.
    pub async fn run_until_cancelled<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancelled() => None,
            output = fut => Some(output),
        }
    }
}
