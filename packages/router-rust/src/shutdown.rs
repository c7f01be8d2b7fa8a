//! Graceful shutdown controller for the consumer.
//!
//! Uses `ArcSwap` for lock-free state reads and a `watch` channel to wake
//! the polling loop. Triggering shutdown stops polling; in-flight workers
//! always run to completion.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::watch;

/// Consumer lifecycle state, transitioned by the shutdown controller.
///
/// State machine: Starting -> Polling -> Draining -> Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    /// Consumer has not begun polling yet.
    Starting,
    /// Consumer is polling the queue and dispatching messages.
    Polling,
    /// Shutdown was triggered; in-flight workers are finishing.
    Draining,
    /// All workers finished; `start` has returned.
    Stopped,
}

/// Coordinates graceful shutdown between the consumer loop and its callers.
///
/// 1. Callers (signal handlers, health probes) hold the controller.
/// 2. `trigger()` moves to `Draining` and wakes the polling loop.
/// 3. The consumer drains its workers and marks `Stopped`.
#[derive(Debug)]
pub struct ShutdownController {
    signal: watch::Sender<bool>,
    state: ArcSwap<ConsumerState>,
}

impl ShutdownController {
    /// Creates a controller in the `Starting` state.
    #[must_use]
    pub fn new() -> Self {
        let (signal, _rx) = watch::channel(false);
        Self {
            signal,
            state: ArcSwap::from_pointee(ConsumerState::Starting),
        }
    }

    /// Returns a receiver that observes the shutdown signal.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.signal.subscribe()
    }

    /// Initiates graceful shutdown: the consumer stops polling and drains
    /// in-flight workers before returning from `start`.
    pub fn trigger(&self) {
        self.state.store(Arc::new(ConsumerState::Draining));
        // Ignore send errors -- receivers may have been dropped.
        let _ = self.signal.send(true);
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConsumerState {
        **self.state.load()
    }

    /// Whether shutdown has been triggered.
    #[must_use]
    pub fn is_draining(&self) -> bool {
        matches!(
            self.state(),
            ConsumerState::Draining | ConsumerState::Stopped
        )
    }

    /// Marks the consumer as actively polling. A no-op once shutdown has
    /// been triggered, so a trigger racing `start` is not lost.
    pub(crate) fn mark_polling(&self) {
        if self.state() == ConsumerState::Starting {
            self.state.store(Arc::new(ConsumerState::Polling));
        }
    }

    /// Marks the drain as complete.
    pub(crate) fn mark_stopped(&self) {
        self.state.store(Arc::new(ConsumerState::Stopped));
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}
