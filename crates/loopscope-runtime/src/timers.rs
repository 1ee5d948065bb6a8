//! Timer host
//!
//! Real-time backing for `setTimeout`/`clearTimeout`. Each scheduled timer
//! is a tokio sleep task that, on expiry, sends its id over a channel. The
//! interpreter never runs on the tokio runtime; expired ids are collected
//! with [`TimerHost::drain_fired`] on the engine thread, so all script
//! state stays single-threaded.
//!
//! Cancellation aborts the sleep task and forgets the handle. A timer that
//! expired in flight (fired after the abort was requested but before it
//! landed) is filtered out during the drain, so cancellation is always a
//! clean no-op from the script's point of view.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;

/// Unique timer identifier (monotonically increasing per host)
pub type TimerId = u64;

static TIMER_RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Shared tokio runtime for timer sleeps.
///
/// A single background worker is enough: tasks here do nothing but sleep
/// and send one message.
fn timer_runtime() -> &'static Runtime {
    TIMER_RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_time()
            .thread_name("loopscope-timer")
            .build()
            .unwrap_or_else(|e| panic!("failed to create timer runtime: {}", e))
    })
}

/// Host-side registry of pending timers
pub struct TimerHost {
    fired_tx: Sender<TimerId>,
    fired_rx: Receiver<TimerId>,
    handles: HashMap<TimerId, JoinHandle<()>>,
    next_id: TimerId,
}

impl TimerHost {
    /// Create a host with no pending timers
    pub fn new() -> Self {
        let (fired_tx, fired_rx) = mpsc::channel();
        Self {
            fired_tx,
            fired_rx,
            handles: HashMap::new(),
            next_id: 1,
        }
    }

    /// Schedule a timer to fire after `delay_ms` milliseconds
    pub fn schedule(&mut self, delay_ms: u64) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;

        let tx = self.fired_tx.clone();
        let handle = timer_runtime().spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            // The receiver may already be gone during shutdown.
            let _ = tx.send(id);
        });
        self.handles.insert(id, handle);
        id
    }

    /// Cancel a pending timer. Returns false if the id is unknown or the
    /// timer already fired and was drained.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.handles.remove(&id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Abort every pending timer
    pub fn cancel_all(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
        // Flush ids from timers that fired before the abort landed.
        while self.fired_rx.try_recv().is_ok() {}
    }

    /// Collect the ids of timers that have fired since the last drain,
    /// in firing order. Cancelled timers never appear here.
    pub fn drain_fired(&mut self) -> Vec<TimerId> {
        let mut fired = Vec::new();
        while let Ok(id) = self.fired_rx.try_recv() {
            // Only ids we still track count; a send can race an abort.
            if self.handles.remove(&id).is_some() {
                fired.push(id);
            }
        }
        fired
    }

    /// Number of timers still pending
    pub fn pending(&self) -> usize {
        self.handles.len()
    }
}

impl Default for TimerHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TimerHost {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
