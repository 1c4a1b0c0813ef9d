//! Coalesces bursts of raw change notifications into single recomputes.
//!
//! Notification storms are the normal case: one membership flip can
//! arrive as a handful of store events in the same tick. Each scope
//! keeps at most one pending timer; a burst inside the window costs one
//! recompute, run against store state at fire time.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::models::NodeId;

/// What a pending recompute is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// The global collection list.
    Collections,
    /// The child list of one collection.
    Children(NodeId),
}

/// Scope-keyed debounce table.
pub struct Debouncer {
    window: Duration,
    timers: Mutex<HashMap<Scope, JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Restart `scope`'s timer. `recompute` runs once the timer goes a
    /// full window untouched; a newer poke for the same scope replaces
    /// it entirely.
    pub fn poke<F>(&self, scope: Scope, recompute: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let window = self.window;
        let mut timers = self.timers.lock();
        if let Some(previous) = timers.remove(&scope) {
            previous.abort();
        }
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            recompute.await;
        });
        timers.insert(scope, handle);
    }

    /// Cancel the pending timer for `scope`, if any. Used on
    /// unsubscription so no recompute runs against a torn-down view.
    pub fn cancel(&self, scope: &Scope) {
        if let Some(handle) = self.timers.lock().remove(scope) {
            handle.abort();
        }
    }

    /// Cancel every pending timer.
    pub fn cancel_all(&self) {
        for (_, handle) in self.timers.lock().drain() {
            handle.abort();
        }
    }

    /// Timers armed and not yet fired. Fired entries linger in the
    /// table until the next poke for their scope; they are not counted.
    pub fn pending(&self) -> usize {
        self.timers
            .lock()
            .values()
            .filter(|handle| !handle.is_finished())
            .count()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        for (_, handle) in self.timers.lock().drain() {
            handle.abort();
        }
    }
}
