//! Resolve-once readiness gate for late-loading content.
//!
//! Object tags (text, hypertext) must not accept user selections before their
//! content has finished loading in the embedding application. [`ReadyLatch`]
//! models that wait without an async runtime: callbacks queued before the
//! latch resolves are flushed exactly once when it does; callbacks added
//! afterwards run immediately.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

type ReadyCallback = Box<dyn FnOnce() + Send>;

/// A gate that resolves at most once per mount cycle.
pub struct ReadyLatch {
    loaded: AtomicBool,
    pending: Mutex<Vec<ReadyCallback>>,
}

impl ReadyLatch {
    /// Create an unresolved latch.
    pub fn new() -> Self {
        Self {
            loaded: AtomicBool::new(false),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Whether the latch has resolved.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Resolve the latch, flushing queued callbacks in queue order.
    ///
    /// Returns `true` on the call that performed the resolution; repeated
    /// calls are no-ops returning `false`.
    pub fn mark_loaded(&self) -> bool {
        if self.loaded.swap(true, Ordering::SeqCst) {
            return false;
        }
        // Take the queue before running anything so callbacks can re-enter.
        let callbacks = std::mem::take(&mut *self.pending.lock());
        tracing::trace!(
            target: "horizon_annotate_core::ready",
            callback_count = callbacks.len(),
            "ready latch resolved"
        );
        for callback in callbacks {
            callback();
        }
        true
    }

    /// Run a callback when the latch resolves.
    ///
    /// If the latch has already resolved, the callback runs immediately.
    pub fn on_ready<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_loaded() {
            callback();
        } else {
            self.pending.lock().push(Box::new(callback));
        }
    }

    /// Re-arm the latch for a new mount cycle, dropping queued callbacks.
    pub fn reset(&self) {
        self.loaded.store(false, Ordering::SeqCst);
        self.pending.lock().clear();
    }
}

impl Default for ReadyLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReadyLatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadyLatch")
            .field("loaded", &self.is_loaded())
            .field("pending", &self.pending.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_flushes_exactly_once() {
        let latch = ReadyLatch::new();
        let count = Arc::new(Mutex::new(0));

        let count_clone = count.clone();
        latch.on_ready(move || {
            *count_clone.lock() += 1;
        });

        assert!(latch.mark_loaded());
        assert!(!latch.mark_loaded());
        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn test_late_callbacks_run_immediately() {
        let latch = ReadyLatch::new();
        latch.mark_loaded();

        let ran = Arc::new(Mutex::new(false));
        let ran_clone = ran.clone();
        latch.on_ready(move || {
            *ran_clone.lock() = true;
        });

        assert!(*ran.lock());
    }

    #[test]
    fn test_reset_rearms_and_drops_queue() {
        let latch = ReadyLatch::new();
        let count = Arc::new(Mutex::new(0));

        let count_clone = count.clone();
        latch.on_ready(move || {
            *count_clone.lock() += 1;
        });

        latch.reset();
        latch.mark_loaded();
        // The queued callback was dropped by the reset.
        assert_eq!(*count.lock(), 0);
        assert!(latch.is_loaded());
    }
}
