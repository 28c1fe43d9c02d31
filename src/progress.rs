//! Progress-callback trait for batch runs.
//!
//! Both the attribution batch (one item per input file) and the link check
//! (one item per unique URL) report through [`BatchProgressCallback`]. The
//! binaries plug an `indicatif` bar in here; library callers can forward the
//! events anywhere else.
//!
//! # Example
//!
//! ```rust
//! use siteworks::BatchProgressCallback;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct Counter(AtomicUsize);
//!
//! impl BatchProgressCallback for Counter {
//!     fn on_item_complete(&self, _index: usize, _total: usize, _name: &str) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let c = Counter(AtomicUsize::new(0));
//! c.on_item_complete(1, 3, "a.png");
//! assert_eq!(c.0.load(Ordering::SeqCst), 1);
//! ```

use std::sync::Arc;

/// Called as a batch processes its items, strictly in order.
///
/// All methods default to no-ops so implementors only override what they
/// need. `index` is 1-based.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first item.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called before an item is processed.
    fn on_item_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when an item finished without error.
    fn on_item_complete(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when an item failed; the batch continues.
    fn on_item_error(&self, index: usize, total: usize, name: &str, error: &str) {
        let _ = (index, total, name, error);
    }

    /// Called once after every item was attempted.
    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// The default when no callback is configured.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Shared handle stored by the batch drivers.
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

/// A fresh no-op handle.
pub fn noop() -> ProgressCallback {
    Arc::new(NoopProgressCallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Tracking {
        started_total: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        success: AtomicUsize,
    }

    impl BatchProgressCallback for Tracking {
        fn on_batch_start(&self, total: usize) {
            self.started_total.store(total, Ordering::SeqCst);
        }
        fn on_item_complete(&self, _index: usize, _total: usize, _name: &str) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }
        fn on_item_error(&self, _index: usize, _total: usize, _name: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
        fn on_batch_complete(&self, _total: usize, success_count: usize) {
            self.success.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = noop();
        cb.on_batch_start(2);
        cb.on_item_start(1, 2, "a");
        cb.on_item_error(2, 2, "b", "boom");
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let t = Tracking::default();
        t.on_batch_start(3);
        t.on_item_complete(1, 3, "a");
        t.on_item_complete(2, 3, "b");
        t.on_item_error(3, 3, "c", "decode failed");
        t.on_batch_complete(3, 2);

        assert_eq!(t.started_total.load(Ordering::SeqCst), 3);
        assert_eq!(t.completes.load(Ordering::SeqCst), 2);
        assert_eq!(t.errors.load(Ordering::SeqCst), 1);
        assert_eq!(t.success.load(Ordering::SeqCst), 2);
    }
}
