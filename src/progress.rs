//! Progress-callback trait for multi-item conversions.
//!
//! Page rasterisation and bulk image conversion work through a list of items
//! one at a time. Inject an [`Arc<dyn ConversionProgressCallback>`] into those
//! tools to observe each step; the CLI uses it to drive a progress bar.
//!
//! # Example
//!
//! ```rust
//! use convertkit::ConversionProgressCallback;
//! use std::sync::{Arc, Mutex};
//!
//! struct Percent(Mutex<Vec<u32>>);
//!
//! impl ConversionProgressCallback for Percent {
//!     fn on_item_complete(&self, _index: usize, _total: usize, fraction: f64) {
//!         self.0.lock().unwrap().push((fraction * 100.0).round() as u32);
//!     }
//! }
//!
//! let cb = Arc::new(Percent(Mutex::new(Vec::new())));
//! cb.on_item_complete(0, 2, 0.5);
//! assert_eq!(*cb.0.lock().unwrap(), vec![50]);
//! ```

use std::sync::Arc;

/// Called by the sequential tools as they work through their items.
///
/// Items are processed strictly in order on one logical task, so callbacks
/// never overlap; the `Send + Sync` bound exists because tools hop between
/// the async runtime and blocking threads.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the first item.
    fn on_conversion_start(&self, total: usize) {
        let _ = total;
    }

    /// Called before an item is processed. `index` is zero-based.
    fn on_item_start(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called after an item completes.
    ///
    /// `fraction` is the share of items finished so far, in `[0, 1]`.
    fn on_item_complete(&self, index: usize, total: usize, fraction: f64) {
        let _ = (index, total, fraction);
    }

    /// Called when an item fails. The conversion stops after this.
    fn on_item_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called once after the last item succeeded.
    fn on_conversion_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias for the type accepted by the tools.
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

/// Rounded percentage for `done` of `total` items.
pub fn percent(done: usize, total: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    ((done as f64 / total as f64) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        started_total: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_conversion_start(&self, total: usize) {
            self.started_total.store(total, Ordering::SeqCst);
        }

        fn on_item_start(&self, _index: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_item_complete(&self, _index: usize, _total: usize, _fraction: f64) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_item_error(&self, _index: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start(5);
        cb.on_item_start(0, 5);
        cb.on_item_complete(0, 5, 0.2);
        cb.on_item_error(1, 5, "decode failed");
        cb.on_conversion_complete(5, 4);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            starts: AtomicUsize::new(0),
            completes: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            started_total: AtomicUsize::new(0),
        };

        tracker.on_conversion_start(3);
        tracker.on_item_start(0, 3);
        tracker.on_item_complete(0, 3, 1.0 / 3.0);
        tracker.on_item_start(1, 3);
        tracker.on_item_error(1, 3, "bad");

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn percent_rounds() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(3, 3), 100);
        assert_eq!(percent(0, 0), 100);
    }
}
