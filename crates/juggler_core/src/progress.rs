use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Progress tracking for a sweep run, readable from other threads while the
/// run is in flight
#[derive(Debug, Clone, Default)]
pub struct RunProgress {
    /// Units whose callback has returned
    completed: Arc<AtomicUsize>,
    /// Units whose callback reported failure
    failed: Arc<AtomicUsize>,
    /// Units in the combination space
    total: Arc<AtomicUsize>,
}

impl RunProgress {
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            completed: Arc::new(AtomicUsize::new(0)),
            failed: Arc::new(AtomicUsize::new(0)),
            total: Arc::new(AtomicUsize::new(total)),
        }
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    /// Fraction of units completed, in `[0, 1]`
    #[must_use]
    pub fn fraction(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.completed() as f64 / total as f64,
        }
    }

    /// Count one finished unit with its callback status
    pub fn record(&self, status: i32) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        if status != 0 {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn reset(&self, total: usize) {
        self.completed.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }
}
