use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Run-wide failure signal.
///
/// Within a run it only ever goes from clear to set. Workers check it before
/// each claim, so units already running are never interrupted.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Set the flag, returning `true` only for the call that set it first.
    pub fn trip(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}
