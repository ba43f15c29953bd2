//! Single-holder guard preventing overlapping resume/poll sequences.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag scoped to one (project, kind) pair. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct GuardLatch {
    held: Arc<AtomicBool>,
}

impl GuardLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the latch if nobody holds it. The returned guard releases it on drop,
    /// so every exit path of the guarded operation (errors and cancellation
    /// included) gives the latch back.
    pub fn try_acquire(&self) -> Option<LatchGuard> {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| LatchGuard {
                held: Arc::clone(&self.held),
            })
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

/// Proof of holding a [`GuardLatch`].
#[derive(Debug)]
#[must_use = "dropping the guard releases the latch immediately"]
pub struct LatchGuard {
    held: Arc<AtomicBool>,
}

impl LatchGuard {
    /// Release explicitly. Equivalent to dropping the guard.
    pub fn release(self) {}
}

impl Drop for LatchGuard {
    fn drop(&mut self) {
        self.held.store(false, Ordering::Release);
    }
}
