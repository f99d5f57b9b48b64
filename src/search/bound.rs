//! The shared branch-and-bound cutoff.
//!
//! One `AtomicU32` holds the best complete-ruler length any worker has
//! seen. Readers use relaxed loads: a stale value only weakens pruning
//! for a few iterations, never correctness. Writers race through a
//! CAS-min loop, so the value is monotonically non-increasing for the
//! lifetime of a search.

use std::sync::atomic::{AtomicU32, Ordering};

/// Process-wide best known ruler length (exclusive search cutoff).
#[derive(Debug)]
pub struct SharedBound(AtomicU32);

impl SharedBound {
    pub fn new(initial: u32) -> Self {
        Self(AtomicU32::new(initial))
    }

    /// Cheap read for pruning decisions.
    #[inline(always)]
    pub fn load_relaxed(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }

    /// Read that observes the latest published improvement.
    #[inline]
    pub fn load_acquire(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }

    /// Lowers the bound to `candidate` unless it is already as low.
    ///
    /// Returns `true` when this call performed the improvement. Losing
    /// a race to an equal or better value returns `false`; the bound
    /// never moves upward.
    #[inline]
    pub fn try_lower(&self, candidate: u32) -> bool {
        let mut observed = self.0.load(Ordering::Relaxed);
        while candidate < observed {
            match self.0.compare_exchange_weak(
                observed,
                candidate,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => observed = actual,
            }
        }
        false
    }
}
