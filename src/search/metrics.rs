//! Explored-state accounting.
//!
//! Workers count frame visits in a plain local `u64` and fold the total
//! into the process counter once per prefix batch, keeping atomics off
//! the hot path. The counter is reset at the start of every search so
//! `explored_count()` always describes the most recent one.

use std::sync::atomic::{AtomicU64, Ordering};

static EXPLORED: AtomicU64 = AtomicU64::new(0);

/// States explored by the most recent search in this process.
pub fn explored_count() -> u64 {
    EXPLORED.load(Ordering::Relaxed)
}

/// Clears the counter; called once per search entry.
pub(crate) fn reset_explored() {
    EXPLORED.store(0, Ordering::Relaxed);
}

/// Folds a worker's local tally into the process counter.
pub(crate) fn add_explored(count: u64) {
    EXPLORED.fetch_add(count, Ordering::Relaxed);
}
