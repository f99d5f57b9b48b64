//! In-process parallel driver.
//!
//! Workers claim prefixes one at a time through a shared atomic cursor.
//! Static splits lose badly here: adjacent prefixes differ in cost by
//! orders of magnitude, so any pre-assignment leaves most threads idle
//! while one grinds a hot subtree. One-at-a-time claiming is the
//! finest-grained dynamic schedule and the claim itself is a single
//! `fetch_add`.
//!
//! Workers keep their witness and explored tally in locals; the only
//! shared writes during a batch are bound improvements (CAS-min) and
//! the final merge under a mutex after the claim loop drains.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use crossbeam_utils::CachePadded;

use super::backtrack::{explore, new_stack, WorkerBest};
use super::bound::SharedBound;
use super::metrics;
use super::state::RulerState;
use crate::ruler::Ruler;

/// Result of driving one prefix batch to exhaustion.
#[derive(Clone, Debug)]
pub struct DriveOutcome {
    /// Best ruler seen by any worker, or the seed witness, or `None`.
    pub best: Option<Ruler>,
    /// The bound at exit (optimal length when `best` is `Some`).
    pub best_len: u32,
    /// Frames visited across all workers in this batch.
    pub explored: u64,
}

/// Explores every prefix with `threads` workers sharing `bound`.
///
/// `seed_witness` is the ruler backing the initial bound (the greedy
/// seed), kept so an unimproved search still returns a valid result.
pub fn drive(
    prefixes: &[RulerState],
    n: u32,
    threads: usize,
    bound: &SharedBound,
    seed_witness: Option<Ruler>,
) -> DriveOutcome {
    let initial_len = bound.load_acquire();
    let merged = Mutex::new((initial_len, seed_witness));
    let cursor = CachePadded::new(AtomicUsize::new(0));
    let explored_total = CachePadded::new(AtomicU64::new(0));

    let workers = threads.clamp(1, prefixes.len().max(1));

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                let mut stack = new_stack();
                let mut best = WorkerBest::new(bound.load_acquire());
                let mut explored: u64 = 0;

                loop {
                    let i = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(prefix) = prefixes.get(i) else {
                        break;
                    };

                    // Re-check feasibility: the bound may have dropped
                    // since this prefix was generated.
                    let current = bound.load_acquire();
                    let r = n - prefix.marks_count;
                    if prefix.ruler_length + r * (r + 1) / 2 >= current {
                        continue;
                    }

                    explored += explore(*prefix, n, bound, &mut best, &mut stack);
                }

                explored_total.fetch_add(explored, Ordering::Relaxed);
                if let Some(ruler) = best.ruler() {
                    // Worker cutoffs start at the shared bound, so any
                    // witness here strictly beats the seed.
                    let mut guard = merged.lock().expect("merge mutex poisoned");
                    if ruler.length < guard.0 {
                        guard.0 = ruler.length;
                        guard.1 = Some(ruler);
                    }
                }
            });
        }
    });

    let explored = explored_total.load(Ordering::Relaxed);
    metrics::add_explored(explored);

    let (best_len, best) = merged.into_inner().expect("merge mutex poisoned");
    DriveOutcome {
        best,
        best_len,
        explored,
    }
}
