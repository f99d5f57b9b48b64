//! Single-process search engine.
//!
//! # Module map
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`state`] | Bit-packed partial-ruler record and search frames |
//! | [`backtrack`] | Iterative DFS with pruning and the mirror filter |
//! | [`prefix`] | Decomposition of the tree into independent work items |
//! | [`bound`] | The shared CAS-min cutoff |
//! | [`greedy`] | Cheap seed ruler to tighten the cutoff up front |
//! | [`driver`] | Thread pool with dynamic one-at-a-time claiming |
//! | [`metrics`] | Explored-state accounting |
//!
//! Flow: seed → prefix generation → driver → per-worker backtracking,
//! with bound improvements feeding back through [`bound::SharedBound`].

pub mod backtrack;
pub mod bound;
pub mod driver;
pub mod greedy;
pub mod metrics;
pub mod prefix;
pub mod state;

pub use backtrack::{explore, new_stack, WorkerBest};
pub use bound::SharedBound;
pub use driver::{drive, DriveOutcome};
pub use greedy::greedy_ruler;
pub use metrics::explored_count;
pub use prefix::{auto_depth, generate_prefixes, PrefixStream};
pub use state::{RulerState, SearchFrame, MAX_LEN, MAX_MARKS};

use crate::ruler::Ruler;

/// Initial bound and its backing witness.
///
/// An explicit external bound is inclusive (a ruler of exactly that
/// length must still be found) and carries no witness. Otherwise the
/// greedy ruler seeds the cutoff and doubles as the fallback result
/// when the search cannot improve on it.
pub(crate) fn initial_seed(
    n: u32,
    max_len: u32,
    initial_bound: Option<u32>,
) -> (u32, Option<Ruler>) {
    let cap = max_len + 1;
    match initial_bound {
        Some(b) => (cap.min(b.saturating_add(1)), None),
        None => match greedy_ruler(n, max_len) {
            Some(r) if r.length < cap => {
                let len = r.length;
                (len, Some(r))
            }
            _ => (cap, None),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_bound_is_inclusive_and_witnessless() {
        let (len, witness) = initial_seed(8, 50, Some(34));
        assert_eq!(len, 35);
        assert!(witness.is_none());
    }

    #[test]
    fn explicit_bound_clamps_to_cap() {
        let (len, _) = initial_seed(8, 50, Some(90));
        assert_eq!(len, 51);
    }

    #[test]
    fn greedy_seed_carries_witness() {
        let (len, witness) = initial_seed(5, 100, None);
        assert_eq!(len, 12);
        assert_eq!(witness.unwrap().marks, vec![0, 1, 3, 7, 12]);
    }

    #[test]
    fn failed_greedy_falls_back_to_cap() {
        let (len, witness) = initial_seed(6, 17, None);
        assert_eq!(len, 18);
        assert!(witness.is_none());
    }
}
