//! Iterative depth-first branch and bound.
//!
//! One worker explores one prefix subtree to exhaustion. The traversal
//! is a plain loop over a pre-allocated frame array: no recursion, no
//! per-node allocation, and a resumable cursor per level so a frame can
//! be re-entered after its child subtree completes.
//!
//! Pruning applied at every frame:
//! - *Lower bound*: the `r` missing marks add at least `1 + 2 + ... + r`
//!   to the length; a frame that cannot beat the shared bound is dead.
//! - *Upper cap*: symmetric cap on the next position, leaving room for
//!   the cheapest possible tail.
//! - *Collision*: one shift + AND against `used_diffs` per candidate.
//! - *Mirror filter*: of every ruler/mirror pair exactly one satisfies
//!   `a1 < a_{n-1} - a_{n-2}`; the other is skipped at completion time
//!   (and only there; a mirrored interior state can still extend to a
//!   non-mirrored completion).
//!
//! The shared bound is reloaded before each candidate so improvements
//! from other workers take effect mid-scan; a stale read only delays a
//! prune.

use super::bound::SharedBound;
use super::state::{RulerState, SearchFrame, MAX_MARKS};
use crate::ruler::Ruler;
use crate::stdx::BitSet128;

/// Pre-allocated frame array; index = depth below the prefix root.
pub type FrameStack = [SearchFrame; MAX_MARKS];

/// Fresh stack for a worker. Tens of bytes per frame, all inline.
pub fn new_stack() -> FrameStack {
    [SearchFrame::blank(); MAX_MARKS]
}

/// Best complete ruler one worker has recorded so far.
///
/// Marks live in an inline array so recording a solution does not
/// allocate; solutions are rare but occur mid-hot-loop.
#[derive(Clone, Copy, Debug)]
pub struct WorkerBest {
    len: u32,
    marks: [u32; MAX_MARKS],
    count: u32,
}

impl WorkerBest {
    /// Starts with no witness and the given exclusive cutoff.
    pub fn new(initial_len: u32) -> Self {
        Self {
            len: initial_len,
            marks: [0; MAX_MARKS],
            count: 0,
        }
    }

    /// Current exclusive cutoff (initial, or the best recorded length).
    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Decodes and stores a completed ruler.
    ///
    /// `reversed` must carry all `n` marks including bit 0.
    fn record(&mut self, reversed: BitSet128, length: u32) {
        self.len = length;
        self.count = 0;
        for i in 0..=length {
            if reversed.test(length - i) {
                self.marks[self.count as usize] = i;
                self.count += 1;
            }
        }
        debug_assert_eq!(self.count, reversed.count_ones());
    }

    /// The recorded witness, if any solution was found.
    pub fn ruler(&self) -> Option<Ruler> {
        if self.count == 0 {
            None
        } else {
            Some(Ruler::from_marks(
                self.marks[..self.count as usize].to_vec(),
            ))
        }
    }
}

/// Exhausts the subtree rooted at `prefix` for an `n`-mark search.
///
/// Every extension of `prefix` reaching `n` marks with length strictly
/// below the shared bound (as observed during the call) is enumerated
/// or provably pruned. Improvements update `best` and the shared bound.
/// Returns the number of frames visited.
pub fn explore(
    prefix: RulerState,
    n: u32,
    shared: &SharedBound,
    best: &mut WorkerBest,
    stack: &mut FrameStack,
) -> u64 {
    debug_assert!(prefix.marks_count >= 1 && prefix.marks_count <= n);
    debug_assert!(n as usize <= MAX_MARKS);

    let mut explored: u64 = 0;
    stack[0] = SearchFrame::enter(prefix);
    let mut depth: usize = 1;

    while depth > 0 {
        explored += 1;

        let state = stack[depth - 1].state;
        let first_mark = stack[depth - 1].first_mark;
        let bound = shared.load_relaxed();

        if state.marks_count == n {
            // The prefix itself is complete (decomposition depth n-1).
            if state.ruler_length < bound
                && state.first_mark() < state.last_gap()
                && state.ruler_length < best.len
            {
                best.record(state.reversed_marks, state.ruler_length);
                shared.try_lower(state.ruler_length);
            }
            depth -= 1;
            continue;
        }

        let r = n - state.marks_count;
        let min_additional = r * (r + 1) / 2;
        if state.ruler_length + min_additional >= bound {
            depth -= 1;
            continue;
        }

        let max_tail = (r - 1) * r / 2;
        let mut max_pos = bound - max_tail - 1;
        if state.marks_count == 1 {
            // Placing the first nonzero mark: one half suffices, the
            // mirror covers the other.
            max_pos = max_pos.min(bound / 2);
        }

        let mut pos = match stack[depth - 1].next_candidate {
            0 => state.ruler_length + 1,
            saved => saved,
        };

        let mut pushed = false;
        while pos <= max_pos {
            if pos >= shared.load_relaxed() {
                break;
            }

            let new_diffs = state.reversed_marks.shl(pos - state.ruler_length);
            if new_diffs.intersects(state.used_diffs) {
                pos += 1;
                continue;
            }

            let placed_first = if state.marks_count == 1 {
                pos
            } else {
                first_mark
            };

            if state.marks_count + 1 == n {
                // Complete ruler of length `pos`.
                let last_gap = pos - state.ruler_length;
                if placed_first < last_gap && pos < best.len {
                    best.record(new_diffs.with_bit(0), pos);
                    shared.try_lower(pos);
                }
                pos += 1;
                continue;
            }

            stack[depth - 1].next_candidate = pos + 1;
            stack[depth] = SearchFrame {
                state: state.child(pos, new_diffs),
                next_candidate: 0,
                first_mark: placed_first,
            };
            depth += 1;
            pushed = true;
            break;
        }

        if !pushed {
            depth -= 1;
        }
    }

    explored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ruler::optimal_length;

    fn run_from_origin(n: u32, cap: u32) -> (WorkerBest, u64) {
        let shared = SharedBound::new(cap + 1);
        let mut best = WorkerBest::new(cap + 1);
        let mut stack = new_stack();
        let explored = explore(RulerState::origin(), n, &shared, &mut best, &mut stack);
        (best, explored)
    }

    #[test]
    fn finds_known_optima_from_origin() {
        for n in 3..=7u32 {
            let (best, explored) = run_from_origin(n, 127);
            let expected = optimal_length(n).unwrap();
            assert_eq!(best.len(), expected, "n={n}");
            let ruler = best.ruler().expect("witness recorded");
            assert!(ruler.is_golomb());
            assert_eq!(ruler.order(), n as usize);
            assert_eq!(ruler.length, expected);
            assert!(explored > 0);
        }
    }

    #[test]
    fn infeasible_cap_leaves_no_witness() {
        // Optimal n=5 length is 11; a cap of 10 finds nothing.
        let (best, _) = run_from_origin(5, 10);
        assert!(best.ruler().is_none());
        assert_eq!(best.len(), 11);
    }

    #[test]
    fn mirror_representative_survives() {
        // Only one of each ruler/mirror pair is recorded; that one has
        // its first gap smaller than its last.
        let (best, _) = run_from_origin(6, 17);
        let ruler = best.ruler().unwrap();
        let first_gap = ruler.marks[1] - ruler.marks[0];
        let last_gap = ruler.marks[5] - ruler.marks[4];
        assert!(first_gap < last_gap, "got {ruler}");
    }

    #[test]
    fn pruned_prefix_returns_immediately() {
        let shared = SharedBound::new(5);
        let mut best = WorkerBest::new(5);
        let mut stack = new_stack();
        // {0} with 4 marks to place needs length >= 10 > 5.
        let explored = explore(RulerState::origin(), 5, &shared, &mut best, &mut stack);
        assert_eq!(explored, 1);
        assert!(best.ruler().is_none());
    }

    #[test]
    fn complete_prefix_is_recorded_at_entry() {
        let mut state = RulerState::origin();
        for pos in [1, 3] {
            state = state.try_extend(pos).unwrap();
        }
        let shared = SharedBound::new(4);
        let mut best = WorkerBest::new(4);
        let mut stack = new_stack();
        explore(state, 3, &shared, &mut best, &mut stack);
        assert_eq!(best.ruler().unwrap().marks, vec![0, 1, 3]);
        assert_eq!(shared.load_relaxed(), 3);
    }

    #[test]
    fn shared_bound_improvement_tightens_search() {
        // Seeding the bound with the optimum makes the walk strictly
        // cheaper than the unseeded one.
        let (_, unseeded) = run_from_origin(7, 127);
        let shared = SharedBound::new(26);
        let mut best = WorkerBest::new(26);
        let mut stack = new_stack();
        let seeded = explore(RulerState::origin(), 7, &shared, &mut best, &mut stack);
        assert_eq!(best.len(), 25);
        assert!(seeded <= unseeded);
    }
}
