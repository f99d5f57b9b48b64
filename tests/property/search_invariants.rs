//! State invariants under random valid extension sequences.
//!
//! Whatever path the search takes, every reachable state must keep the
//! popcount identities (marks in `reversed_marks`, pair count in
//! `used_diffs`) and decode back to a valid Golomb ruler.

use ogr_rs::search::RulerState;
use ogr_rs::Ruler;
use proptest::prelude::*;

/// Extends the origin with pseudo-random candidate positions, keeping
/// only collision-free ones; this walks the same state space the
/// backtracker does.
fn random_walk(steps: &[u32]) -> RulerState {
    let mut state = RulerState::origin();
    for &step in steps {
        if state.marks_count as usize >= ogr_rs::MAX_MARKS {
            break;
        }
        let pos = state.ruler_length + 1 + step % 16;
        if pos > ogr_rs::MAX_LEN {
            break;
        }
        if let Some(next) = state.try_extend(pos) {
            state = next;
        }
    }
    state
}

proptest! {
    #[test]
    fn reachable_states_hold_invariants(steps in proptest::collection::vec(0u32..16, 0..20)) {
        let state = random_walk(&steps);
        prop_assert!(state.invariants_hold());

        let marks = state.marks();
        prop_assert_eq!(marks.len(), state.marks_count as usize);
        prop_assert_eq!(*marks.last().unwrap(), state.ruler_length);

        if marks.len() >= 2 {
            prop_assert_eq!(state.first_mark(), marks[1]);
            prop_assert_eq!(state.last_gap(), marks[marks.len() - 1] - marks[marks.len() - 2]);
            prop_assert!(Ruler::from_marks(marks).is_golomb());
        }
    }

    #[test]
    fn rejected_extensions_repeat_a_difference(steps in proptest::collection::vec(0u32..16, 1..12)) {
        let state = random_walk(&steps);
        // Try every position in a window past the end; whenever the
        // collision test rejects, some existing pair already realizes
        // one of the would-be differences.
        for pos in state.ruler_length + 1..(state.ruler_length + 12).min(ogr_rs::MAX_LEN) {
            let fresh = state.diffs_for(pos);
            let rejected = state.try_extend(pos).is_none();
            prop_assert_eq!(rejected, fresh.intersects(state.used_diffs));
        }
    }
}
