//! Greedy seed ruler.
//!
//! Repeatedly places the smallest position whose new differences are
//! all unused. The result is far from optimal but cheap (one pass up
//! the number line), and its length tightens the shared bound before
//! the first branch-and-bound node, which prunes hardest exactly where
//! the tree is widest.

use super::state::RulerState;
use crate::ruler::Ruler;

/// Builds an `n`-mark ruler greedily, scanning positions below
/// `max_len`. Returns `None` when `n` marks do not fit.
pub fn greedy_ruler(n: u32, max_len: u32) -> Option<Ruler> {
    debug_assert!(n >= 2);

    let mut state = RulerState::origin();
    let mut pos = 1;
    while state.marks_count < n && pos < max_len {
        if let Some(next) = state.try_extend(pos) {
            state = next;
        }
        pos += 1;
    }

    if state.marks_count == n {
        Some(Ruler::from_marks(state.marks()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greedy_rulers_are_golomb() {
        for n in 2..=10 {
            let r = greedy_ruler(n, 127).expect("cap 127 fits small greedy rulers");
            assert_eq!(r.order(), n as usize);
            assert!(r.is_golomb(), "greedy n={n} produced {r}");
        }
    }

    #[test]
    fn greedy_prefix_is_the_mian_sequence() {
        // Smallest-first placement yields 0,1,3,7,12,20,... so the
        // 5-mark greedy ruler is {0,1,3,7,12}.
        let r = greedy_ruler(5, 127).unwrap();
        assert_eq!(r.marks, vec![0, 1, 3, 7, 12]);
        assert_eq!(r.length, 12);
    }

    #[test]
    fn tight_cap_yields_none() {
        assert_eq!(greedy_ruler(6, 17), None);
        assert!(greedy_ruler(6, 127).is_some());
    }
}
