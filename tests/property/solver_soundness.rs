//! Whatever the parameters, a returned ruler is a valid witness.

use ogr_rs::{optimal_length, solve_with_config, SolveConfig};
use proptest::prelude::*;

proptest! {
    // Full searches are not microtests; keep the case count small.
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn returned_rulers_are_golomb_witnesses(
        n in 3u32..=7,
        max_len in 2u32..=60,
        threads in 1usize..=3,
    ) {
        prop_assume!(max_len >= n - 1);
        let mut cfg = SolveConfig::new(n, max_len);
        cfg.threads = threads;
        let s = solve_with_config(cfg).unwrap();

        let optimal = optimal_length(n).unwrap();
        if max_len >= optimal {
            // Feasible: the result must be exactly the tabulated optimum.
            prop_assert_eq!(s.ruler.length, optimal);
            prop_assert_eq!(s.ruler.order(), n as usize);
            prop_assert!(s.ruler.is_golomb());
            prop_assert!(s.ruler.marks[0] == 0);
        } else {
            // Infeasible: an exhausted search proves it.
            prop_assert!(s.ruler.is_empty());
            prop_assert_eq!(s.ruler.length, 0);
        }
    }

    #[test]
    fn seeded_and_unseeded_agree(n in 3u32..=7, slack in 0u32..=20) {
        let optimal = optimal_length(n).unwrap();
        let max_len = optimal + slack;

        let unseeded = solve_with_config(SolveConfig::new(n, max_len)).unwrap();

        let mut seeded_cfg = SolveConfig::new(n, max_len);
        seeded_cfg.initial_bound = Some(optimal);
        let seeded = solve_with_config(seeded_cfg).unwrap();

        prop_assert_eq!(unseeded.ruler.length, optimal);
        prop_assert_eq!(seeded.ruler.length, optimal);
    }
}
