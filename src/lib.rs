//! Exhaustive search for optimal Golomb rulers.
//!
//! A Golomb ruler is a set of integer marks in which every pairwise
//! difference appears once; an optimal ruler is the shortest for its
//! mark count. This crate proves optimality by exhausting a pruned
//! branch-and-bound tree:
//!
//! 1. A greedy seed tightens the cutoff before the first node.
//! 2. The tree is cut at a fixed depth into independent prefixes.
//! 3. Worker threads claim prefixes dynamically and run an iterative,
//!    allocation-free backtracker over a bit-packed state whose
//!    collision test is one 128-bit shift and AND.
//! 4. The best known length lives in a CAS-min atomic that every
//!    worker reads mid-scan, so improvements prune globally.
//! 5. Mirror symmetry halves the tree: first marks stay in the lower
//!    half, and of every ruler/mirror pair only one is recorded.
//!
//! The same engine scales across processes through [`cluster`]: a
//! master serves prefixes on demand over a message fabric, bounds
//! diffuse via piggybacks and hypercube relays, and a final election
//! leaves every rank holding the same witness.
//!
//! ```
//! let solution = ogr_rs::solve(4, 100).unwrap();
//! assert_eq!(solution.ruler.length, 6);
//! assert_eq!(solution.ruler.marks, vec![0, 1, 4, 6]);
//! ```

pub mod cluster;
pub mod config;
pub mod error;
pub mod ruler;
pub mod search;
pub mod stdx;

pub use cluster::{run_local_cluster, ClusterError};
pub use config::SolveConfig;
pub use error::SolveError;
pub use ruler::{optimal_length, Ruler, OPTIMAL_LENGTHS};
pub use search::{explored_count, MAX_LEN, MAX_MARKS};

use search::{auto_depth, drive, generate_prefixes, initial_seed, metrics, SharedBound};

/// A finished search: the best ruler and the work it took.
#[derive(Clone, Debug)]
pub struct Solution {
    /// The optimal ruler, or the empty ruler when none fits the cap.
    pub ruler: Ruler,
    /// States explored by this search.
    pub explored: u64,
}

/// Searches for the optimal `n`-mark ruler of length at most `max_len`.
///
/// Equivalent to [`solve_with_config`] with defaults: greedy seeding,
/// automatic prefix depth, and all available threads.
pub fn solve(n: u32, max_len: u32) -> Result<Solution, SolveError> {
    solve_with_config(SolveConfig::new(n, max_len))
}

/// Searches under an explicit [`SolveConfig`].
///
/// Returns the empty ruler when no `n`-mark ruler of length at most
/// `max_len` exists; that outcome is a proof, not an error. The
/// process-wide [`explored_count`] is reset at entry and mirrors the
/// returned [`Solution::explored`].
pub fn solve_with_config(cfg: SolveConfig) -> Result<Solution, SolveError> {
    cfg.validate()?;
    metrics::reset_explored();

    if cfg.n == 2 {
        return Ok(Solution {
            ruler: Ruler::from_marks(vec![0, 1]),
            explored: 0,
        });
    }

    let max_len = cfg.clamped_max_len();
    let (seed_len, witness) = initial_seed(cfg.n, max_len, cfg.initial_bound);

    let threads = cfg.effective_threads();
    let depth = if cfg.prefix_depth > 0 {
        cfg.prefix_depth
    } else {
        auto_depth(cfg.n, threads)
    }
    .clamp(2, cfg.n - 1);

    let bound = SharedBound::new(seed_len);
    let prefixes = generate_prefixes(cfg.n, depth, seed_len);
    let outcome = drive(&prefixes, cfg.n, threads, &bound, witness);

    Ok(Solution {
        ruler: outcome.best.unwrap_or_else(Ruler::empty),
        explored: outcome.explored,
    })
}
