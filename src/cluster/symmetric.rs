//! Symmetric static-partition coordination.
//!
//! The alternative to the master/worker protocol: no rank is special.
//! Every rank generates the identical prefix list (generation is
//! deterministic for fixed inputs) and owns the prefixes whose index is
//! congruent to its rank. Work proceeds in rounds of [`SYNC_INTERVAL`]
//! prefixes; between rounds the ranks all-reduce their bounds, so an
//! improvement found anywhere prunes everywhere within one round. Ranks
//! that exhaust their share keep joining the collectives until the
//! globally-known round count runs out, then a final all-reduce elects
//! the winning length and the lowest-ranked holder broadcasts its
//! marks.
//!
//! Latency/balance trade against the master/worker design: there is no
//! per-prefix round trip and no coordinator bottleneck, but a rank
//! stuck on a hot subtree finishes its round late while its peers wait
//! at the collective. The dynamic design is the default for that
//! reason; this one wins when the interconnect is slow relative to the
//! subtree cost spread.
//!
//! Requires a power-of-two group (everything here is a hypercube
//! collective).

use super::hypercube::Collectives;
use super::transport::Fabric;
use super::ClusterError;
use crate::config::SolveConfig;
use crate::ruler::Ruler;
use crate::search::{auto_depth, drive, generate_prefixes, initial_seed, SharedBound};
use crate::Solution;

/// Prefixes each rank explores between bound synchronizations.
pub const SYNC_INTERVAL: usize = 64;

/// Runs the static-partition protocol on this rank; every rank returns
/// the same result.
pub fn run_symmetric<F: Fabric>(fabric: &F, cfg: &SolveConfig) -> Result<Solution, ClusterError> {
    cfg.validate()?;

    if cfg.n == 2 {
        return Ok(Solution {
            ruler: Ruler::from_marks(vec![0, 1]),
            explored: 0,
        });
    }
    if fabric.size() == 1 {
        return crate::solve_with_config(*cfg).map_err(ClusterError::from);
    }

    let mut coll = Collectives::new(fabric)?;
    let size = fabric.size();
    let rank = fabric.rank();
    let n = cfg.n;
    let max_len = cfg.clamped_max_len();
    let threads = cfg.effective_threads();

    let (local_seed, witness) = initial_seed(n, max_len, cfg.initial_bound);
    let seed = coll.all_reduce_min(local_seed)?;

    // Identical on every rank, which is what makes the silent
    // index-modulo partition sound.
    let depth = if cfg.prefix_depth > 0 {
        cfg.prefix_depth
    } else {
        auto_depth(n, size * threads)
    }
    .clamp(2, n - 1);
    let prefixes = generate_prefixes(n, depth, seed);

    let mine: Vec<_> = prefixes
        .iter()
        .enumerate()
        .filter(|(i, _)| i % size == rank)
        .map(|(_, p)| *p)
        .collect();

    // Every rank derives the same round count from the same totals, so
    // the collective call sequences line up without negotiation.
    let largest_share = prefixes.len().div_ceil(size);
    let rounds = largest_share.div_ceil(SYNC_INTERVAL);

    let bound = SharedBound::new(seed);
    let mut best_len = match &witness {
        Some(w) if w.length <= seed => w.length,
        _ => seed,
    };
    let mut best = witness.filter(|w| w.length <= seed);
    let mut explored: u64 = 0;

    for round in 0..rounds {
        let start = round * SYNC_INTERVAL;
        let chunk = mine.get(start..mine.len().min(start + SYNC_INTERVAL)).unwrap_or(&[]);

        if !chunk.is_empty() {
            let outcome = drive(chunk, n, threads, &bound, None);
            explored += outcome.explored;
            if let Some(ruler) = outcome.best {
                if ruler.length < best_len {
                    best_len = ruler.length;
                    best = Some(ruler);
                }
            }
        }

        // Exhausted ranks still vote; the collective sequence must be
        // identical everywhere.
        let global = coll.all_reduce_min(bound.load_acquire())?;
        bound.try_lower(global);
    }

    // Election: agree on the length, then on the lowest rank that can
    // prove it, then pull the marks from that rank.
    let global_len = coll.all_reduce_min(best_len.min(bound.load_acquire()))?;
    let vote = if best.as_ref().is_some_and(|b| b.length == global_len) {
        rank as u32
    } else {
        size as u32
    };
    let winner = coll.all_reduce_min(vote)?;

    if winner == size as u32 {
        // Nobody holds a witness: the search proved infeasibility.
        return Ok(Solution {
            ruler: Ruler::empty(),
            explored,
        });
    }

    let ruler = broadcast_ruler(&mut coll, best.as_ref(), n, winner as usize)?;
    debug_assert_eq!(ruler.length, global_len);

    Ok(Solution { ruler, explored })
}

/// Distributes the winner's marks one value at a time through the
/// scalar broadcast; mark counts are tiny, so simplicity beats a bulk
/// frame here.
fn broadcast_ruler<F: Fabric>(
    coll: &mut Collectives<'_, F>,
    local: Option<&Ruler>,
    n: u32,
    winner: usize,
) -> Result<Ruler, ClusterError> {
    let mut marks = Vec::with_capacity(n as usize);
    for i in 0..n as usize {
        let mine = local.map(|r| r.marks[i]).unwrap_or(0);
        marks.push(coll.broadcast(mine, winner)?);
    }
    Ok(Ruler::from_marks(marks))
}

/// In-process harness: `processes` ranks over a memory fabric, mirror
/// of [`run_local_cluster`](super::run_local_cluster) for this design.
pub fn run_local_symmetric(
    cfg: SolveConfig,
    processes: usize,
) -> Result<Solution, ClusterError> {
    cfg.validate()?;
    if processes <= 1 {
        return crate::solve_with_config(cfg).map_err(ClusterError::from);
    }

    crate::search::metrics::reset_explored();
    let group = super::MemoryFabric::group(processes);

    let mut results = std::thread::scope(|scope| {
        let handles: Vec<_> = group
            .iter()
            .map(|fabric| scope.spawn(move || run_symmetric(fabric, &cfg)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("agent thread panicked"))
            .collect::<Vec<_>>()
    });

    let first = results.remove(0)?;
    for other in results {
        let other = other?;
        debug_assert_eq!(
            other.ruler, first.ruler,
            "ranks disagree on the elected ruler"
        );
    }

    Ok(Solution {
        ruler: first.ruler,
        explored: crate::search::metrics::explored_count(),
    })
}
