//! Multi-process coordination.
//!
//! # Module map
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`wire`] | Little-endian frame codec for every protocol message |
//! | [`transport`] | The [`Fabric`] mailbox seam + in-process fabric |
//! | [`hypercube`] | `log2(P)` collectives on power-of-two groups |
//! | [`coordinator`] | Master/worker protocol with dynamic assignment |
//! | [`symmetric`] | Static partition with periodic collectives |
//!
//! Two interchangeable protocols are provided. The master/worker
//! [`coordinator`] is the default: it load-balances per prefix, works
//! for any group size, and costs one round trip per prefix. The
//! [`symmetric`] design trades balance for latency independence and
//! runs on power-of-two groups only. Both guarantee that at
//! termination every rank holds the same best length and witness, that
//! each rank's view of the bound only ever tightens, and that no
//! blocking receive waits forever.

pub mod coordinator;
pub mod hypercube;
pub mod symmetric;
pub mod transport;
pub mod wire;

pub use coordinator::run_agent;
pub use hypercube::Collectives;
pub use symmetric::{run_local_symmetric, run_symmetric};
pub use transport::{Fabric, MemoryFabric};
pub use wire::{Message, WireError};

use std::fmt;

use crate::config::SolveConfig;
use crate::error::SolveError;
use crate::search::metrics;
use crate::Solution;

/// Failures of the coordination layer.
///
/// Everything here is either misconfiguration caught up front or a
/// protocol bug; there is no retry path.
#[derive(Debug)]
#[non_exhaustive]
pub enum ClusterError {
    /// Rejected search parameters.
    Invalid(SolveError),
    /// A collective was asked of a non-power-of-two group.
    NotPowerOfTwo { size: usize },
    /// Send target outside the group.
    UnknownRank { rank: usize, size: usize },
    /// A peer endpoint is gone.
    Disconnected,
    /// Undecodable frame.
    Frame(WireError),
    /// A well-formed message that the protocol state forbids.
    Protocol { detail: String },
}

impl fmt::Display for ClusterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(err) => write!(f, "invalid search parameters: {err}"),
            Self::NotPowerOfTwo { size } => {
                write!(f, "hypercube collectives need a power-of-two group, got {size}")
            }
            Self::UnknownRank { rank, size } => {
                write!(f, "rank {rank} outside group of {size}")
            }
            Self::Disconnected => write!(f, "peer disconnected"),
            Self::Frame(err) => write!(f, "malformed frame: {err}"),
            Self::Protocol { detail } => write!(f, "protocol violation: {detail}"),
        }
    }
}

impl std::error::Error for ClusterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Invalid(err) => Some(err),
            Self::Frame(err) => Some(err),
            _ => None,
        }
    }
}

impl From<WireError> for ClusterError {
    fn from(err: WireError) -> Self {
        Self::Frame(err)
    }
}

impl From<SolveError> for ClusterError {
    fn from(err: SolveError) -> Self {
        Self::Invalid(err)
    }
}

/// Runs the full protocol with `processes` ranks inside this process,
/// one agent thread per rank, connected by a [`MemoryFabric`].
///
/// This is the in-process stand-in for a real deployment (and the
/// harness the protocol tests drive). `Solution::explored` totals the
/// states explored across the whole group.
pub fn run_local_cluster(
    cfg: SolveConfig,
    processes: usize,
) -> Result<Solution, ClusterError> {
    cfg.validate()?;
    if processes <= 1 {
        return crate::solve_with_config(cfg).map_err(ClusterError::from);
    }

    metrics::reset_explored();
    let group = MemoryFabric::group(processes);

    let mut results = std::thread::scope(|scope| {
        let handles: Vec<_> = group
            .iter()
            .map(|fabric| scope.spawn(move || run_agent(fabric, &cfg)))
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
            other.ruler.length, first.ruler.length,
            "ranks disagree on the optimal length"
        );
    }

    Ok(Solution {
        ruler: first.ruler,
        explored: metrics::explored_count(),
    })
}
