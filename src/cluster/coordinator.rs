//! Master/worker coordination protocol.
//!
//! Rank 0 owns the prefix stream and serves one prefix per request;
//! every other rank runs an agent loop that keeps a small pipeline of
//! outstanding requests and feeds received prefixes to its local
//! searcher threads. Workers piggyback their best length on every
//! request, so the master's view of the global bound tightens with each
//! round trip and rides back out on every assignment.
//!
//! On power-of-two groups, bound improvements are additionally relayed
//! to hypercube neighbors (`rank XOR 2^d`) with fire-and-forget sends,
//! diffusing in `log2(P)` hops instead of two. The relay does not
//! deduplicate; a bound may reach a rank several times over different
//! paths, which is harmless because the sink is an idempotent CAS-min.
//!
//! Termination: an exhausted stream turns every further response into
//! `Terminate`. A worker whose outstanding requests have all been
//! terminated drains its searchers, reports its witness with
//! `FinalResult`, and blocks until the master, once it has collected
//! every worker's report, broadcasts the elected winner. Every blocking
//! receive is therefore matched by a send within a bounded number of
//! protocol steps, and all ranks finish holding the same result.

use std::collections::VecDeque;
use std::sync::mpsc::sync_channel;
use std::sync::Mutex;

use super::hypercube::Collectives;
use super::transport::Fabric;
use super::wire::Message;
use super::ClusterError;
use crate::config::SolveConfig;
use crate::ruler::Ruler;
use crate::search::bound::SharedBound;
use crate::search::{
    auto_depth, explore, initial_seed, metrics, new_stack, PrefixStream, RulerState, WorkerBest,
};
use crate::Solution;

/// Per-process best: length plus the witness backing it, when one
/// exists. A rank can hold a tight length with no witness (a bound
/// learned from a peer); the election only crowns ranks with marks.
#[derive(Clone, Debug)]
struct ProcessBest {
    len: u32,
    ruler: Option<Ruler>,
}

impl ProcessBest {
    fn seeded(seed_len: u32, witness: Option<Ruler>) -> Self {
        match witness {
            Some(w) if w.length <= seed_len => Self {
                len: w.length,
                ruler: Some(w),
            },
            _ => Self {
                len: seed_len,
                ruler: None,
            },
        }
    }

    fn offer(&mut self, len: u32, ruler: Option<Ruler>) {
        if ruler.is_some() && (len < self.len || (len <= self.len && self.ruler.is_none())) {
            self.len = len;
            self.ruler = ruler;
        } else {
            self.len = self.len.min(len);
        }
    }

    fn to_message(&self) -> Message {
        match &self.ruler {
            Some(r) => Message::FinalResult {
                best_len: r.length,
                marks: r.marks.clone(),
            },
            None => Message::FinalResult {
                best_len: self.len,
                marks: Vec::new(),
            },
        }
    }
}

/// Runs this rank's role in the protocol and returns the elected
/// result, identical on every rank.
///
/// `Solution::explored` counts the states explored by this rank alone.
pub fn run_agent<F: Fabric>(fabric: &F, cfg: &SolveConfig) -> Result<Solution, ClusterError> {
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

    let max_len = cfg.clamped_max_len();
    let (mut seed_len, witness) = initial_seed(cfg.n, max_len, cfg.initial_bound);

    // Every rank seeds independently; on power-of-two groups one
    // all-reduce makes the starting bound identical everywhere before
    // any work moves. Other group sizes converge through the request
    // piggyback instead. Ranks leave the collective at different
    // times, so early protocol frames may already sit in its stash.
    let mut pending = VecDeque::new();
    if fabric.size().is_power_of_two() {
        let mut coll = Collectives::new(fabric)?;
        seed_len = coll.all_reduce_min(seed_len)?;
        pending.extend(coll.into_foreign());
    }

    if fabric.rank() == 0 {
        master_agent(fabric, cfg, seed_len, witness, pending)
    } else {
        worker_agent(fabric, cfg, seed_len, witness, pending)
    }
}

/// Next protocol message: replayed from the collective's stash first,
/// then live from the fabric.
fn next_message<F: Fabric>(
    fabric: &F,
    pending: &mut VecDeque<(usize, Message)>,
) -> Result<(usize, Message), ClusterError> {
    if let Some(queued) = pending.pop_front() {
        return Ok(queued);
    }
    let (from, frame) = fabric.recv()?;
    Ok((from, Message::decode(&frame)?))
}

fn master_agent<F: Fabric>(
    fabric: &F,
    cfg: &SolveConfig,
    seed_len: u32,
    witness: Option<Ruler>,
    mut pending: VecDeque<(usize, Message)>,
) -> Result<Solution, ClusterError> {
    let n = cfg.n;
    let depth = resolve_depth(cfg, fabric.size());
    let mut stream = PrefixStream::new(n, depth, seed_len);
    let mut bound = seed_len;
    let mut best = ProcessBest::seeded(seed_len, witness);
    let mut finals_needed = fabric.size() - 1;

    while finals_needed > 0 {
        let (from, msg) = next_message(fabric, &mut pending)?;
        match msg {
            Message::Request { rank, best_len } => {
                if rank as usize != from {
                    return Err(ClusterError::Protocol {
                        detail: format!("request claims rank {rank} but came from {from}"),
                    });
                }
                bound = bound.min(best_len);
                serve_one(fabric, from, &mut stream, n, bound)?;
            }
            Message::BoundUpdate { best_len } => bound = bound.min(best_len),
            Message::FinalResult { best_len, marks } => {
                finals_needed -= 1;
                bound = bound.min(best_len);
                let ruler = (!marks.is_empty()).then(|| Ruler::from_marks(marks));
                best.offer(best_len, ruler);
            }
            other => {
                return Err(ClusterError::Protocol {
                    detail: format!("master got unexpected {other:?} from rank {from}"),
                })
            }
        }
    }

    let final_msg = best.to_message().encode();
    for rank in 1..fabric.size() {
        fabric.send(rank, final_msg.clone())?;
    }

    Ok(Solution {
        ruler: best.ruler.unwrap_or_else(Ruler::empty),
        explored: 0,
    })
}

/// Answers one request: the next still-feasible prefix, or `Terminate`.
fn serve_one<F: Fabric>(
    fabric: &F,
    to: usize,
    stream: &mut PrefixStream,
    n: u32,
    bound: u32,
) -> Result<(), ClusterError> {
    while let Some(prefix) = stream.next_prefix() {
        let r = n - prefix.marks_count;
        if prefix.ruler_length + r * (r + 1) / 2 >= bound {
            continue;
        }
        return fabric.send(
            to,
            Message::Assignment {
                best_len: bound,
                prefix,
            }
            .encode(),
        );
    }
    fabric.send(to, Message::Terminate.encode())
}

fn worker_agent<F: Fabric>(
    fabric: &F,
    cfg: &SolveConfig,
    seed_len: u32,
    witness: Option<Ruler>,
    pending: VecDeque<(usize, Message)>,
) -> Result<Solution, ClusterError> {
    let n = cfg.n;
    let rank = fabric.rank() as u32;
    let threads = cfg.effective_threads();

    let bound = SharedBound::new(seed_len);
    let best = Mutex::new(ProcessBest::seeded(seed_len, witness));
    let explored_total = Mutex::new(0u64);
    let (work_tx, work_rx) = sync_channel::<RulerState>(threads);
    let work_rx = Mutex::new(work_rx);

    let protocol = std::thread::scope(|scope| {
        for _ in 0..threads {
            scope.spawn(|| {
                let mut stack = new_stack();
                let mut worker_best = WorkerBest::new(bound.load_acquire());
                let mut explored: u64 = 0;

                loop {
                    // Holding the lock while blocked is deliberate: it
                    // serializes idle waiting, not work.
                    let next = work_rx.lock().expect("work queue poisoned").recv();
                    let Ok(prefix) = next else { break };

                    let current = bound.load_acquire();
                    let r = n - prefix.marks_count;
                    if prefix.ruler_length + r * (r + 1) / 2 >= current {
                        continue;
                    }
                    explored += explore(prefix, n, &bound, &mut worker_best, &mut stack);
                }

                metrics::add_explored(explored);
                *explored_total.lock().expect("counter poisoned") += explored;
                if let Some(ruler) = worker_best.ruler() {
                    let len = ruler.length;
                    best.lock()
                        .expect("best poisoned")
                        .offer(len, Some(ruler));
                }
            });
        }

        let result = drive_protocol(fabric, rank, threads, &bound, &work_tx, pending);
        // Closing the queue releases the searchers whatever happened
        // on the protocol side.
        drop(work_tx);
        result
    });
    protocol?;

    let local = best.into_inner().expect("best poisoned");
    fabric.send(0, local.to_message().encode())?;

    // Wait for the election result; stray relays may still arrive.
    loop {
        let (from, frame) = fabric.recv()?;
        match Message::decode(&frame)? {
            Message::FinalResult { best_len, marks } if from == 0 => {
                debug_assert!(marks.is_empty() || best_len <= local.len);
                return Ok(Solution {
                    ruler: if marks.is_empty() {
                        Ruler::empty()
                    } else {
                        Ruler::from_marks(marks)
                    },
                    explored: *explored_total.lock().expect("counter poisoned"),
                });
            }
            Message::BoundUpdate { .. } => {}
            other => {
                return Err(ClusterError::Protocol {
                    detail: format!("rank {rank} got unexpected {other:?} while finishing"),
                })
            }
        }
    }
}

/// The request/assignment pump: keeps `threads + 1` requests in flight
/// and stops once each has been answered with `Terminate`.
fn drive_protocol<F: Fabric>(
    fabric: &F,
    rank: u32,
    threads: usize,
    bound: &SharedBound,
    work_tx: &std::sync::mpsc::SyncSender<RulerState>,
    mut pending: VecDeque<(usize, Message)>,
) -> Result<(), ClusterError> {
    let mut outstanding = 0usize;
    for _ in 0..threads + 1 {
        send_request(fabric, rank, bound)?;
        outstanding += 1;
    }

    let mut last_relayed = bound.load_acquire();

    while outstanding > 0 {
        let (from, msg) = next_message(fabric, &mut pending)?;
        match msg {
            Message::Assignment { best_len, prefix } => {
                debug_assert!(prefix.invariants_hold());
                bound.try_lower(best_len);
                // Blocks when the queue is full: natural backpressure
                // against the master.
                work_tx
                    .send(prefix)
                    .map_err(|_| ClusterError::Disconnected)?;
                send_request(fabric, rank, bound)?;
            }
            Message::Terminate => outstanding -= 1,
            Message::BoundUpdate { best_len } => {
                bound.try_lower(best_len);
            }
            other => {
                return Err(ClusterError::Protocol {
                    detail: format!("rank {rank} got unexpected {other:?} from rank {from}"),
                })
            }
        }
        relay_improvements(fabric, bound, &mut last_relayed)?;
    }
    Ok(())
}

fn send_request<F: Fabric>(fabric: &F, rank: u32, bound: &SharedBound) -> Result<(), ClusterError> {
    fabric.send(
        0,
        Message::Request {
            rank,
            best_len: bound.load_acquire(),
        }
        .encode(),
    )
}

/// Fire-and-forget diffusion of a fresh improvement to all hypercube
/// neighbors. No-op on non-power-of-two groups.
fn relay_improvements<F: Fabric>(
    fabric: &F,
    bound: &SharedBound,
    last_relayed: &mut u32,
) -> Result<(), ClusterError> {
    let size = fabric.size();
    if !size.is_power_of_two() {
        return Ok(());
    }
    let current = bound.load_acquire();
    if current >= *last_relayed {
        return Ok(());
    }
    *last_relayed = current;

    let frame = Message::BoundUpdate { best_len: current }.encode();
    let rank = fabric.rank();
    for d in 0..size.trailing_zeros() {
        let neighbor = rank ^ (1 << d);
        fabric.send(neighbor, frame.clone())?;
    }
    Ok(())
}

fn resolve_depth(cfg: &SolveConfig, group_size: usize) -> u32 {
    let depth = if cfg.prefix_depth > 0 {
        cfg.prefix_depth
    } else {
        auto_depth(cfg.n, group_size)
    };
    depth.clamp(2, cfg.n - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ruler(marks: &[u32]) -> Ruler {
        Ruler::from_marks(marks.to_vec())
    }

    #[test]
    fn seeded_best_keeps_witness_only_at_or_below_seed() {
        let kept = ProcessBest::seeded(12, Some(ruler(&[0, 1, 3, 7, 12])));
        assert_eq!(kept.len, 12);
        assert!(kept.ruler.is_some());

        // A peer seeded lower: the local greedy cannot win, drop it.
        let dropped = ProcessBest::seeded(11, Some(ruler(&[0, 1, 3, 7, 12])));
        assert_eq!(dropped.len, 11);
        assert!(dropped.ruler.is_none());
    }

    #[test]
    fn offer_prefers_witnessed_lengths() {
        let mut best = ProcessBest::seeded(20, None);

        // A bare bound tightens the length but cannot win the election.
        best.offer(15, None);
        assert_eq!(best.len, 15);
        assert!(best.ruler.is_none());

        // A witness at the same length claims it.
        best.offer(15, Some(ruler(&[0, 1, 4, 9, 15])));
        assert_eq!(best.len, 15);
        assert!(best.ruler.is_some());

        // Worse offers change nothing.
        best.offer(16, Some(ruler(&[0, 1, 4, 9, 16])));
        assert_eq!(best.ruler.as_ref().unwrap().length, 15);

        // Strictly better witnesses replace.
        best.offer(11, Some(ruler(&[0, 1, 4, 9, 11])));
        assert_eq!(best.len, 11);
        assert_eq!(best.ruler.unwrap().length, 11);
    }

    #[test]
    fn final_message_reports_the_witness_or_the_bare_bound() {
        let with = ProcessBest::seeded(12, Some(ruler(&[0, 1, 3, 7, 12])));
        assert_eq!(
            with.to_message(),
            Message::FinalResult {
                best_len: 12,
                marks: vec![0, 1, 3, 7, 12],
            }
        );

        let without = ProcessBest::seeded(18, None);
        assert_eq!(
            without.to_message(),
            Message::FinalResult {
                best_len: 18,
                marks: vec![],
            }
        );
    }
}
