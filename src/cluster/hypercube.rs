//! Hypercube collectives.
//!
//! Classic dimension-ordered exchanges: in round `d` each rank talks to
//! `rank XOR 2^d`, so after `log2(P)` rounds an all-reduce has carried
//! every contribution to every rank. Requires a power-of-two group.
//!
//! Ranks may progress through rounds at different speeds, so a frame
//! for a later round can arrive before the one currently awaited; such
//! frames are stashed and replayed when their round comes up. Each
//! collective invocation gets a fresh round namespace, which keeps
//! back-to-back collectives from aliasing as long as all ranks issue
//! the same operation sequence.

use super::transport::Fabric;
use super::wire::Message;
use super::ClusterError;

/// Rounds reserved per collective invocation; one per dimension, and a
/// group can never have more dimensions than `usize` has bits.
const ROUNDS_PER_OP: u32 = 64;

/// Collective operations over a power-of-two fabric.
///
/// Ranks leave a collective at different times, so frames from a peer
/// that has already moved on to the point-to-point protocol can land
/// mid-collective; they are set aside in order and handed back through
/// [`into_foreign`](Self::into_foreign) for the caller to replay.
pub struct Collectives<'a, F: Fabric> {
    fabric: &'a F,
    dims: u32,
    phase: u32,
    stash: Vec<(usize, u32, u32)>,
    foreign: Vec<(usize, Message)>,
}

impl<'a, F: Fabric> Collectives<'a, F> {
    /// Fails unless the group size is a power of two.
    pub fn new(fabric: &'a F) -> Result<Self, ClusterError> {
        let size = fabric.size();
        if !size.is_power_of_two() {
            return Err(ClusterError::NotPowerOfTwo { size });
        }
        Ok(Self {
            fabric,
            dims: size.trailing_zeros(),
            phase: 0,
            stash: Vec::new(),
            foreign: Vec::new(),
        })
    }

    /// Non-collective messages that arrived mid-collective, in arrival
    /// order. The caller must process these before receiving from the
    /// fabric again, or protocol messages would be reordered.
    pub fn into_foreign(self) -> Vec<(usize, Message)> {
        self.foreign
    }

    /// Global minimum of every rank's `value`.
    pub fn all_reduce_min(&mut self, value: u32) -> Result<u32, ClusterError> {
        let base = self.next_phase();
        let rank = self.fabric.rank();
        let mut result = value;

        for d in 0..self.dims {
            let partner = rank ^ (1 << d);
            let round = base + d;
            self.fabric
                .send(partner, Message::Collective { round, value: result }.encode())?;
            let received = self.recv_round(partner, round)?;
            result = result.min(received);
        }
        Ok(result)
    }

    /// Distributes `root`'s `value` to every rank; returns it.
    pub fn broadcast(&mut self, value: u32, root: usize) -> Result<u32, ClusterError> {
        let base = self.next_phase();
        let rank = self.fabric.rank();
        let mut result = value;

        for d in (0..self.dims).rev() {
            let mask = (1usize << (d + 1)) - 1;
            let partner = rank ^ (1 << d);
            let round = base + d;
            if rank & mask == root & mask {
                self.fabric
                    .send(partner, Message::Collective { round, value: result }.encode())?;
            } else if rank & mask == (root ^ (1 << d)) & mask {
                result = self.recv_round(partner, round)?;
            }
        }
        Ok(result)
    }

    fn next_phase(&mut self) -> u32 {
        let base = self.phase;
        self.phase += ROUNDS_PER_OP;
        base
    }

    /// The round-`round` frame from `from`, replaying the stash first.
    fn recv_round(&mut self, from: usize, round: u32) -> Result<u32, ClusterError> {
        if let Some(i) = self
            .stash
            .iter()
            .position(|&(f, r, _)| f == from && r == round)
        {
            return Ok(self.stash.swap_remove(i).2);
        }

        loop {
            let (sender, frame) = self.fabric.recv()?;
            match Message::decode(&frame)? {
                Message::Collective { round: r, value } => {
                    if sender == from && r == round {
                        return Ok(value);
                    }
                    self.stash.push((sender, r, value));
                }
                other => self.foreign.push((sender, other)),
            }
        }
    }
}
