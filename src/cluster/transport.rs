//! Transport seam between processes.
//!
//! The coordinator speaks to its peers only through [`Fabric`], a
//! mailbox abstraction: ranked endpoints exchanging whole frames. The
//! crate ships [`MemoryFabric`], an in-process implementation over
//! channels, which backs [`run_local_cluster`](super::run_local_cluster)
//! and the protocol tests; a deployment over a real interconnect plugs
//! its own implementation into the same trait.
//!
//! Delivery guarantees the protocol relies on: frames from one sender
//! to one receiver arrive in order and unmodified; `recv` blocks until
//! a frame arrives or every peer is gone.

use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::Mutex;

use super::ClusterError;

/// Ranked frame mailbox connecting `size()` peers.
pub trait Fabric {
    /// This endpoint's rank, `0..size()`.
    fn rank(&self) -> usize;

    /// Number of peers in the group.
    fn size(&self) -> usize;

    /// Queues a frame to `to`. Never blocks on the receiver.
    fn send(&self, to: usize, frame: Vec<u8>) -> Result<(), ClusterError>;

    /// Blocks until the next frame arrives; returns `(sender, frame)`.
    fn recv(&self) -> Result<(usize, Vec<u8>), ClusterError>;

    /// Non-blocking poll for a pending frame.
    fn try_recv(&self) -> Result<Option<(usize, Vec<u8>)>, ClusterError>;
}

/// In-process fabric: one unbounded channel per rank.
pub struct MemoryFabric {
    rank: usize,
    peers: Vec<Sender<(usize, Vec<u8>)>>,
    // Mutex so the endpoint stays Sync; only its owning agent receives.
    inbox: Mutex<Receiver<(usize, Vec<u8>)>>,
}

impl MemoryFabric {
    /// Builds a fully-connected group of `size` endpoints.
    pub fn group(size: usize) -> Vec<MemoryFabric> {
        assert!(size > 0, "fabric needs at least one endpoint");
        let mut senders = Vec::with_capacity(size);
        let mut inboxes = Vec::with_capacity(size);
        for _ in 0..size {
            let (tx, rx) = channel();
            senders.push(tx);
            inboxes.push(rx);
        }
        inboxes
            .into_iter()
            .enumerate()
            .map(|(rank, rx)| MemoryFabric {
                rank,
                peers: senders.clone(),
                inbox: Mutex::new(rx),
            })
            .collect()
    }
}

impl Fabric for MemoryFabric {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.peers.len()
    }

    fn send(&self, to: usize, frame: Vec<u8>) -> Result<(), ClusterError> {
        let peer = self.peers.get(to).ok_or(ClusterError::UnknownRank {
            rank: to,
            size: self.peers.len(),
        })?;
        peer.send((self.rank, frame))
            .map_err(|_| ClusterError::Disconnected)
    }

    fn recv(&self) -> Result<(usize, Vec<u8>), ClusterError> {
        self.inbox
            .lock()
            .expect("inbox mutex poisoned")
            .recv()
            .map_err(|_| ClusterError::Disconnected)
    }

    fn try_recv(&self) -> Result<Option<(usize, Vec<u8>)>, ClusterError> {
        match self.inbox.lock().expect("inbox mutex poisoned").try_recv() {
            Ok(pair) => Ok(Some(pair)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(ClusterError::Disconnected),
        }
    }
}
