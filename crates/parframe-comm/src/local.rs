//! In-process worlds: one thread per rank, one channel per ordered pair of
//! ranks.
//!
//! The sender half of the `src -> dest` channel lives only in rank `src`'s
//! endpoint, so when that rank returns or panics every receive waiting on it
//! fails with [`CommError::Disconnected`].

use std::collections::VecDeque;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::communicator::{check_rank, Communicator};
use crate::error::CommError;
use crate::message::{Envelope, Tag};

/// Prefix of rank thread names.
pub const RANK_THREAD_PREFIX: &str = "parframe-rank";

/// One rank's endpoint in a [`LocalWorld`].
#[derive(Debug)]
pub struct LocalCommunicator {
    rank: usize,
    /// `outboxes[dest]` feeds rank `dest`.
    outboxes: Vec<Sender<Envelope>>,
    /// `inboxes[src]` is fed only by rank `src`.
    inboxes: Vec<Receiver<Envelope>>,
    /// Messages already taken off a channel whose tag did not match yet.
    pending: Mutex<VecDeque<Envelope>>,
    receive_timeout: Option<Duration>,
}

impl LocalCommunicator {
    pub fn receive_timeout(&self) -> Option<Duration> {
        self.receive_timeout
    }

    fn take_pending(&self, src: usize, tag: Tag) -> Option<Envelope> {
        let mut pending = self.pending.lock();
        let pos = pending.iter().position(|e| e.matches(src, tag))?;
        pending.remove(pos)
    }

    fn next_envelope(&self, src: usize, tag: Tag, deadline: Option<Instant>) -> Result<Envelope, CommError> {
        let inbox = &self.inboxes[src];
        match deadline {
            None => inbox.recv().map_err(|_| CommError::Disconnected(src)),
            Some(deadline) => inbox.recv_deadline(deadline).map_err(|e| match e {
                RecvTimeoutError::Timeout => CommError::Timeout {
                    src,
                    tag,
                    timeout: self.receive_timeout.unwrap_or_default(),
                },
                RecvTimeoutError::Disconnected => CommError::Disconnected(src),
            }),
        }
    }
}

impl Communicator for LocalCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.outboxes.len()
    }

    fn send_bytes(&self, payload: Vec<u8>, dest: usize, tag: Tag) -> Result<(), CommError> {
        check_rank(dest, self.size())?;
        tracing::trace!(src = self.rank, dest, tag, bytes = payload.len(), "send");
        self.outboxes[dest]
            .send(Envelope {
                src: self.rank,
                tag,
                payload,
            })
            .map_err(|_| CommError::Disconnected(dest))
    }

    fn receive_bytes(&self, src: usize, tag: Tag) -> Result<Vec<u8>, CommError> {
        check_rank(src, self.size())?;
        if let Some(envelope) = self.take_pending(src, tag) {
            return Ok(envelope.payload);
        }

        let deadline = self.receive_timeout.map(|t| Instant::now() + t);
        loop {
            let envelope = self.next_envelope(src, tag, deadline)?;
            if envelope.matches(src, tag) {
                tracing::trace!(rank = self.rank, src, tag, "receive");
                return Ok(envelope.payload);
            }
            self.pending.lock().push_back(envelope);
        }
    }
}

/// A set of ranks connected by channels within one process.
///
/// # Example
/// ```
/// use parframe_comm::{Communicator, LocalWorld};
///
/// let sums = LocalWorld::run(3, |comm| {
///     comm.reduce(&(comm.rank() + 1), 0, |acc, x| *acc += *x).unwrap()
/// })
/// .unwrap();
/// assert_eq!(sums, vec![Some(6), None, None]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LocalWorld {
    size: usize,
    receive_timeout: Option<Duration>,
}

impl LocalWorld {
    pub fn new(size: usize) -> Result<Self, CommError> {
        if size == 0 {
            return Err(CommError::EmptyWorld);
        }
        Ok(Self {
            size,
            receive_timeout: None,
        })
    }

    /// Fail receives that wait longer than `timeout` instead of blocking
    /// forever.
    #[must_use]
    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = Some(timeout);
        self
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Connected endpoints, index `r` being rank `r`.
    pub fn communicators(&self) -> Vec<LocalCommunicator> {
        let n = self.size;
        let mut outboxes: Vec<Vec<Sender<Envelope>>> =
            (0..n).map(|_| Vec::with_capacity(n)).collect();
        let mut inboxes: Vec<Vec<Receiver<Envelope>>> =
            (0..n).map(|_| Vec::with_capacity(n)).collect();
        // Filled in (src, dest) order, so `outboxes[src][dest]` and
        // `inboxes[dest][src]` land at the right index.
        for src_outboxes in &mut outboxes {
            for dest_inboxes in &mut inboxes {
                let (tx, rx) = crossbeam_channel::unbounded();
                src_outboxes.push(tx);
                dest_inboxes.push(rx);
            }
        }

        outboxes
            .into_iter()
            .zip(inboxes)
            .enumerate()
            .map(|(rank, (outboxes, inboxes))| LocalCommunicator {
                rank,
                outboxes,
                inboxes,
                pending: Mutex::new(VecDeque::new()),
                receive_timeout: self.receive_timeout,
            })
            .collect()
    }

    /// Run `f` once per rank, each on its own named thread, and collect the
    /// outputs in rank order.
    pub fn launch<R, F>(&self, f: F) -> Result<Vec<R>, CommError>
    where
        R: Send,
        F: Fn(&LocalCommunicator) -> R + Sync,
    {
        tracing::debug!(ranks = self.size, "launching local world");
        let f = &f;
        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(self.size);
            for comm in self.communicators() {
                let rank = comm.rank;
                let handle = thread::Builder::new()
                    .name(format!("{RANK_THREAD_PREFIX}-{rank}"))
                    .spawn_scoped(scope, move || f(&comm))
                    .map_err(|e| CommError::Spawn {
                        rank,
                        reason: e.to_string(),
                    })?;
                handles.push(handle);
            }
            handles
                .into_iter()
                .enumerate()
                .map(|(rank, h)| h.join().map_err(|_| CommError::RankPanicked(rank)))
                .collect()
        })
    }

    /// Shorthand for `LocalWorld::new(n_ranks)?.launch(f)`.
    pub fn run<R, F>(n_ranks: usize, f: F) -> Result<Vec<R>, CommError>
    where
        R: Send,
        F: Fn(&LocalCommunicator) -> R + Sync,
    {
        Self::new(n_ranks)?.launch(f)
    }
}
