//! The rank-based message-passing interface.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CommError;
use crate::message::{
    Tag, BARRIER_GATHER_TAG, BARRIER_RELEASE_TAG, BROADCAST_TAG, REDUCE_TAG, RESERVED_TAG_BASE,
};

/// Rank that owns global state in master/worker protocols.
pub const MASTER_RANK: usize = 0;

/// Blocking point-to-point and collective operations among `size()` ranks.
///
/// Implementors supply the byte transport; the typed operations and the
/// collectives are provided on top of it. Every collective must be entered by
/// all ranks in the same order.
pub trait Communicator {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// Deliver `payload` to `dest`. Any tag is accepted, including the ones
    /// reserved for collectives.
    fn send_bytes(&self, payload: Vec<u8>, dest: usize, tag: Tag) -> Result<(), CommError>;

    /// Block until a message from `src` with `tag` arrives. Messages that
    /// arrive first but do not match are kept for later receives.
    fn receive_bytes(&self, src: usize, tag: Tag) -> Result<Vec<u8>, CommError>;

    fn is_master(&self) -> bool {
        self.rank() == MASTER_RANK
    }

    /// Serialize `value` and send it to `dest`.
    fn send<T: Serialize + ?Sized>(&self, value: &T, dest: usize, tag: Tag) -> Result<(), CommError> {
        if tag >= RESERVED_TAG_BASE {
            return Err(CommError::ReservedTag(tag));
        }
        self.send_bytes(serde_json::to_vec(value)?, dest, tag)
    }

    /// Receive and deserialize a value sent by `src` with `tag`.
    fn receive<T: DeserializeOwned>(&self, src: usize, tag: Tag) -> Result<T, CommError> {
        if tag >= RESERVED_TAG_BASE {
            return Err(CommError::ReservedTag(tag));
        }
        Ok(serde_json::from_slice(&self.receive_bytes(src, tag)?)?)
    }

    /// Overwrite `value` on every rank with the value held by `root`.
    fn broadcast<T>(&self, value: &mut T, root: usize) -> Result<(), CommError>
    where
        T: Serialize + DeserializeOwned,
    {
        check_rank(root, self.size())?;
        if self.rank() == root {
            let payload = serde_json::to_vec(value)?;
            for dest in (0..self.size()).filter(|&r| r != root) {
                self.send_bytes(payload.clone(), dest, BROADCAST_TAG)?;
            }
        } else {
            *value = serde_json::from_slice(&self.receive_bytes(root, BROADCAST_TAG)?)?;
        }
        Ok(())
    }

    /// Combine every rank's `local` value at `root` with `op`, folding in
    /// ascending rank order. Returns `Some` on the root and `None` elsewhere.
    fn reduce<T, F>(&self, local: &T, root: usize, op: F) -> Result<Option<T>, CommError>
    where
        T: Serialize + DeserializeOwned + Clone,
        F: Fn(&mut T, &T),
    {
        check_rank(root, self.size())?;
        if self.rank() != root {
            self.send_bytes(serde_json::to_vec(local)?, root, REDUCE_TAG)?;
            return Ok(None);
        }

        let mut global: Option<T> = None;
        for src in 0..self.size() {
            let value = if src == root {
                local.clone()
            } else {
                serde_json::from_slice(&self.receive_bytes(src, REDUCE_TAG)?)?
            };
            match global.as_mut() {
                Some(acc) => op(acc, &value),
                None => global = Some(value),
            }
        }
        Ok(global)
    }

    /// Block until every rank has entered the barrier.
    fn barrier(&self) -> Result<(), CommError> {
        if self.is_master() {
            for src in 1..self.size() {
                self.receive_bytes(src, BARRIER_GATHER_TAG)?;
            }
            for dest in 1..self.size() {
                self.send_bytes(Vec::new(), dest, BARRIER_RELEASE_TAG)?;
            }
        } else {
            self.send_bytes(Vec::new(), MASTER_RANK, BARRIER_GATHER_TAG)?;
            self.receive_bytes(MASTER_RANK, BARRIER_RELEASE_TAG)?;
        }
        Ok(())
    }
}

/// Fail with [`CommError::InvalidRank`] unless `rank < size`.
pub fn check_rank(rank: usize, size: usize) -> Result<(), CommError> {
    if rank >= size {
        return Err(CommError::InvalidRank { rank, size });
    }
    Ok(())
}
