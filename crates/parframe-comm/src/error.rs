//! Communication error types.

use std::time::Duration;

use crate::message::Tag;

/// Transport failures between ranks.
#[derive(Debug, thiserror::Error)]
pub enum CommError {
    #[error("rank {rank} is out of range for a world of {size}")]
    InvalidRank { rank: usize, size: usize },

    #[error("a world needs at least one rank")]
    EmptyWorld,

    #[error("channel closed while talking to rank {0}")]
    Disconnected(usize),

    #[error("timed out after {timeout:?} waiting for tag {tag} from rank {src}")]
    Timeout {
        src: usize,
        tag: Tag,
        timeout: Duration,
    },

    #[error("tag {0} is reserved for collectives")]
    ReservedTag(Tag),

    #[error("message codec: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("failed to spawn rank {rank}: {reason}")]
    Spawn { rank: usize, reason: String },

    #[error("rank {0} panicked")]
    RankPanicked(usize),
}
