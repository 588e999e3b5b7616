//! Wire-level message types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Message tag used to match sends with receives.
pub type Tag = u32;

/// Tags at or above this value belong to the collectives.
pub const RESERVED_TAG_BASE: Tag = u32::MAX - 16;
pub(crate) const BROADCAST_TAG: Tag = RESERVED_TAG_BASE;
pub(crate) const REDUCE_TAG: Tag = RESERVED_TAG_BASE + 1;
pub(crate) const BARRIER_GATHER_TAG: Tag = RESERVED_TAG_BASE + 2;
pub(crate) const BARRIER_RELEASE_TAG: Tag = RESERVED_TAG_BASE + 3;

/// A serialized message in flight.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub src: usize,
    pub tag: Tag,
    pub payload: Vec<u8>,
}

impl Envelope {
    pub fn matches(&self, src: usize, tag: Tag) -> bool {
        self.src == src && self.tag == tag
    }
}

/// Control decision the master broadcasts so that every rank takes the same
/// branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlSignal {
    Continue,
    Restart,
    Stop,
    Converged,
}

impl fmt::Display for ControlSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Continue => "continue",
            Self::Restart => "restart",
            Self::Stop => "stop",
            Self::Converged => "converged",
        })
    }
}
