//! # parframe-comm
//!
//! Message passing between ranks: typed point-to-point messages, broadcast,
//! reduce, and barrier over a pluggable byte transport, plus an in-process
//! world that runs each rank on its own thread.

pub mod communicator;
pub mod error;
pub mod local;
pub mod message;

// Re-exports
pub use communicator::{Communicator, MASTER_RANK};
pub use error::CommError;
pub use local::{LocalCommunicator, LocalWorld};
pub use message::{ControlSignal, Tag};
