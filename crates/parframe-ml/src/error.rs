//! Error types for the learning algorithms.

use parframe_comm::CommError;
use parframe_core::ParError;

/// Errors raised by the learning algorithms.
#[derive(Debug, thiserror::Error)]
pub enum MlError {
    #[error(transparent)]
    Engine(#[from] ParError),

    #[error(transparent)]
    Comm(#[from] CommError),

    #[error("Incorrect number of clusters specified {0} should be greater than zero")]
    NoClusters(usize),

    #[error("Incorrect number of clusters specified {got} should be equal to {expected}")]
    InitMismatch { got: usize, expected: usize },

    #[error("cannot pick {k} distinct centroids from {rows} rows")]
    NotEnoughRows { rows: usize, k: usize },

    #[error("centroid has {got} features, dataset has {expected}")]
    FeatureMismatch { got: usize, expected: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    /// A parallel step finished with an invalid result.
    #[error("{0} produced an invalid result")]
    InvalidResult(&'static str),
}
