//! Error type shared by the engine.

/// Errors surfaced by the engine before any task is dispatched.
///
/// Failures inside a running task never produce a `ParError`; they leave the
/// task's result holder invalid instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParError {
    /// An argument violated a precondition (zero partitions, empty range, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A partitioned object was missing partitions or had the wrong count.
    #[error("{0}")]
    InvalidPartitionedObject(String),

    /// Two collections that must agree in length do not.
    #[error("size mismatch: expected {expected}, got {actual}")]
    SizeMismatch {
        /// Length required by the operation.
        expected: usize,
        /// Length that was supplied.
        actual: usize,
    },

    /// The executor could not be created or rejected its options.
    #[error("executor error: {0}")]
    Executor(String),

    /// Invalid engine configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ParError {
    /// Error raised when a partitioned object carries no partitions.
    #[must_use]
    pub fn missing_partitions() -> Self {
        Self::InvalidPartitionedObject("The given range does not have partitions".into())
    }

    /// Error raised when the partition count disagrees with the executor.
    #[must_use]
    pub fn partition_count(actual: usize, expected: usize) -> Self {
        Self::InvalidPartitionedObject(format!(
            "Invalid number of partitions: {actual} should be: {expected}"
        ))
    }
}
