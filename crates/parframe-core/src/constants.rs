//! Engine-wide defaults.

/// Default grain size of a [`Range1D`](crate::range::Range1D).
pub const DEFAULT_GRAIN_SIZE: usize = 1;

/// Default tolerance used by iterative algorithms and tie-breaking.
pub const DEFAULT_TOLERANCE: f64 = 1.0e-8;

/// Prefix of the names given to thread-pool workers.
pub const WORKER_THREAD_PREFIX: &str = "parframe-worker";

/// Exit codes used by the command-line driver.
pub mod exit_codes {
    /// Successful execution.
    pub const SUCCESS: i32 = 0;
    /// Generic error.
    pub const ERROR_GENERIC: i32 = 1;
    /// The computed result was invalid (a task did not finish).
    pub const ERROR_INVALID_RESULT: i32 = 2;
    /// Communication between ranks failed.
    pub const ERROR_COMMUNICATION: i32 = 3;
    /// Invalid configuration.
    pub const ERROR_CONFIG: i32 = 4;
}
