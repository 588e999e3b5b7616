//! # parframe-core
//!
//! Partitioned parallel execution: ranges and partitioners, tasks with
//! shareable result holders, interchangeable executors, and the
//! `parallel_for` / `parallel_reduce` algorithms built on them.

pub mod config;
pub mod constants;
pub mod dataset;
pub mod error;
pub mod executor;
pub mod parallel_for;
pub mod parallel_reduce;
pub mod partitioned;
pub mod partitioner;
pub mod range;
pub mod reduction;
pub mod result;
pub mod task;

// Re-exports
pub use config::{EngineConfig, ExecutorKind};
pub use constants::{exit_codes, DEFAULT_GRAIN_SIZE, DEFAULT_TOLERANCE};
pub use dataset::{DataSet, DenseDataSet};
pub use error::ParError;
pub use executor::{
    AnyExecutor, ExecOptions, Executor, ParallelLoopExecutor, Schedule, SequentialExecutor,
    ThreadPool, ThreadPoolOptions,
};
pub use parallel_for::{parallel_for, parallel_for_indexed};
pub use parallel_reduce::{parallel_reduce, parallel_reduce_indices};
pub use partitioned::{Partitioned, PartitionedRange, PartitionedVec};
pub use partitioner::{partition_len, partition_range, partition_range_with_grain};
pub use range::{Range1D, RangeIndex};
pub use reduction::{FnReduce, Max, Min, Product, ReductionOp, Sum};
pub use result::ResultHolder;
pub use task::{FnWork, Task, TaskState, Work};
