//! Executors: run a batch of tasks and return once all are terminal.
//!
//! Three backends share the [`Executor`] contract:
//! - [`SequentialExecutor`] runs tasks in id order on the calling thread.
//! - [`ThreadPool`] dispatches onto a persistent pool of named workers.
//! - [`ParallelLoopExecutor`] hands the batch to a parallel loop with a
//!   configurable schedule.
//!
//! [`AnyExecutor`] picks one at run time from an [`EngineConfig`].

mod parallel_loop;
mod sequential;
mod thread_pool;

pub use parallel_loop::ParallelLoopExecutor;
pub use sequential::SequentialExecutor;
pub use thread_pool::{ThreadPool, ThreadPoolOptions};

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, ExecutorKind};
use crate::error::ParError;
use crate::task::{Task, Work};

/// How a parallel loop hands out iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum Schedule {
    /// Let the loop runtime decide.
    #[default]
    Default,
    /// Contiguous blocks of `chunk` tasks per worker.
    Static { chunk: usize },
    /// One task at a time, handed to whichever worker is free.
    Dynamic,
}

impl Schedule {
    pub fn validate(self) -> Result<Self, ParError> {
        match self {
            Self::Static { chunk: 0 } => Err(ParError::Config(
                "Invalid scheduling type: static chunk must be positive".into(),
            )),
            other => Ok(other),
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::Static { chunk } => write!(f, "static({chunk})"),
            Self::Dynamic => f.write_str("dynamic"),
        }
    }
}

impl std::str::FromStr for Schedule {
    type Err = ParError;

    /// Accepts `default`, `dynamic`, `static` (chunk 1) and `static:<chunk>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let schedule = match s.split_once(':') {
            None if s == "default" => Self::Default,
            None if s == "dynamic" => Self::Dynamic,
            None if s == "static" => Self::Static { chunk: 1 },
            Some(("static", chunk)) => Self::Static {
                chunk: chunk.parse().map_err(|_| {
                    ParError::Config(format!("Invalid scheduling type: bad chunk '{chunk}'"))
                })?,
            },
            _ => return Err(ParError::Config(format!("Invalid scheduling type: '{s}'"))),
        };
        schedule.validate()
    }
}

/// Per-dispatch options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOptions {
    /// Overrides the executor's configured schedule. Ignored by backends
    /// that have no loop schedule.
    pub schedule: Option<Schedule>,
}

impl ExecOptions {
    #[must_use]
    pub fn with_schedule(schedule: Schedule) -> Self {
        Self {
            schedule: Some(schedule),
        }
    }
}

/// Runs tasks to a terminal state.
///
/// `execute` is a full barrier: when it returns, every task is `Finished` or
/// `Interrupted`, and each one ran exactly once. Errors are only returned for
/// problems detected before dispatch.
pub trait Executor: Sync {
    /// Number of workers, which is also the partition count the parallel
    /// algorithms require.
    fn n_processing_elements(&self) -> usize;

    fn execute<W: Work>(&self, tasks: &mut [Task<W>], options: &ExecOptions)
        -> Result<(), ParError>;

    fn name(&self) -> &'static str;
}

/// Executor chosen at run time.
#[derive(Debug)]
pub enum AnyExecutor {
    Sequential(SequentialExecutor),
    ThreadPool(ThreadPool),
    ParallelLoop(ParallelLoopExecutor),
}

impl AnyExecutor {
    /// Build the backend named by `config`. The config is normalized first.
    pub fn from_config(config: &EngineConfig) -> Result<Self, ParError> {
        let config = config.clone().normalize()?;
        let executor = match config.executor {
            ExecutorKind::Sequential => Self::Sequential(SequentialExecutor::new(config.threads)),
            ExecutorKind::ThreadPool => Self::ThreadPool(ThreadPool::new(ThreadPoolOptions {
                n_threads: config.threads,
                pin_workers: config.pin_workers,
                ..ThreadPoolOptions::default()
            })?),
            ExecutorKind::ParallelLoop => Self::ParallelLoop(ParallelLoopExecutor::new(
                config.threads,
                config.schedule,
            )?),
        };
        tracing::debug!(
            executor = executor.name(),
            workers = executor.n_processing_elements(),
            "executor ready"
        );
        Ok(executor)
    }
}

impl Executor for AnyExecutor {
    fn n_processing_elements(&self) -> usize {
        match self {
            Self::Sequential(e) => e.n_processing_elements(),
            Self::ThreadPool(e) => e.n_processing_elements(),
            Self::ParallelLoop(e) => e.n_processing_elements(),
        }
    }

    fn execute<W: Work>(
        &self,
        tasks: &mut [Task<W>],
        options: &ExecOptions,
    ) -> Result<(), ParError> {
        match self {
            Self::Sequential(e) => e.execute(tasks, options),
            Self::ThreadPool(e) => e.execute(tasks, options),
            Self::ParallelLoop(e) => e.execute(tasks, options),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Sequential(e) => e.name(),
            Self::ThreadPool(e) => e.name(),
            Self::ParallelLoop(e) => e.name(),
        }
    }
}

/// Log the barrier at the end of a dispatch.
pub(crate) fn log_barrier<W: Work>(executor: &str, tasks: &[Task<W>], started: Instant) {
    let finished = tasks.iter().filter(|t| t.is_finished()).count();
    tracing::debug!(
        executor,
        tasks = tasks.len(),
        finished,
        elapsed = ?started.elapsed(),
        "batch complete"
    );
}
