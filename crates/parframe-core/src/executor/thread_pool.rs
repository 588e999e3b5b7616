//! Persistent worker pool executor.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use super::{log_barrier, ExecOptions, Executor};
use crate::constants::WORKER_THREAD_PREFIX;
use crate::error::ParError;
use crate::task::{Task, Work};

/// Construction options for [`ThreadPool`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadPoolOptions {
    /// Worker count; 0 means the available parallelism.
    pub n_threads: usize,
    /// Spawn the workers now rather than on the first dispatch.
    pub start_on_construction: bool,
    /// Pin worker `i` to core `i mod n_cores`.
    pub pin_workers: bool,
    pub msg_on_start_up: bool,
    pub msg_on_shut_down: bool,
    pub msg_when_adding_tasks: bool,
}

impl Default for ThreadPoolOptions {
    fn default() -> Self {
        Self {
            n_threads: 0,
            start_on_construction: true,
            pin_workers: false,
            msg_on_start_up: false,
            msg_on_shut_down: false,
            msg_when_adding_tasks: false,
        }
    }
}

/// A persistent pool of named worker threads.
///
/// Each dispatch spawns one job per task into a scope on the pool and waits
/// for the scope to drain, so borrowed task state never outlives `execute`.
#[derive(Debug)]
pub struct ThreadPool {
    options: ThreadPoolOptions,
    n_threads: usize,
    pool: Mutex<Option<Arc<rayon::ThreadPool>>>,
}

impl ThreadPool {
    pub fn new(options: ThreadPoolOptions) -> Result<Self, ParError> {
        let n_threads = match options.n_threads {
            0 => std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get),
            n => n,
        };
        let this = Self {
            options,
            n_threads,
            pool: Mutex::new(None),
        };
        if this.options.start_on_construction {
            this.pool()?;
        }
        Ok(this)
    }

    /// A started pool of `n_threads` workers with default options.
    pub fn with_threads(n_threads: usize) -> Result<Self, ParError> {
        Self::new(ThreadPoolOptions {
            n_threads,
            ..ThreadPoolOptions::default()
        })
    }

    pub fn options(&self) -> &ThreadPoolOptions {
        &self.options
    }

    /// True once the workers have been spawned.
    pub fn is_started(&self) -> bool {
        self.pool.lock().is_some()
    }

    fn pool(&self) -> Result<Arc<rayon::ThreadPool>, ParError> {
        let mut slot = self.pool.lock();
        if let Some(pool) = slot.as_ref() {
            return Ok(Arc::clone(pool));
        }
        let pool = Arc::new(self.build()?);
        if self.options.msg_on_start_up {
            tracing::info!(threads = self.n_threads, "thread pool started");
        }
        *slot = Some(Arc::clone(&pool));
        Ok(pool)
    }

    fn build(&self) -> Result<rayon::ThreadPool, ParError> {
        let mut builder = rayon::ThreadPoolBuilder::new()
            .num_threads(self.n_threads)
            .thread_name(|i| format!("{WORKER_THREAD_PREFIX}-{i}"));

        if self.options.pin_workers {
            match core_affinity::get_core_ids() {
                Some(cores) if !cores.is_empty() => {
                    builder = builder.start_handler(move |i| {
                        let core = cores[i % cores.len()];
                        if !core_affinity::set_for_current(core) {
                            tracing::warn!(worker = i, core = core.id, "failed to pin worker");
                        }
                    });
                }
                _ => tracing::warn!("core ids unavailable, workers left unpinned"),
            }
        }

        builder
            .build()
            .map_err(|e| ParError::Executor(format!("failed to start thread pool: {e}")))
    }
}

impl Executor for ThreadPool {
    fn n_processing_elements(&self) -> usize {
        self.n_threads
    }

    fn execute<W: Work>(
        &self,
        tasks: &mut [Task<W>],
        _options: &ExecOptions,
    ) -> Result<(), ParError> {
        let pool = self.pool()?;
        let started = Instant::now();
        if self.options.msg_when_adding_tasks {
            tracing::info!(tasks = tasks.len(), "adding tasks to thread pool");
        }
        tracing::debug!(executor = self.name(), tasks = tasks.len(), "dispatch");

        pool.scope(|scope| {
            for task in tasks.iter_mut() {
                scope.spawn(move |_| task.run());
            }
        });

        log_barrier(self.name(), tasks, started);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "thread-pool"
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        if self.options.msg_on_shut_down && self.is_started() {
            tracing::info!(threads = self.n_threads, "thread pool shutting down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::test_support::square_tasks;
    use crate::task::{FnWork, TaskState};

    #[test]
    fn lazy_start() {
        let pool = ThreadPool::new(ThreadPoolOptions {
            n_threads: 2,
            start_on_construction: false,
            ..ThreadPoolOptions::default()
        })
        .unwrap();
        assert!(!pool.is_started());

        let mut tasks = square_tasks(2, None);
        pool.execute(&mut tasks, &ExecOptions::default()).unwrap();
        assert!(pool.is_started());
        assert!(tasks.iter().all(Task::is_finished));
    }

    #[test]
    fn zero_threads_uses_available_parallelism() {
        let pool = ThreadPool::with_threads(0).unwrap();
        assert!(pool.n_processing_elements() >= 1);
    }

    #[test]
    fn workers_are_named() {
        let pool = ThreadPool::with_threads(2).unwrap();
        let mut tasks: Vec<_> = (0..2)
            .map(|id| {
                Task::new(
                    id,
                    FnWork::new(|name: &mut String| {
                        *name = std::thread::current().name().unwrap_or_default().to_owned();
                    }),
                    String::new(),
                )
            })
            .collect();
        pool.execute(&mut tasks, &ExecOptions::default()).unwrap();
        for task in &tasks {
            assert!(task.result().get_or_wait().starts_with(WORKER_THREAD_PREFIX));
        }
    }

    #[test]
    fn pool_is_reused_across_batches() {
        let pool = ThreadPool::with_threads(3).unwrap();
        let mut tasks = square_tasks(6, None);
        for _ in 0..3 {
            for task in &mut tasks {
                task.reschedule();
            }
            pool.execute(&mut tasks, &ExecOptions::default()).unwrap();
            assert!(tasks.iter().all(Task::is_finished));
        }
        assert_eq!(tasks[5].result().get(), (25, true));
    }

    #[test]
    fn panic_stays_inside_the_barrier() {
        let pool = ThreadPool::with_threads(2).unwrap();
        let mut tasks = square_tasks(5, Some(4));
        pool.execute(&mut tasks, &ExecOptions::default()).unwrap();
        assert_eq!(tasks[4].state(), TaskState::Interrupted);
        assert!(!tasks[4].result().is_valid());
    }

    #[test]
    fn pinned_pool_still_runs() {
        let pool = ThreadPool::new(ThreadPoolOptions {
            n_threads: 2,
            pin_workers: true,
            msg_on_start_up: true,
            msg_on_shut_down: true,
            msg_when_adding_tasks: true,
            ..ThreadPoolOptions::default()
        })
        .unwrap();
        let mut tasks = square_tasks(2, None);
        pool.execute(&mut tasks, &ExecOptions::default()).unwrap();
        assert!(tasks.iter().all(Task::is_finished));
    }
}
