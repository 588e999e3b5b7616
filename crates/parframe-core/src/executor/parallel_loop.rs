//! Directive-style executor: the task list is handed to a parallel loop.

use std::time::Instant;

use rayon::prelude::*;

use super::{log_barrier, ExecOptions, Executor, Schedule};
use crate::constants::WORKER_THREAD_PREFIX;
use crate::error::ParError;
use crate::task::{Task, Work};

/// Treats the task list as the body of a parallel loop.
///
/// The loop runs on a dedicated set of `n_threads` workers. The schedule
/// given at construction applies unless a dispatch overrides it.
#[derive(Debug)]
pub struct ParallelLoopExecutor {
    pool: rayon::ThreadPool,
    n_threads: usize,
    schedule: Schedule,
}

impl ParallelLoopExecutor {
    /// `n_threads == 0` means the available parallelism.
    pub fn new(n_threads: usize, schedule: Schedule) -> Result<Self, ParError> {
        let schedule = schedule.validate()?;
        let n_threads = match n_threads {
            0 => std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get),
            n => n,
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .thread_name(|i| format!("{WORKER_THREAD_PREFIX}-loop-{i}"))
            .build()
            .map_err(|e| ParError::Executor(format!("failed to start loop workers: {e}")))?;
        Ok(Self {
            pool,
            n_threads,
            schedule,
        })
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }
}

impl Executor for ParallelLoopExecutor {
    fn n_processing_elements(&self) -> usize {
        self.n_threads
    }

    fn execute<W: Work>(
        &self,
        tasks: &mut [Task<W>],
        options: &ExecOptions,
    ) -> Result<(), ParError> {
        let schedule = options.schedule.unwrap_or(self.schedule).validate()?;
        let started = Instant::now();
        tracing::debug!(
            executor = self.name(),
            tasks = tasks.len(),
            %schedule,
            "dispatch"
        );

        self.pool.install(|| match schedule {
            Schedule::Default => tasks.par_iter_mut().for_each(Task::run),
            Schedule::Static { chunk } => tasks
                .par_chunks_mut(chunk)
                .for_each(|block| block.iter_mut().for_each(Task::run)),
            Schedule::Dynamic => tasks.par_iter_mut().with_max_len(1).for_each(Task::run),
        });

        log_barrier(self.name(), tasks, started);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "parallel-loop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::test_support::square_tasks;
    use crate::task::TaskState;

    #[test]
    fn every_schedule_runs_every_task_once() {
        let exec = ParallelLoopExecutor::new(3, Schedule::Default).unwrap();
        for schedule in [
            Schedule::Default,
            Schedule::Static { chunk: 1 },
            Schedule::Static { chunk: 4 },
            Schedule::Dynamic,
        ] {
            let mut tasks = square_tasks(10, None);
            exec.execute(&mut tasks, &ExecOptions::with_schedule(schedule))
                .unwrap();
            let values: Vec<u64> = tasks.iter().map(|t| t.result().get().0).collect();
            let expected: Vec<u64> = (0..10).map(|i| i * i).collect();
            assert_eq!(values, expected, "{schedule}");
        }
    }

    #[test]
    fn invalid_schedule_rejected_before_dispatch() {
        assert!(ParallelLoopExecutor::new(2, Schedule::Static { chunk: 0 }).is_err());

        let exec = ParallelLoopExecutor::new(2, Schedule::Dynamic).unwrap();
        let mut tasks = square_tasks(2, None);
        let err = exec
            .execute(
                &mut tasks,
                &ExecOptions::with_schedule(Schedule::Static { chunk: 0 }),
            )
            .unwrap_err();
        assert!(matches!(err, ParError::Config(_)));
        assert!(tasks.iter().all(|t| t.state() == TaskState::Pending));
    }

    #[test]
    fn configured_schedule_is_default() {
        let exec = ParallelLoopExecutor::new(2, Schedule::Static { chunk: 2 }).unwrap();
        assert_eq!(exec.schedule(), Schedule::Static { chunk: 2 });
        let mut tasks = square_tasks(3, Some(1));
        exec.execute(&mut tasks, &ExecOptions::default()).unwrap();
        assert_eq!(tasks[1].state(), TaskState::Interrupted);
        assert!(tasks[0].is_finished() && tasks[2].is_finished());
    }
}
