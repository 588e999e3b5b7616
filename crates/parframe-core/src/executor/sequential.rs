//! Reference executor that runs every task on the calling thread.

use std::time::Instant;

use super::{log_barrier, ExecOptions, Executor};
use crate::error::ParError;
use crate::task::{Task, Work};

/// Runs every task on the calling thread in id order.
///
/// Reports `lanes` processing elements so that data partitioned for a
/// parallel backend can be replayed deterministically.
#[derive(Debug, Clone, Copy)]
pub struct SequentialExecutor {
    lanes: usize,
}

impl SequentialExecutor {
    /// `lanes == 0` is treated as one lane.
    #[must_use]
    pub fn new(lanes: usize) -> Self {
        Self {
            lanes: lanes.max(1),
        }
    }
}

impl Default for SequentialExecutor {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Executor for SequentialExecutor {
    fn n_processing_elements(&self) -> usize {
        self.lanes
    }

    fn execute<W: Work>(
        &self,
        tasks: &mut [Task<W>],
        _options: &ExecOptions,
    ) -> Result<(), ParError> {
        let started = Instant::now();
        tracing::debug!(executor = self.name(), tasks = tasks.len(), "dispatch");
        tasks.sort_by_key(Task::id);
        for task in tasks.iter_mut() {
            task.run();
        }
        log_barrier(self.name(), tasks, started);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sequential"
    }
}
