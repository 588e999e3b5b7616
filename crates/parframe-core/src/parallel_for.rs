//! Apply a body to every element of a partitioned container.

use crate::error::ParError;
use crate::executor::{ExecOptions, Executor};
use crate::partitioned::{Partitioned, PartitionedVec};
use crate::result::ResultHolder;
use crate::task::{all_finished, Task, Work};

struct ForPartition<'a, T, F> {
    offset: usize,
    slice: &'a mut [T],
    body: &'a F,
}

impl<T, F> Work for ForPartition<'_, T, F>
where
    T: Send,
    F: Fn(usize, &mut T) + Sync,
{
    type Output = ();

    fn run(&mut self, _output: &mut ()) {
        for (i, item) in self.slice.iter_mut().enumerate() {
            (self.body)(self.offset + i, item);
        }
    }
}

/// Apply `body` in place to every element, one task per partition.
///
/// The container's partition count must equal the executor's processing
/// element count. The returned holder is valid iff every task finished.
///
/// # Example
/// ```
/// use parframe_core::executor::ThreadPool;
/// use parframe_core::parallel_for::parallel_for;
/// use parframe_core::partitioned::PartitionedVec;
///
/// let pool = ThreadPool::with_threads(4).unwrap();
/// let mut data = PartitionedVec::filled(100, 0u32);
/// data.partition_into(4).unwrap();
///
/// let done = parallel_for(&mut data, &|x: &mut u32| *x += 1, &pool).unwrap();
/// assert!(done.is_valid());
/// assert!(data.iter().all(|&x| x == 1));
/// ```
pub fn parallel_for<T, F, E>(
    container: &mut PartitionedVec<T>,
    body: &F,
    executor: &E,
) -> Result<ResultHolder<()>, ParError>
where
    T: Send,
    F: Fn(&mut T) + Sync,
    E: Executor,
{
    parallel_for_indexed(container, &|_, item: &mut T| body(item), executor)
}

/// Like [`parallel_for`], passing each element's global index to `body`.
pub fn parallel_for_indexed<T, F, E>(
    container: &mut PartitionedVec<T>,
    body: &F,
    executor: &E,
) -> Result<ResultHolder<()>, ParError>
where
    T: Send,
    F: Fn(usize, &mut T) + Sync,
    E: Executor,
{
    container.check_partitions(executor.n_processing_elements())?;

    let offsets: Vec<usize> = container.partitions().iter().map(|p| p.begin()).collect();
    let mut tasks: Vec<Task<ForPartition<'_, T, F>>> = container
        .partition_slices_mut()
        .into_iter()
        .zip(offsets)
        .enumerate()
        .map(|(id, (slice, offset))| Task::new(id, ForPartition { offset, slice, body }, ()))
        .collect();

    executor.execute(&mut tasks, &ExecOptions::default())?;

    let done = ResultHolder::new(());
    if all_finished(&tasks) {
        done.validate();
    } else {
        tracing::warn!(executor = executor.name(), "parallel_for: not every task finished");
    }
    Ok(done)
}
