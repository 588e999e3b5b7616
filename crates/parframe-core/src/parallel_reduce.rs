//! Reduce a partitioned container with an associative operator.

use crate::error::ParError;
use crate::executor::{ExecOptions, Executor};
use crate::partitioned::{Partitioned, PartitionedRange, PartitionedVec};
use crate::range::Range1D;
use crate::reduction::ReductionOp;
use crate::result::ResultHolder;
use crate::task::{all_finished, Task, Work};

struct ReduceSlice<'a, R: ReductionOp> {
    items: &'a [R::Item],
    op: &'a R,
}

impl<R> Work for ReduceSlice<'_, R>
where
    R: ReductionOp,
    R::Item: Sync,
{
    type Output = R::Value;

    fn run(&mut self, acc: &mut R::Value) {
        for item in self.items {
            self.op.local_join(item, acc);
        }
    }
}

struct ReduceIndices<'a, R> {
    range: Range1D,
    op: &'a R,
}

impl<R> Work for ReduceIndices<'_, R>
where
    R: ReductionOp<Item = usize>,
{
    type Output = R::Value;

    fn run(&mut self, acc: &mut R::Value) {
        for index in self.range {
            self.op.local_join(&index, acc);
        }
    }
}

/// Reduce every element of `container` with `op`.
///
/// One task per partition folds its elements starting from the operator's
/// identity; the per-partition values are then combined in ascending
/// partition order. The result is invalid if any task did not finish.
///
/// # Example
/// ```
/// use parframe_core::executor::ThreadPool;
/// use parframe_core::parallel_reduce::parallel_reduce;
/// use parframe_core::partitioned::PartitionedVec;
/// use parframe_core::reduction::Sum;
///
/// let pool = ThreadPool::with_threads(2).unwrap();
/// let mut ones = PartitionedVec::filled(100, 1u64);
/// ones.partition_into(2).unwrap();
///
/// let total = parallel_reduce(&ones, &Sum::new(), &pool).unwrap();
/// assert_eq!(total.get(), (100, true));
/// ```
pub fn parallel_reduce<R, E>(
    container: &PartitionedVec<R::Item>,
    op: &R,
    executor: &E,
) -> Result<ResultHolder<R::Value>, ParError>
where
    R: ReductionOp,
    R::Item: Sync,
    E: Executor,
{
    container.check_partitions(executor.n_processing_elements())?;

    let mut tasks: Vec<_> = (0..container.n_partitions())
        .map(|id| {
            let items = container.partition_slice(id).unwrap_or_default();
            Task::new(id, ReduceSlice { items, op }, op.identity())
        })
        .collect();

    executor.execute(&mut tasks, &ExecOptions::default())?;
    Ok(fold_results(&tasks, op, executor.name()))
}

/// Reduce over the indices of a [`PartitionedRange`], for algorithms whose
/// data lives outside the container (dataset rows, matrix rows).
pub fn parallel_reduce_indices<R, E>(
    range: &PartitionedRange,
    op: &R,
    executor: &E,
) -> Result<ResultHolder<R::Value>, ParError>
where
    R: ReductionOp<Item = usize>,
    E: Executor,
{
    range.check_partitions(executor.n_processing_elements())?;

    let mut tasks: Vec<_> = range
        .partitions()
        .iter()
        .enumerate()
        .map(|(id, &range)| Task::new(id, ReduceIndices { range, op }, op.identity()))
        .collect();

    executor.execute(&mut tasks, &ExecOptions::default())?;
    Ok(fold_results(&tasks, op, executor.name()))
}

fn fold_results<W, R>(tasks: &[Task<W>], op: &R, executor: &str) -> ResultHolder<R::Value>
where
    W: Work<Output = R::Value>,
    R: ReductionOp,
{
    let result = ResultHolder::new(op.identity());
    if !all_finished(tasks) {
        tracing::warn!(executor, "parallel_reduce: not every task finished, result invalid");
        return result;
    }
    for task in tasks {
        result.join_with(task.result(), op);
    }
    result.validate();
    tracing::trace!(executor, partitions = tasks.len(), "reduction joined");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ParallelLoopExecutor, Schedule, SequentialExecutor, ThreadPool};
    use crate::reduction::{FnReduce, Max, Sum};

    #[test]
    fn sum_of_ones_independent_of_partition_count() {
        for n in [1, 2, 4] {
            let pool = ThreadPool::with_threads(n).unwrap();
            let mut ones = PartitionedVec::filled(100, 1i64);
            ones.partition_into(n).unwrap();
            let total = parallel_reduce(&ones, &Sum::new(), &pool).unwrap();
            assert_eq!(total.get(), (100, true), "{n} partitions");
        }
    }

    #[test]
    fn partitions_joined_in_order() {
        // String concatenation is associative but not commutative.
        let op = FnReduce::new(
            String::new(),
            |c: &char, acc: &mut String| acc.push(*c),
            |acc: &mut String, other: &String| acc.push_str(other),
        );
        let exec = ParallelLoopExecutor::new(3, Schedule::Dynamic).unwrap();
        let mut letters = PartitionedVec::new("abcdefgh".chars().collect::<Vec<char>>());
        letters.partition_into(3).unwrap();
        let joined = parallel_reduce(&letters, &op, &exec).unwrap();
        assert_eq!(joined.get(), ("abcdefgh".to_owned(), true));
    }

    #[test]
    fn max_over_floats() {
        let exec = SequentialExecutor::new(2);
        let mut data = PartitionedVec::new(vec![0.5f64, -3.0, 9.25, 1.0]);
        data.partition_into(2).unwrap();
        let (max, valid) = parallel_reduce(&data, &Max::new(), &exec).unwrap().get();
        assert!(valid);
        assert!((max - 9.25).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_container_errors() {
        let exec = SequentialExecutor::new(1);
        let empty: PartitionedVec<u32> = PartitionedVec::default();
        let err = parallel_reduce(&empty, &Sum::new(), &exec).unwrap_err();
        assert_eq!(err.to_string(), "The given range does not have partitions");
    }

    #[test]
    fn wrong_partition_count_errors() {
        let exec = SequentialExecutor::new(4);
        let mut data = PartitionedVec::filled(8, 1u32);
        data.partition_into(2).unwrap();
        assert_eq!(
            parallel_reduce(&data, &Sum::new(), &exec).unwrap_err(),
            ParError::partition_count(2, 4)
        );
    }

    #[test]
    fn failing_partition_invalidates_aggregate() {
        let op = FnReduce::new(
            0u32,
            |x: &u32, acc: &mut u32| {
                assert!(*x < 100, "item out of range");
                *acc += x;
            },
            |acc: &mut u32, other: &u32| *acc += other,
        );
        let exec = ThreadPool::with_threads(2).unwrap();
        let mut data = PartitionedVec::new(vec![1, 2, 3, 500]);
        data.partition_into(2).unwrap();
        let result = parallel_reduce(&data, &op, &exec).unwrap();
        assert!(!result.is_valid());
    }

    #[test]
    fn index_reduction() {
        let exec = ThreadPool::with_threads(3).unwrap();
        let range = PartitionedRange::partitioned(10, 3).unwrap();
        let op = FnReduce::new(
            0usize,
            |i: &usize, acc: &mut usize| *acc += i * i,
            |acc: &mut usize, other: &usize| *acc += other,
        );
        let result = parallel_reduce_indices(&range, &op, &exec).unwrap();
        assert_eq!(result.get(), ((0..10).map(|i| i * i).sum::<usize>(), true));
    }
}
