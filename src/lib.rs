//! Shared fixtures for the cross-crate integration tests.

use std::time::Duration;

use parframe_comm::{CommError, LocalWorld};
use parframe_core::{DenseDataSet, FnWork, ParError, Task};

/// Receive timeout for test worlds, so a protocol bug fails instead of
/// hanging.
pub const TEST_RECEIVE_TIMEOUT: Duration = Duration::from_secs(10);

/// An in-process world of `n` ranks with [`TEST_RECEIVE_TIMEOUT`].
pub fn world(n: usize) -> Result<LocalWorld, CommError> {
    Ok(LocalWorld::new(n)?.with_receive_timeout(TEST_RECEIVE_TIMEOUT))
}

/// `per_blob` points on a 0.1-spaced grid around each center. Row `i`
/// belongs to center `i / per_blob`.
pub fn grid_blobs(centers: &[(f64, f64)], per_blob: usize) -> Result<DenseDataSet, ParError> {
    let mut rows = Vec::with_capacity(centers.len() * per_blob);
    for &(cx, cy) in centers {
        for i in 0..per_blob {
            let dx = (i % 4) as f64 * 0.1 - 0.15;
            let dy = (i / 4) as f64 * 0.1 - 0.15;
            rows.push(vec![cx + dx, cy + dy]);
        }
    }
    DenseDataSet::unlabeled(rows)
}

/// `n` copies of the same point.
pub fn identical_points(n: usize, point: &[f64]) -> Result<DenseDataSet, ParError> {
    DenseDataSet::unlabeled(vec![point.to_vec(); n])
}

/// Boxed work type produced by [`counting_tasks`].
pub type CountingWork = FnWork<Box<dyn FnMut(&mut u64) + Send>, u64>;

/// `n` tasks where task `i` outputs `i + 1`, except `fail`, which panics.
pub fn counting_tasks(n: usize, fail: Option<usize>) -> Vec<Task<CountingWork>> {
    (0..n)
        .map(|id| {
            let work: Box<dyn FnMut(&mut u64) + Send> = Box::new(move |out: &mut u64| {
                assert!(Some(id) != fail, "task {id} failed");
                *out = id as u64 + 1;
            });
            Task::new(id, FnWork::new(work), 0)
        })
        .collect()
}
