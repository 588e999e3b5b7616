//! Synthetic datasets for the driver's workloads.

use parframe_core::{DenseDataSet, ParError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Spacing between neighbouring blob centers.
const BLOB_SPACING: f64 = 10.0;

/// `n` two-dimensional points in `k` square blobs of half-width 1, centered
/// on the diagonal `BLOB_SPACING` apart. Point `i` belongs to blob `i % k`,
/// which is also its label.
pub fn blobs(n: usize, k: usize, seed: u64) -> Result<DenseDataSet, ParError> {
    if k == 0 {
        return Err(ParError::InvalidArgument("blobs need at least one center".into()));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);
    for i in 0..n {
        let blob = i % k;
        let center = blob as f64 * BLOB_SPACING;
        rows.push(vec![
            center + rng.gen_range(-1.0..1.0),
            center + rng.gen_range(-1.0..1.0),
        ]);
        labels.push(blob as f64);
    }
    DenseDataSet::from_rows(rows, labels)
}

/// `n` samples of `y = intercept + slope·x` for `x` in `[0, 1)`, with
/// uniform noise of amplitude `noise`.
pub fn linear(
    n: usize,
    intercept: f64,
    slope: f64,
    noise: f64,
    seed: u64,
) -> Result<DenseDataSet, ParError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);
    for _ in 0..n {
        let x: f64 = rng.gen();
        let jitter = if noise > 0.0 {
            rng.gen_range(-noise..noise)
        } else {
            0.0
        };
        rows.push(vec![x]);
        labels.push(intercept + slope * x + jitter);
    }
    DenseDataSet::from_rows(rows, labels)
}
