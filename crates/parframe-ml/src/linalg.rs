//! Dense linear-algebra kernels on the parallel engine.

use parframe_core::{
    parallel_for_indexed, parallel_reduce_indices, Executor, FnReduce, ParError, PartitionedRange,
    PartitionedVec,
};
use serde::{Deserialize, Serialize};

use crate::error::MlError;

/// `a · b` as a parallel reduction over the element indices.
pub fn parallel_dot<E: Executor>(a: &[f64], b: &[f64], executor: &E) -> Result<f64, MlError> {
    if a.len() != b.len() {
        return Err(ParError::SizeMismatch {
            expected: a.len(),
            actual: b.len(),
        }
        .into());
    }
    if a.is_empty() {
        return Ok(0.0);
    }

    let range = PartitionedRange::partitioned(a.len(), executor.n_processing_elements())?;
    let op = FnReduce::new(
        0.0,
        |&i: &usize, acc: &mut f64| *acc += a[i] * b[i],
        |acc: &mut f64, other: &f64| *acc += *other,
    );
    let (dot, valid) = parallel_reduce_indices(&range, &op, executor)?.get();
    if !valid {
        return Err(MlError::InvalidResult("dot product"));
    }
    Ok(dot)
}

/// Row-major matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseMatrix {
    n_rows: usize,
    n_cols: usize,
    values: Vec<f64>,
}

impl DenseMatrix {
    /// Build from equally wide rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, ParError> {
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut values = Vec::with_capacity(rows.len() * n_cols);
        for row in rows {
            if row.len() != n_cols {
                return Err(ParError::SizeMismatch {
                    expected: n_cols,
                    actual: row.len(),
                });
            }
            values.extend_from_slice(row);
        }
        Ok(Self {
            n_rows: rows.len(),
            n_cols,
            values,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.n_cols..(i + 1) * self.n_cols]
    }
}

/// `matrix · x`, one output element per row, computed with a parallel for
/// over the output vector.
pub fn parallel_matvec<E: Executor>(
    matrix: &DenseMatrix,
    x: &[f64],
    executor: &E,
) -> Result<Vec<f64>, MlError> {
    if matrix.n_cols() != x.len() {
        return Err(ParError::SizeMismatch {
            expected: matrix.n_cols(),
            actual: x.len(),
        }
        .into());
    }
    if matrix.n_rows() == 0 {
        return Ok(Vec::new());
    }

    let mut out = PartitionedVec::filled(matrix.n_rows(), 0.0);
    out.partition_into(executor.n_processing_elements())?;
    let done = parallel_for_indexed(
        &mut out,
        &|i: usize, y: &mut f64| {
            *y = matrix.row(i).iter().zip(x).map(|(m, v)| m * v).sum();
        },
        executor,
    )?;
    if !done.is_valid() {
        return Err(MlError::InvalidResult("matrix-vector product"));
    }
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parframe_core::{ParallelLoopExecutor, Schedule, SequentialExecutor, ThreadPool};

    #[test]
    fn dot_matches_serial() {
        let a: Vec<f64> = (0..101).map(f64::from).collect();
        let b: Vec<f64> = (0..101).map(|i| f64::from(i) * 0.5).collect();
        let expected: f64 = a.iter().zip(&b).map(|(x, y)| x * y).sum();
        let pool = ThreadPool::with_threads(4).unwrap();
        let dot = parallel_dot(&a, &b, &pool).unwrap();
        assert!((dot - expected).abs() < 1e-9);
    }

    #[test]
    fn dot_size_mismatch() {
        let err = parallel_dot(&[1.0, 2.0], &[1.0], &SequentialExecutor::new(1)).unwrap_err();
        assert!(matches!(
            err,
            MlError::Engine(ParError::SizeMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn empty_dot_is_zero() {
        assert_eq!(parallel_dot(&[], &[], &SequentialExecutor::new(2)).unwrap(), 0.0);
    }

    #[test]
    fn matvec() {
        let m = DenseMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        let exec = ParallelLoopExecutor::new(2, Schedule::Dynamic).unwrap();
        let y = parallel_matvec(&m, &[1.0, -1.0], &exec).unwrap();
        assert_eq!(y, vec![-1.0, -1.0, -1.0]);
    }

    #[test]
    fn ragged_matrix_rejected() {
        assert!(DenseMatrix::from_rows(&[vec![1.0], vec![1.0, 2.0]]).is_err());
    }
}
