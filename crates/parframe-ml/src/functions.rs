//! Model hypotheses and the error functions minimized over them.

use parframe_core::{
    parallel_reduce_indices, DataSet, Executor, FnReduce, ParError, PartitionedRange,
    ResultHolder,
};
use serde::{Deserialize, Serialize};

use crate::error::MlError;

/// A model parameterized by a coefficient vector.
pub trait Hypothesis: Sync {
    fn n_coeffs(&self) -> usize;

    fn coeffs(&self) -> &[f64];

    fn set_coeffs(&mut self, coeffs: Vec<f64>) -> Result<(), MlError>;

    /// Prediction for one feature row.
    fn value(&self, row: &[f64]) -> f64;

    /// Partial derivatives of [`value`](Hypothesis::value) with respect to
    /// each coefficient at `row`.
    fn coeff_gradients(&self, row: &[f64]) -> Vec<f64>;
}

/// `h(x) = c0 + c1·x1 + … + cn·xn`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearHypothesis {
    coeffs: Vec<f64>,
}

impl LinearHypothesis {
    /// All-zero coefficients for rows of `n_features` values.
    #[must_use]
    pub fn zeros(n_features: usize) -> Self {
        Self {
            coeffs: vec![0.0; n_features + 1],
        }
    }

    /// Bias first, then one weight per feature.
    pub fn with_coeffs(coeffs: Vec<f64>) -> Result<Self, MlError> {
        if coeffs.is_empty() {
            return Err(MlError::Config("a linear hypothesis needs a bias term".into()));
        }
        Ok(Self { coeffs })
    }
}

impl Hypothesis for LinearHypothesis {
    fn n_coeffs(&self) -> usize {
        self.coeffs.len()
    }

    fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    fn set_coeffs(&mut self, coeffs: Vec<f64>) -> Result<(), MlError> {
        if coeffs.len() != self.coeffs.len() {
            return Err(ParError::SizeMismatch {
                expected: self.coeffs.len(),
                actual: coeffs.len(),
            }
            .into());
        }
        self.coeffs = coeffs;
        Ok(())
    }

    fn value(&self, row: &[f64]) -> f64 {
        self.coeffs[0]
            + self.coeffs[1..]
                .iter()
                .zip(row)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }

    fn coeff_gradients(&self, row: &[f64]) -> Vec<f64> {
        let mut grads = Vec::with_capacity(self.coeffs.len());
        grads.push(1.0);
        grads.extend(row.iter().take(self.coeffs.len() - 1));
        grads
    }
}

/// Scalar cost of a hypothesis over a dataset, with its gradient.
pub trait ErrorFunction {
    /// Cost value. The holder is invalid if part of the computation failed.
    fn value<H, D>(&self, hypothesis: &H, data: &D) -> Result<ResultHolder<f64>, MlError>
    where
        H: Hypothesis,
        D: DataSet + ?Sized;

    /// Gradient of the cost with respect to the hypothesis coefficients.
    fn gradients<H, D>(&self, hypothesis: &H, data: &D) -> Result<Vec<f64>, MlError>
    where
        H: Hypothesis,
        D: DataSet + ?Sized;
}

/// Mean squared error, `(1/m) Σ (y - h(x))²`, evaluated as parallel
/// reductions over the dataset rows.
#[derive(Debug)]
pub struct MseFunction<'e, E> {
    executor: &'e E,
}

impl<'e, E: Executor> MseFunction<'e, E> {
    pub fn new(executor: &'e E) -> Self {
        Self { executor }
    }

    fn rows<D: DataSet + ?Sized>(&self, data: &D) -> Result<PartitionedRange, MlError> {
        if data.n_rows() == 0 {
            return Err(ParError::InvalidArgument("mean squared error of an empty dataset".into()).into());
        }
        Ok(PartitionedRange::partitioned(
            data.n_rows(),
            self.executor.n_processing_elements(),
        )?)
    }
}

impl<E: Executor> ErrorFunction for MseFunction<'_, E> {
    fn value<H, D>(&self, hypothesis: &H, data: &D) -> Result<ResultHolder<f64>, MlError>
    where
        H: Hypothesis,
        D: DataSet + ?Sized,
    {
        let rows = self.rows(data)?;
        let op = FnReduce::new(
            0.0,
            |&i: &usize, acc: &mut f64| {
                let residual = data.label(i) - hypothesis.value(data.row(i));
                *acc += residual * residual;
            },
            |acc: &mut f64, other: &f64| *acc += *other,
        );
        let m = data.n_rows() as f64;
        Ok(parallel_reduce_indices(&rows, &op, self.executor)?.map(|sum| sum / m))
    }

    fn gradients<H, D>(&self, hypothesis: &H, data: &D) -> Result<Vec<f64>, MlError>
    where
        H: Hypothesis,
        D: DataSet + ?Sized,
    {
        let rows = self.rows(data)?;
        let n = hypothesis.n_coeffs();
        let op = FnReduce::new(
            vec![0.0; n],
            |&i: &usize, acc: &mut Vec<f64>| {
                let row = data.row(i);
                let residual = data.label(i) - hypothesis.value(row);
                for (a, g) in acc.iter_mut().zip(hypothesis.coeff_gradients(row)) {
                    *a += residual * g;
                }
            },
            |acc: &mut Vec<f64>, other: &Vec<f64>| {
                for (a, o) in acc.iter_mut().zip(other) {
                    *a += o;
                }
            },
        );
        let (sums, valid) = parallel_reduce_indices(&rows, &op, self.executor)?.get();
        if !valid {
            return Err(MlError::InvalidResult("mse gradients"));
        }
        let scale = -2.0 / data.n_rows() as f64;
        Ok(sums.into_iter().map(|s| s * scale).collect())
    }
}
