//! Row-oriented datasets consumed by the algorithms.

use serde::{Deserialize, Serialize};

use crate::error::ParError;

/// Read access to a table of feature rows with one label per row.
pub trait DataSet: Sync {
    fn n_rows(&self) -> usize;

    fn n_features(&self) -> usize;

    /// Feature values of row `i`. Panics when `i` is out of bounds.
    fn row(&self, i: usize) -> &[f64];

    fn label(&self, i: usize) -> f64;
}

/// Rows stored contiguously in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseDataSet {
    n_features: usize,
    values: Vec<f64>,
    labels: Vec<f64>,
}

impl DenseDataSet {
    /// Build from row vectors. Every row must have the same width and there
    /// must be one label per row.
    pub fn from_rows(rows: Vec<Vec<f64>>, labels: Vec<f64>) -> Result<Self, ParError> {
        if rows.len() != labels.len() {
            return Err(ParError::SizeMismatch {
                expected: rows.len(),
                actual: labels.len(),
            });
        }
        let n_features = rows.first().map_or(0, Vec::len);
        let mut values = Vec::with_capacity(rows.len() * n_features);
        for row in rows {
            if row.len() != n_features {
                return Err(ParError::SizeMismatch {
                    expected: n_features,
                    actual: row.len(),
                });
            }
            values.extend(row);
        }
        Ok(Self {
            n_features,
            values,
            labels,
        })
    }

    /// Rows without labels; every label is zero.
    pub fn unlabeled(rows: Vec<Vec<f64>>) -> Result<Self, ParError> {
        let labels = vec![0.0; rows.len()];
        Self::from_rows(rows, labels)
    }

    pub fn labels(&self) -> &[f64] {
        &self.labels
    }
}

impl DataSet for DenseDataSet {
    fn n_rows(&self) -> usize {
        self.labels.len()
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn row(&self, i: usize) -> &[f64] {
        let start = i * self.n_features;
        &self.values[start..start + self.n_features]
    }

    fn label(&self, i: usize) -> f64 {
        self.labels[i]
    }
}
