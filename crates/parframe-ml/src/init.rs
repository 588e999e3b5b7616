//! Initial centroid selection.

use parframe_core::DataSet;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::MlError;

/// Produces `k` starting centroids. Called again on every restart, so
/// stateful initializers yield a fresh selection each time.
pub trait Initializer {
    fn initialize<D: DataSet + ?Sized>(&mut self, data: &D, k: usize)
        -> Result<Vec<Vec<f64>>, MlError>;
}

/// Picks `k` distinct rows uniformly at random.
#[derive(Debug, Clone)]
pub struct RandomInit {
    rng: StdRng,
}

impl RandomInit {
    /// Reproducible selection from `seed`.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Selection seeded from the operating system.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Initializer for RandomInit {
    fn initialize<D: DataSet + ?Sized>(
        &mut self,
        data: &D,
        k: usize,
    ) -> Result<Vec<Vec<f64>>, MlError> {
        if k == 0 {
            return Err(MlError::NoClusters(k));
        }
        if k > data.n_rows() {
            return Err(MlError::NotEnoughRows {
                rows: data.n_rows(),
                k,
            });
        }
        let rows = rand::seq::index::sample(&mut self.rng, data.n_rows(), k);
        tracing::debug!(rows = ?rows.clone().into_vec(), "random centroids");
        Ok(rows.into_iter().map(|r| data.row(r).to_vec()).collect())
    }
}

/// Always returns the same, caller-supplied centroids.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedInit {
    centroids: Vec<Vec<f64>>,
}

impl FixedInit {
    #[must_use]
    pub fn new(centroids: Vec<Vec<f64>>) -> Self {
        Self { centroids }
    }
}

impl Initializer for FixedInit {
    fn initialize<D: DataSet + ?Sized>(
        &mut self,
        data: &D,
        k: usize,
    ) -> Result<Vec<Vec<f64>>, MlError> {
        if k == 0 {
            return Err(MlError::NoClusters(k));
        }
        if self.centroids.len() != k {
            return Err(MlError::InitMismatch {
                got: self.centroids.len(),
                expected: k,
            });
        }
        if let Some(bad) = self.centroids.iter().find(|c| c.len() != data.n_features()) {
            return Err(MlError::FeatureMismatch {
                got: bad.len(),
                expected: data.n_features(),
            });
        }
        Ok(self.centroids.clone())
    }
}
