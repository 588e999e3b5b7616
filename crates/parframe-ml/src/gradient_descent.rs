//! Batch gradient descent driven by an iteration controller.

use std::time::{Duration, Instant};

use parframe_core::DataSet;
use serde::{Deserialize, Serialize};

use crate::error::MlError;
use crate::functions::{ErrorFunction, Hypothesis};

/// Decides whether an iterative algorithm keeps going.
///
/// The loop stops once the residual falls below `exit_tolerance` or
/// `max_iterations` iterations have run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterativeController {
    max_iterations: usize,
    exit_tolerance: f64,
    current: usize,
    residual: f64,
}

impl IterativeController {
    #[must_use]
    pub fn new(max_iterations: usize, exit_tolerance: f64) -> Self {
        Self {
            max_iterations,
            exit_tolerance,
            current: 0,
            residual: f64::MAX,
        }
    }

    /// Returns true and counts one more iteration if the loop should run
    /// again.
    pub fn continue_iterations(&mut self) -> bool {
        if self.residual < self.exit_tolerance || self.current >= self.max_iterations {
            return false;
        }
        self.current += 1;
        true
    }

    pub fn update_residual(&mut self, residual: f64) {
        self.residual = residual;
    }

    pub fn current_iteration(&self) -> usize {
        self.current
    }

    pub fn residual(&self) -> f64 {
        self.residual
    }

    pub fn converged(&self) -> bool {
        self.residual < self.exit_tolerance
    }

    pub fn reset(&mut self) {
        self.current = 0;
        self.residual = f64::MAX;
    }
}

/// Gradient descent settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GdConfig {
    pub learning_rate: f64,
    pub max_iterations: usize,
    /// Stop once the cost changes by less than this between iterations.
    pub tolerance: f64,
}

impl Default for GdConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            max_iterations: 1000,
            tolerance: 1e-9,
        }
    }
}

impl GdConfig {
    pub fn validate(&self) -> Result<(), MlError> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(MlError::Config(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(MlError::Config(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Outcome of a gradient descent run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GdReport {
    pub converged: bool,
    pub iterations: usize,
    /// Last |J_new - J_old|.
    pub residual: f64,
    /// Final cost.
    pub cost: f64,
    pub coeffs: Vec<f64>,
    pub runtime: Duration,
}

/// Full-batch gradient descent: every step evaluates the gradient over the
/// whole dataset and moves the coefficients against it.
#[derive(Debug, Clone, Default)]
pub struct BatchGradientDescent {
    config: GdConfig,
}

impl BatchGradientDescent {
    #[must_use]
    pub fn new(config: GdConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GdConfig {
        &self.config
    }

    /// Minimize `error` over `data` starting from the hypothesis's current
    /// coefficients, which are updated in place.
    pub fn solve<H, D, F>(&self, data: &D, hypothesis: &mut H, error: &F) -> Result<GdReport, MlError>
    where
        H: Hypothesis,
        D: DataSet + ?Sized,
        F: ErrorFunction,
    {
        self.config.validate()?;
        let start = Instant::now();
        let mut controller =
            IterativeController::new(self.config.max_iterations, self.config.tolerance);

        let mut cost = checked_cost(error, hypothesis, data)?;
        while controller.continue_iterations() {
            let grads = error.gradients(hypothesis, data)?;
            let coeffs = hypothesis
                .coeffs()
                .iter()
                .zip(&grads)
                .map(|(c, g)| c - self.config.learning_rate * g)
                .collect();
            hypothesis.set_coeffs(coeffs)?;

            let next = checked_cost(error, hypothesis, data)?;
            controller.update_residual((next - cost).abs());
            tracing::trace!(
                iteration = controller.current_iteration(),
                cost = next,
                residual = controller.residual(),
                "gradient step"
            );
            cost = next;
        }

        let report = GdReport {
            converged: controller.converged(),
            iterations: controller.current_iteration(),
            residual: controller.residual(),
            cost,
            coeffs: hypothesis.coeffs().to_vec(),
            runtime: start.elapsed(),
        };
        tracing::info!(
            converged = report.converged,
            iterations = report.iterations,
            cost = report.cost,
            "gradient descent finished"
        );
        Ok(report)
    }
}

fn checked_cost<F, H, D>(error: &F, hypothesis: &H, data: &D) -> Result<f64, MlError>
where
    F: ErrorFunction,
    H: Hypothesis,
    D: DataSet + ?Sized,
{
    let (cost, valid) = error.value(hypothesis, data)?.get();
    if !valid {
        return Err(MlError::InvalidResult("cost function"));
    }
    if !cost.is_finite() {
        return Err(MlError::Config(format!(
            "cost diverged to {cost}; lower the learning rate"
        )));
    }
    Ok(cost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{LinearHypothesis, MseFunction};
    use parframe_core::{DenseDataSet, ThreadPool};

    #[test]
    fn controller_stops_on_iterations() {
        let mut c = IterativeController::new(3, 1e-6);
        let mut runs = 0;
        while c.continue_iterations() {
            runs += 1;
        }
        assert_eq!(runs, 3);
        assert!(!c.converged());
    }

    #[test]
    fn controller_stops_on_residual() {
        let mut c = IterativeController::new(100, 1e-3);
        assert!(c.continue_iterations());
        c.update_residual(1e-4);
        assert!(!c.continue_iterations());
        assert!(c.converged());
        assert_eq!(c.current_iteration(), 1);
        c.reset();
        assert!(c.continue_iterations());
    }

    #[test]
    fn fits_a_line() {
        // y = 3 - 0.5x
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![f64::from(i) / 10.0]).collect();
        let labels = rows.iter().map(|r| 3.0 - 0.5 * r[0]).collect();
        let data = DenseDataSet::from_rows(rows, labels).unwrap();

        let pool = ThreadPool::with_threads(2).unwrap();
        let mse = MseFunction::new(&pool);
        let gd = BatchGradientDescent::new(GdConfig {
            learning_rate: 0.3,
            max_iterations: 5000,
            tolerance: 1e-14,
        });
        let mut h = LinearHypothesis::zeros(1);
        let report = gd.solve(&data, &mut h, &mse).unwrap();

        assert!(report.converged);
        assert!((h.coeffs()[0] - 3.0).abs() < 1e-3);
        assert!((h.coeffs()[1] + 0.5).abs() < 1e-3);
        assert!(report.cost < 1e-6);
    }

    #[test]
    fn divergence_is_reported() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![f64::from(i) * 100.0]).collect();
        let labels = vec![1.0; 10];
        let data = DenseDataSet::from_rows(rows, labels).unwrap();
        let pool = ThreadPool::with_threads(1).unwrap();
        let gd = BatchGradientDescent::new(GdConfig {
            learning_rate: 10.0,
            max_iterations: 1000,
            tolerance: 1e-9,
        });
        let mut h = LinearHypothesis::zeros(1);
        assert!(matches!(
            gd.solve(&data, &mut h, &MseFunction::new(&pool)),
            Err(MlError::Config(_))
        ));
    }

    #[test]
    fn rejects_bad_learning_rate() {
        let gd = BatchGradientDescent::new(GdConfig {
            learning_rate: 0.0,
            ..GdConfig::default()
        });
        let data = DenseDataSet::unlabeled(vec![vec![1.0]]).unwrap();
        let pool = ThreadPool::with_threads(1).unwrap();
        let mut h = LinearHypothesis::zeros(1);
        assert!(gd.solve(&data, &mut h, &MseFunction::new(&pool)).is_err());
    }
}
