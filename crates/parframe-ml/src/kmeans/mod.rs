//! K-means clustering, in a shared-memory and a message-passing flavor.
//!
//! Both variants follow the same loop: assign every point to its nearest
//! centroid, check for empty clusters, move each centroid to the mean of its
//! points, and stop once no centroid moved by `tolerance` or more. An empty
//! cluster is handled per [`EmptyClusterPolicy`].

mod distributed;
mod threaded;

pub use distributed::DistributedKMeans;
pub use threaded::ThreadedKMeans;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use parframe_comm::ControlSignal;
use parframe_core::DEFAULT_TOLERANCE;
use serde::{Deserialize, Serialize};

use crate::error::MlError;

/// What to do when an iteration leaves a cluster without points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyClusterPolicy {
    /// Start over from a new initialization, up to `max_restarts` times.
    #[default]
    Restart,
    /// Terminate immediately.
    Stop,
    /// Keep iterating; the empty cluster keeps its centroid.
    Continue,
}

impl fmt::Display for EmptyClusterPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Restart => "restart",
            Self::Stop => "stop",
            Self::Continue => "continue",
        })
    }
}

impl FromStr for EmptyClusterPolicy {
    type Err = MlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "restart" => Ok(Self::Restart),
            "stop" | "break" => Ok(Self::Stop),
            "continue" => Ok(Self::Continue),
            other => Err(MlError::Config(format!("unknown empty-cluster policy '{other}'"))),
        }
    }
}

/// K-means settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansConfig {
    /// Number of clusters.
    pub k: usize,
    pub max_iterations: usize,
    /// Convergence threshold on the largest centroid displacement.
    pub tolerance: f64,
    /// Slack of the nearest-centroid comparison; a later centroid within
    /// this distance of the best one wins the tie.
    pub tie_tolerance: f64,
    pub on_empty: EmptyClusterPolicy,
    /// Restart budget for [`EmptyClusterPolicy::Restart`].
    pub max_restarts: usize,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            k: 2,
            max_iterations: 100,
            tolerance: DEFAULT_TOLERANCE,
            tie_tolerance: DEFAULT_TOLERANCE,
            on_empty: EmptyClusterPolicy::default(),
            max_restarts: 5,
        }
    }
}

impl KMeansConfig {
    pub fn validate(&self) -> Result<(), MlError> {
        if self.k == 0 {
            return Err(MlError::NoClusters(self.k));
        }
        if self.max_iterations == 0 {
            return Err(MlError::Config("max_iterations must be at least 1".into()));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(MlError::Config(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if !(self.tie_tolerance.is_finite() && self.tie_tolerance >= 0.0) {
            return Err(MlError::Config(format!(
                "tie tolerance must be non-negative, got {}",
                self.tie_tolerance
            )));
        }
        Ok(())
    }

    /// Signal for an iteration that found an empty cluster, given how many
    /// restarts were already spent.
    pub fn empty_cluster_signal(&self, restarts: usize) -> ControlSignal {
        match self.on_empty {
            EmptyClusterPolicy::Restart if restarts < self.max_restarts => ControlSignal::Restart,
            EmptyClusterPolicy::Restart | EmptyClusterPolicy::Stop => ControlSignal::Stop,
            EmptyClusterPolicy::Continue => ControlSignal::Continue,
        }
    }

    /// Why the run ended after the empty-cluster check said stop.
    fn stop_reason(&self) -> Termination {
        match self.on_empty {
            EmptyClusterPolicy::Restart => Termination::RestartBudgetExhausted,
            _ => Termination::EmptyCluster,
        }
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Termination {
    Converged,
    MaxIterations,
    /// An empty cluster was found under [`EmptyClusterPolicy::Stop`].
    EmptyCluster,
    /// An empty cluster was found with no restarts left.
    RestartBudgetExhausted,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Converged => "converged",
            Self::MaxIterations => "max-iterations",
            Self::EmptyCluster => "empty-cluster",
            Self::RestartBudgetExhausted => "restart-budget-exhausted",
        })
    }
}

/// Outcome of a k-means run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansReport {
    pub termination: Termination,
    /// Assignment passes over the data, summed across restarts.
    pub iterations: usize,
    pub restarts: usize,
    pub cluster_sizes: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    /// Sum of squared distances from each point to its nearest final
    /// centroid.
    pub inertia: f64,
    /// Cluster id per point. Only the rank owning the cluster state fills
    /// this in.
    pub assignments: Vec<usize>,
    pub runtime: Duration,
}

impl KMeansReport {
    #[must_use]
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}
