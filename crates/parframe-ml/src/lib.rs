//! # parframe-ml
//!
//! Algorithms built on the parframe engine: threaded and distributed
//! k-means, parallel dot and matrix-vector products, and batch gradient
//! descent over a mean-squared-error cost.

pub mod cluster;
pub mod error;
pub mod functions;
pub mod gradient_descent;
pub mod init;
pub mod kmeans;
pub mod linalg;
pub mod metric;

// Re-exports
pub use cluster::{Cluster, ClusterPoint, ClusterSet};
pub use error::MlError;
pub use functions::{ErrorFunction, Hypothesis, LinearHypothesis, MseFunction};
pub use gradient_descent::{BatchGradientDescent, GdConfig, GdReport, IterativeController};
pub use init::{FixedInit, Initializer, RandomInit};
pub use kmeans::{
    DistributedKMeans, EmptyClusterPolicy, KMeansConfig, KMeansReport, Termination,
    ThreadedKMeans,
};
pub use linalg::{parallel_dot, parallel_matvec, DenseMatrix};
pub use metric::{Euclidean, Manhattan, Metric};
