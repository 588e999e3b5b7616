//! Master/worker k-means over a [`Communicator`].
//!
//! Every rank holds the whole dataset but only assigns the rows of its own
//! partition. The master owns the cluster state: it initializes the
//! centroids, merges the assignments it receives, recomputes the centroids
//! and decides every branch. Each decision is broadcast before any rank acts
//! on it, so all ranks walk through the same sequence of collectives.

use std::time::Instant;

use parframe_comm::{CommError, Communicator, ControlSignal, Tag, MASTER_RANK};
use parframe_core::{partition_len, DataSet};

use super::{KMeansConfig, KMeansReport, Termination};
use crate::cluster::{has_converged, nearest_cluster, ClusterPoint, ClusterSet};
use crate::error::MlError;
use crate::init::Initializer;
use crate::metric::{squared_euclidean, Euclidean, Metric};

/// Tag of the worker-to-master assignment messages.
const ASSIGNMENT_TAG: Tag = 1;

/// K-means where each rank of a communicator clusters one partition.
#[derive(Debug, Clone)]
pub struct DistributedKMeans<M = Euclidean> {
    config: KMeansConfig,
    metric: M,
}

impl DistributedKMeans<Euclidean> {
    #[must_use]
    pub fn new(config: KMeansConfig) -> Self {
        Self::with_metric(config, Euclidean)
    }
}

impl<M: Metric> DistributedKMeans<M> {
    #[must_use]
    pub fn with_metric(config: KMeansConfig, metric: M) -> Self {
        Self { config, metric }
    }

    pub fn config(&self) -> &KMeansConfig {
        &self.config
    }

    /// Run the protocol as `comm.rank()`. Every rank of the communicator
    /// must call this with the same configuration and dataset.
    ///
    /// `init` is only consulted on the master. Termination, iteration and
    /// restart counts, centroids, sizes and inertia are identical on every
    /// rank; per-point assignments are only reported by the master.
    pub fn cluster<C, D, I>(&self, comm: &C, data: &D, init: &mut I) -> Result<KMeansReport, MlError>
    where
        C: Communicator,
        D: DataSet + ?Sized,
        I: Initializer,
    {
        self.config.validate()?;
        if self.config.k > data.n_rows() {
            return Err(MlError::NotEnoughRows {
                rows: data.n_rows(),
                k: self.config.k,
            });
        }

        let start = Instant::now();
        let is_master = comm.is_master();
        let local_rows = partition_len(data.n_rows(), comm.size())?
            .get(comm.rank())
            .copied()
            .ok_or(CommError::InvalidRank {
                rank: comm.rank(),
                size: comm.size(),
            })?;

        tracing::debug!(
            rank = comm.rank(),
            begin = local_rows.begin(),
            end = local_rows.end(),
            "distributed k-means partition"
        );

        let mut restarts = 0;
        let mut iterations = 0;
        let mut clusters = ClusterSet::default();

        let termination = 'restart: loop {
            let mut centroids = self.initial_centroids(comm, data, init)?;
            if is_master {
                clusters = ClusterSet::from_centroids(centroids.clone());
            }

            let mut round = 0;
            loop {
                round += 1;
                iterations += 1;

                let local: Vec<ClusterPoint> = local_rows
                    .iter()
                    .map(|point_id| ClusterPoint {
                        point_id,
                        cluster_id: nearest_cluster(
                            data.row(point_id),
                            &centroids,
                            &self.metric,
                            self.config.tie_tolerance,
                        ),
                    })
                    .collect();

                if is_master {
                    clusters.merge(&local);
                    for src in (0..comm.size()).filter(|&r| r != MASTER_RANK) {
                        let records: Vec<ClusterPoint> = comm.receive(src, ASSIGNMENT_TAG)?;
                        clusters.merge(&records);
                    }
                } else {
                    comm.send(&local, MASTER_RANK, ASSIGNMENT_TAG)?;
                }

                let mut signal = ControlSignal::Continue;
                if is_master {
                    if let Some(empty) = clusters.first_empty() {
                        signal = self.config.empty_cluster_signal(restarts);
                        tracing::info!(cluster = empty, round, %signal, "empty cluster");
                    }
                }
                comm.broadcast(&mut signal, MASTER_RANK)?;
                match signal {
                    ControlSignal::Restart => {
                        restarts += 1;
                        continue 'restart;
                    }
                    ControlSignal::Stop => break 'restart self.config.stop_reason(),
                    ControlSignal::Continue | ControlSignal::Converged => {}
                }

                let mut status = ControlSignal::Continue;
                if is_master {
                    let previous = clusters.centroids();
                    let shift = clusters.update_centroids(data, &self.metric);
                    tracing::debug!(round, shift, "centroids updated");
                    if has_converged(
                        &previous,
                        &clusters.centroids(),
                        &self.metric,
                        self.config.tolerance,
                    ) {
                        status = ControlSignal::Converged;
                    }
                }
                comm.broadcast(&mut status, MASTER_RANK)?;
                if status == ControlSignal::Converged {
                    break 'restart Termination::Converged;
                }

                if is_master {
                    centroids = clusters.centroids();
                }
                comm.broadcast(&mut centroids, MASTER_RANK)?;

                if round >= self.config.max_iterations {
                    break 'restart Termination::MaxIterations;
                }
            }
        };

        let mut summary = if is_master {
            (clusters.centroids(), clusters.sizes())
        } else {
            (Vec::new(), Vec::new())
        };
        comm.broadcast(&mut summary, MASTER_RANK)?;
        let (centroids, cluster_sizes) = summary;

        let local_inertia: f64 = local_rows
            .iter()
            .map(|i| {
                let row = data.row(i);
                let nearest =
                    nearest_cluster(row, &centroids, &self.metric, self.config.tie_tolerance);
                squared_euclidean(row, &centroids[nearest])
            })
            .sum();
        let mut inertia = comm
            .reduce(&local_inertia, MASTER_RANK, |acc, other| *acc += *other)?
            .unwrap_or(local_inertia);
        comm.broadcast(&mut inertia, MASTER_RANK)?;

        let assignments = if is_master {
            clusters.assignments(data.n_rows())
        } else {
            Vec::new()
        };

        tracing::info!(
            rank = comm.rank(),
            %termination,
            iterations,
            restarts,
            inertia,
            "distributed k-means finished"
        );

        Ok(KMeansReport {
            termination,
            iterations,
            restarts,
            cluster_sizes,
            centroids,
            inertia,
            assignments,
            runtime: start.elapsed(),
        })
    }

    /// Master draws the centroids and broadcasts them. A failed
    /// initialization is broadcast as `None` so the workers do not wait on
    /// an assignment round that never starts.
    fn initial_centroids<C, D, I>(
        &self,
        comm: &C,
        data: &D,
        init: &mut I,
    ) -> Result<Vec<Vec<f64>>, MlError>
    where
        C: Communicator,
        D: DataSet + ?Sized,
        I: Initializer,
    {
        let mut failure = None;
        let mut initial = if comm.is_master() {
            match init.initialize(data, self.config.k) {
                Ok(centroids) => Some(centroids),
                Err(err) => {
                    failure = Some(err);
                    None
                }
            }
        } else {
            None
        };
        comm.broadcast(&mut initial, MASTER_RANK)?;

        initial.ok_or_else(|| failure.unwrap_or(MlError::InvalidResult("centroid initialization")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init::{FixedInit, RandomInit};
    use crate::kmeans::EmptyClusterPolicy;
    use parframe_comm::LocalWorld;
    use parframe_core::DenseDataSet;
    use std::time::Duration;

    fn two_blobs() -> DenseDataSet {
        let mut rows = Vec::new();
        for i in 0..10 {
            let jitter = f64::from(i) * 0.01;
            rows.push(vec![0.0 + jitter, 0.0 - jitter]);
            rows.push(vec![10.0 - jitter, 10.0 + jitter]);
        }
        DenseDataSet::unlabeled(rows).unwrap()
    }

    fn world(n: usize) -> LocalWorld {
        LocalWorld::new(n)
            .unwrap()
            .with_receive_timeout(Duration::from_secs(10))
    }

    #[test]
    fn single_rank_converges() {
        let data = two_blobs();
        let kmeans = DistributedKMeans::new(KMeansConfig::default());
        let reports = world(1)
            .launch(|comm| {
                kmeans.cluster(comm, &data, &mut FixedInit::new(vec![vec![1.0, 1.0], vec![9.0, 9.0]]))
            })
            .unwrap();
        let report = reports[0].as_ref().unwrap();
        assert!(report.converged());
        assert_eq!(report.cluster_sizes, vec![10, 10]);
        assert_eq!(report.assignments.len(), 20);
    }

    #[test]
    fn ranks_agree_on_the_outcome() {
        let data = two_blobs();
        let kmeans = DistributedKMeans::new(KMeansConfig::default());
        let reports: Vec<KMeansReport> = world(3)
            .launch(|comm| kmeans.cluster(comm, &data, &mut RandomInit::seeded(3)))
            .unwrap()
            .into_iter()
            .map(Result::unwrap)
            .collect();

        let master = &reports[0];
        assert!(master.converged());
        let mut sizes = master.cluster_sizes.clone();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![10, 10]);
        for report in &reports[1..] {
            assert_eq!(report.termination, master.termination);
            assert_eq!(report.iterations, master.iterations);
            assert_eq!(report.restarts, master.restarts);
            assert_eq!(report.cluster_sizes, master.cluster_sizes);
            assert!((report.inertia - master.inertia).abs() < 1e-9);
            assert!(report.assignments.is_empty());
        }
    }

    #[test]
    fn identical_points_exhaust_restarts() {
        let data = DenseDataSet::unlabeled(vec![vec![1.0, 1.0], vec![1.0, 1.0]]).unwrap();
        let config = KMeansConfig {
            on_empty: EmptyClusterPolicy::Restart,
            max_restarts: 2,
            ..KMeansConfig::default()
        };
        let kmeans = DistributedKMeans::new(config);
        let reports = world(2)
            .launch(|comm| kmeans.cluster(comm, &data, &mut RandomInit::seeded(1)))
            .unwrap();
        for report in reports {
            let report = report.unwrap();
            assert_eq!(report.termination, Termination::RestartBudgetExhausted);
            assert_eq!(report.restarts, 2);
            assert_eq!(report.iterations, 3);
        }
    }

    #[test]
    fn failed_initialization_releases_workers() {
        let data = two_blobs();
        let kmeans = DistributedKMeans::new(KMeansConfig::default());
        let results = world(2)
            .launch(|comm| kmeans.cluster(comm, &data, &mut FixedInit::new(vec![vec![0.0, 0.0]])))
            .unwrap();
        assert!(matches!(results[0], Err(MlError::InitMismatch { got: 1, expected: 2 })));
        assert!(matches!(results[1], Err(MlError::InvalidResult(_))));
    }
}
