//! Shared-memory k-means on an [`Executor`].

use std::time::Instant;

use parframe_comm::ControlSignal;
use parframe_core::{
    parallel_reduce_indices, DataSet, ExecOptions, Executor, FnReduce, Partitioned,
    PartitionedRange, Range1D, Task, Work,
};
use parking_lot::RwLock;

use super::{KMeansConfig, KMeansReport, Termination};
use crate::cluster::{has_converged, nearest_cluster, ClusterPoint, ClusterSet};
use crate::error::MlError;
use crate::init::Initializer;
use crate::metric::{squared_euclidean, Euclidean, Metric};

/// Assigns the rows of one partition against the current centroids.
struct AssignRows<'a, D: ?Sized, M> {
    rows: Range1D,
    data: &'a D,
    centroids: &'a RwLock<Vec<Vec<f64>>>,
    metric: &'a M,
    tie_tolerance: f64,
}

impl<D, M> Work for AssignRows<'_, D, M>
where
    D: DataSet + ?Sized,
    M: Metric,
{
    type Output = Vec<ClusterPoint>;

    fn run(&mut self, output: &mut Vec<ClusterPoint>) {
        let centroids = self.centroids.read();
        output.extend(self.rows.iter().map(|point_id| ClusterPoint {
            point_id,
            cluster_id: nearest_cluster(
                self.data.row(point_id),
                &centroids,
                self.metric,
                self.tie_tolerance,
            ),
        }));
    }
}

/// K-means whose assignment step runs as one task per partition.
///
/// The tasks are built once and rescheduled every iteration; the calling
/// thread merges their results and updates the centroids between batches.
#[derive(Debug, Clone)]
pub struct ThreadedKMeans<M = Euclidean> {
    config: KMeansConfig,
    metric: M,
}

impl ThreadedKMeans<Euclidean> {
    #[must_use]
    pub fn new(config: KMeansConfig) -> Self {
        Self::with_metric(config, Euclidean)
    }
}

impl<M: Metric> ThreadedKMeans<M> {
    #[must_use]
    pub fn with_metric(config: KMeansConfig, metric: M) -> Self {
        Self { config, metric }
    }

    pub fn config(&self) -> &KMeansConfig {
        &self.config
    }

    pub fn cluster<E, D, I>(&self, data: &D, init: &mut I, executor: &E) -> Result<KMeansReport, MlError>
    where
        E: Executor,
        D: DataSet + ?Sized,
        I: Initializer,
    {
        self.config.validate()?;
        let start = Instant::now();

        let rows = PartitionedRange::partitioned(data.n_rows(), executor.n_processing_elements())?;
        let centroids = RwLock::new(Vec::new());
        let mut tasks: Vec<_> = rows
            .partitions()
            .iter()
            .enumerate()
            .map(|(id, &range)| {
                Task::new(
                    id,
                    AssignRows {
                        rows: range,
                        data,
                        centroids: &centroids,
                        metric: &self.metric,
                        tie_tolerance: self.config.tie_tolerance,
                    },
                    Vec::new(),
                )
            })
            .collect();

        let mut restarts = 0;
        let mut iterations = 0;
        let mut clusters;

        let termination = 'restart: loop {
            clusters = ClusterSet::from_centroids(init.initialize(data, self.config.k)?);
            *centroids.write() = clusters.centroids();

            for round in 1..=self.config.max_iterations {
                iterations += 1;
                for task in &mut tasks {
                    task.reschedule();
                }
                executor.execute(&mut tasks, &ExecOptions::default())?;

                for task in &tasks {
                    let (records, valid) = task.result().get();
                    if !valid {
                        return Err(MlError::InvalidResult("cluster assignment"));
                    }
                    clusters.merge(&records);
                }

                if let Some(empty) = clusters.first_empty() {
                    let signal = self.config.empty_cluster_signal(restarts);
                    tracing::info!(cluster = empty, round, %signal, "empty cluster");
                    match signal {
                        ControlSignal::Restart => {
                            restarts += 1;
                            continue 'restart;
                        }
                        ControlSignal::Stop => {
                            break 'restart self.config.stop_reason()
                        }
                        ControlSignal::Continue | ControlSignal::Converged => {}
                    }
                }

                let previous = clusters.centroids();
                let shift = clusters.update_centroids(data, &self.metric);
                let current = clusters.centroids();
                tracing::debug!(round, shift, "centroids updated");
                let converged =
                    has_converged(&previous, &current, &self.metric, self.config.tolerance);
                *centroids.write() = current;
                if converged {
                    break 'restart Termination::Converged;
                }
            }
            break Termination::MaxIterations;
        };

        let final_centroids = clusters.centroids();
        let inertia_op = FnReduce::new(
            0.0,
            |&i: &usize, acc: &mut f64| {
                let row = data.row(i);
                let nearest = nearest_cluster(
                    row,
                    &final_centroids,
                    &self.metric,
                    self.config.tie_tolerance,
                );
                *acc += squared_euclidean(row, &final_centroids[nearest]);
            },
            |acc: &mut f64, other: &f64| *acc += *other,
        );
        let (inertia, valid) = parallel_reduce_indices(&rows, &inertia_op, executor)?.get();
        if !valid {
            return Err(MlError::InvalidResult("inertia"));
        }

        tracing::info!(
            executor = executor.name(),
            %termination,
            iterations,
            restarts,
            inertia,
            "threaded k-means finished"
        );

        Ok(KMeansReport {
            termination,
            iterations,
            restarts,
            cluster_sizes: clusters.sizes(),
            centroids: final_centroids,
            inertia,
            assignments: clusters.assignments(data.n_rows()),
            runtime: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init::{FixedInit, RandomInit};
    use crate::kmeans::EmptyClusterPolicy;
    use parframe_core::{DenseDataSet, SequentialExecutor, ThreadPool};

    fn three_blobs() -> DenseDataSet {
        let centers = [(0.0, 0.0), (20.0, 0.0), (0.0, 20.0)];
        let mut rows = Vec::new();
        for i in 0..30u32 {
            let (cx, cy) = centers[i as usize % 3];
            let d = f64::from(i / 3) * 0.05;
            rows.push(vec![cx + d, cy - d]);
        }
        DenseDataSet::unlabeled(rows).unwrap()
    }

    #[test]
    fn finds_three_blobs() {
        let data = three_blobs();
        let pool = ThreadPool::with_threads(3).unwrap();
        let kmeans = ThreadedKMeans::new(KMeansConfig {
            k: 3,
            ..KMeansConfig::default()
        });
        let mut init = FixedInit::new(vec![vec![1.0, 1.0], vec![19.0, 1.0], vec![1.0, 19.0]]);
        let report = kmeans.cluster(&data, &mut init, &pool).unwrap();
        assert!(report.converged());
        assert_eq!(report.cluster_sizes, vec![10, 10, 10]);
        for (i, &label) in report.assignments.iter().enumerate() {
            assert_eq!(label, i % 3);
        }
    }

    #[test]
    fn executors_agree() {
        let data = three_blobs();
        let kmeans = ThreadedKMeans::new(KMeansConfig {
            k: 3,
            ..KMeansConfig::default()
        });
        let seq = kmeans
            .cluster(&data, &mut RandomInit::seeded(42), &SequentialExecutor::new(2))
            .unwrap();
        let pool = kmeans
            .cluster(
                &data,
                &mut RandomInit::seeded(42),
                &ThreadPool::with_threads(2).unwrap(),
            )
            .unwrap();
        assert_eq!(seq.termination, pool.termination);
        assert_eq!(seq.assignments, pool.assignments);
        assert!((seq.inertia - pool.inertia).abs() < 1e-9);
    }

    #[test]
    fn max_iterations_bound() {
        let data = three_blobs();
        let kmeans = ThreadedKMeans::new(KMeansConfig {
            k: 3,
            max_iterations: 1,
            ..KMeansConfig::default()
        });
        let mut init = FixedInit::new(vec![vec![5.0, 5.0], vec![19.0, 1.0], vec![1.0, 19.0]]);
        let report = kmeans
            .cluster(&data, &mut init, &SequentialExecutor::new(1))
            .unwrap();
        assert_eq!(report.termination, Termination::MaxIterations);
        assert_eq!(report.iterations, 1);
    }

    #[test]
    fn empty_cluster_stops() {
        let data = DenseDataSet::unlabeled(vec![vec![2.0], vec![2.0], vec![2.0]]).unwrap();
        let kmeans = ThreadedKMeans::new(KMeansConfig {
            k: 2,
            on_empty: EmptyClusterPolicy::Stop,
            ..KMeansConfig::default()
        });
        let report = kmeans
            .cluster(&data, &mut RandomInit::seeded(5), &SequentialExecutor::new(2))
            .unwrap();
        assert_eq!(report.termination, Termination::EmptyCluster);
        assert_eq!(report.restarts, 0);
        assert_eq!(report.cluster_sizes, vec![0, 3]);
    }

    #[test]
    fn empty_cluster_can_be_ignored() {
        let data = DenseDataSet::unlabeled(vec![vec![2.0], vec![2.0], vec![2.0]]).unwrap();
        let kmeans = ThreadedKMeans::new(KMeansConfig {
            k: 2,
            on_empty: EmptyClusterPolicy::Continue,
            ..KMeansConfig::default()
        });
        let report = kmeans
            .cluster(&data, &mut RandomInit::seeded(5), &SequentialExecutor::new(1))
            .unwrap();
        assert!(report.converged());
        assert!(report.inertia.abs() < 1e-12);
    }

    #[test]
    fn tie_tolerance_decides_near_ties() {
        let data = DenseDataSet::unlabeled(vec![vec![0.0], vec![1.0]]).unwrap();
        let seeds = vec![vec![0.0], vec![1.0]];
        let exec = SequentialExecutor::new(1);

        let strict = ThreadedKMeans::new(KMeansConfig {
            k: 2,
            on_empty: EmptyClusterPolicy::Stop,
            ..KMeansConfig::default()
        });
        let report = strict
            .cluster(&data, &mut FixedInit::new(seeds.clone()), &exec)
            .unwrap();
        assert!(report.converged());
        assert_eq!(report.assignments, vec![0, 1]);

        // A unit of slack hands the first point to the later centroid.
        let loose = ThreadedKMeans::new(KMeansConfig {
            k: 2,
            tie_tolerance: 1.5,
            on_empty: EmptyClusterPolicy::Stop,
            ..KMeansConfig::default()
        });
        let report = loose
            .cluster(&data, &mut FixedInit::new(seeds), &exec)
            .unwrap();
        assert_eq!(report.termination, Termination::EmptyCluster);
        assert_eq!(report.cluster_sizes, vec![0, 2]);
    }
}
