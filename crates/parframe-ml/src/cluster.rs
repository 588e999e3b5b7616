//! Clusters, point assignment, and the master-side bookkeeping of k-means.

use std::collections::BTreeSet;

use parframe_core::DataSet;
use serde::{Deserialize, Serialize};

use crate::metric::Metric;

/// Assignment of one point to one cluster, as sent from workers to the
/// master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterPoint {
    pub point_id: usize,
    pub cluster_id: usize,
}

/// A centroid and the ids of the points currently assigned to it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cluster {
    pub id: usize,
    pub centroid: Vec<f64>,
    points: BTreeSet<usize>,
}

impl Cluster {
    #[must_use]
    pub fn new(id: usize, centroid: Vec<f64>) -> Self {
        Self {
            id,
            centroid,
            points: BTreeSet::new(),
        }
    }

    /// Returns true if the point was not already a member.
    pub fn add_point(&mut self, point_id: usize) -> bool {
        self.points.insert(point_id)
    }

    /// Returns true if the point was a member.
    pub fn remove_point(&mut self, point_id: usize) -> bool {
        self.points.remove(&point_id)
    }

    pub fn contains(&self, point_id: usize) -> bool {
        self.points.contains(&point_id)
    }

    pub fn points(&self) -> impl Iterator<Item = usize> + '_ {
        self.points.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Move the centroid to the mean of the member points. An empty cluster
    /// keeps its centroid.
    pub fn recalculate_centroid<D: DataSet + ?Sized>(&mut self, data: &D) {
        if self.points.is_empty() {
            return;
        }
        let mut mean = vec![0.0; data.n_features()];
        for &pid in &self.points {
            for (m, x) in mean.iter_mut().zip(data.row(pid)) {
                *m += x;
            }
        }
        let n = self.points.len() as f64;
        for m in &mut mean {
            *m /= n;
        }
        self.centroid = mean;
    }
}

/// Index of the centroid nearest to `point`.
///
/// Centroids are scanned in order and a candidate replaces the current best
/// when `distance - best < tolerance`. Ties within `tolerance` therefore go
/// to the later centroid.
pub fn nearest_cluster<M: Metric + ?Sized>(
    point: &[f64],
    centroids: &[Vec<f64>],
    metric: &M,
    tolerance: f64,
) -> usize {
    let mut best = f64::MAX;
    let mut best_id = 0;
    for (id, centroid) in centroids.iter().enumerate() {
        let dist = metric.distance(point, centroid);
        if dist - best < tolerance {
            best = dist;
            best_id = id;
        }
    }
    best_id
}

/// The full cluster state held by the rank that owns it.
#[derive(Debug, Clone, Default)]
pub struct ClusterSet {
    clusters: Vec<Cluster>,
}

impl ClusterSet {
    /// One empty cluster per centroid.
    #[must_use]
    pub fn from_centroids(centroids: Vec<Vec<f64>>) -> Self {
        Self {
            clusters: centroids
                .into_iter()
                .enumerate()
                .map(|(id, c)| Cluster::new(id, c))
                .collect(),
        }
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Put `point_id` in `cluster_id` and take it out of every other cluster.
    pub fn assign(&mut self, point_id: usize, cluster_id: usize) {
        if self.clusters[cluster_id].add_point(point_id) {
            for cluster in &mut self.clusters {
                if cluster.id != cluster_id && cluster.remove_point(point_id) {
                    break;
                }
            }
        }
    }

    /// Apply a batch of assignments.
    pub fn merge(&mut self, records: &[ClusterPoint]) {
        for r in records {
            self.assign(r.point_id, r.cluster_id);
        }
    }

    /// Id of the first cluster with no points.
    pub fn first_empty(&self) -> Option<usize> {
        self.clusters.iter().find(|c| c.is_empty()).map(|c| c.id)
    }

    /// Recompute every centroid and return the largest displacement from
    /// the previous centroids.
    pub fn update_centroids<D, M>(&mut self, data: &D, metric: &M) -> f64
    where
        D: DataSet + ?Sized,
        M: Metric + ?Sized,
    {
        let mut max_shift = 0.0f64;
        for cluster in &mut self.clusters {
            let old = cluster.centroid.clone();
            cluster.recalculate_centroid(data);
            max_shift = max_shift.max(metric.distance(&old, &cluster.centroid));
        }
        max_shift
    }

    pub fn centroids(&self) -> Vec<Vec<f64>> {
        self.clusters.iter().map(|c| c.centroid.clone()).collect()
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.clusters.iter().map(Cluster::len).collect()
    }

    /// Cluster id of each of the first `n_points` points; unassigned points
    /// map to `usize::MAX`.
    pub fn assignments(&self, n_points: usize) -> Vec<usize> {
        let mut labels = vec![usize::MAX; n_points];
        for cluster in &self.clusters {
            for pid in cluster.points() {
                if let Some(slot) = labels.get_mut(pid) {
                    *slot = cluster.id;
                }
            }
        }
        labels
    }
}

/// True when every centroid moved strictly less than `tolerance`.
pub fn has_converged<M: Metric + ?Sized>(
    old: &[Vec<f64>],
    new: &[Vec<f64>],
    metric: &M,
    tolerance: f64,
) -> bool {
    old.iter()
        .zip(new)
        .all(|(a, b)| metric.distance(a, b) < tolerance)
}
