//! K-means across ranks and executors.

use std::time::Duration;

use proptest::prelude::*;

use parframe_comm::LocalWorld;
use parframe_core::{DenseDataSet, SequentialExecutor, ThreadPool};
use parframe_ml::{
    DistributedKMeans, EmptyClusterPolicy, FixedInit, KMeansConfig, RandomInit, Termination,
    ThreadedKMeans,
};

fn world(n: usize) -> LocalWorld {
    LocalWorld::new(n)
        .unwrap()
        .with_receive_timeout(Duration::from_secs(10))
}

/// `per_blob` points around each of the given centers.
fn blobs(centers: &[(f64, f64)], per_blob: u32) -> DenseDataSet {
    let mut rows = Vec::new();
    for &(cx, cy) in centers {
        for i in 0..per_blob {
            let d = f64::from(i % 5) * 0.1 - 0.2;
            let e = f64::from(i / 5) * 0.1 - 0.2;
            rows.push(vec![cx + d, cy + e]);
        }
    }
    DenseDataSet::unlabeled(rows).unwrap()
}

#[test]
fn two_identical_points_every_rank_sees_the_same_outcome() {
    let data = DenseDataSet::unlabeled(vec![vec![4.0, 2.0], vec![4.0, 2.0]]).unwrap();

    for (policy, expected) in [
        (EmptyClusterPolicy::Restart, Termination::RestartBudgetExhausted),
        (EmptyClusterPolicy::Stop, Termination::EmptyCluster),
    ] {
        let kmeans = DistributedKMeans::new(KMeansConfig {
            k: 2,
            on_empty: policy,
            max_restarts: 3,
            ..KMeansConfig::default()
        });
        let reports = world(2)
            .launch(|comm| kmeans.cluster(comm, &data, &mut RandomInit::seeded(9)))
            .unwrap();

        let outcomes: Vec<_> = reports
            .into_iter()
            .map(|r| {
                let r = r.unwrap();
                (r.termination, r.restarts)
            })
            .collect();
        assert!(outcomes.iter().all(|&(t, _)| t == expected), "{policy}: {outcomes:?}");
        assert!(outcomes.windows(2).all(|w| w[0] == w[1]));
    }
}

#[test]
fn distributed_matches_threaded() {
    let data = blobs(&[(0.0, 0.0), (8.0, 8.0), (-8.0, 8.0)], 15);
    let config = KMeansConfig {
        k: 3,
        ..KMeansConfig::default()
    };
    let seeds = vec![vec![1.0, 1.0], vec![7.0, 7.0], vec![-7.0, 7.0]];

    let threaded = ThreadedKMeans::new(config.clone())
        .cluster(
            &data,
            &mut FixedInit::new(seeds.clone()),
            &ThreadPool::with_threads(3).unwrap(),
        )
        .unwrap();

    let distributed = DistributedKMeans::new(config);
    let reports = world(4)
        .launch(|comm| distributed.cluster(comm, &data, &mut FixedInit::new(seeds.clone())))
        .unwrap();
    let master = reports[0].as_ref().unwrap();

    assert!(threaded.converged());
    assert!(master.converged());
    assert_eq!(master.assignments, threaded.assignments);
    assert_eq!(master.cluster_sizes, vec![15, 15, 15]);
    assert!((master.inertia - threaded.inertia).abs() < 1e-9);
}

#[test]
fn more_ranks_than_rows() {
    let data = blobs(&[(0.0, 0.0), (5.0, 5.0)], 1);
    let kmeans = DistributedKMeans::new(KMeansConfig::default());
    let reports = world(4)
        .launch(|comm| {
            kmeans.cluster(
                comm,
                &data,
                &mut FixedInit::new(vec![vec![0.0, 0.0], vec![5.0, 5.0]]),
            )
        })
        .unwrap();
    for report in reports {
        let report = report.unwrap();
        assert!(report.converged());
        assert_eq!(report.cluster_sizes, vec![1, 1]);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Every point is assigned exactly once, whatever the partition count.
    #[test]
    fn assignments_cover_every_point(lanes in 1usize..5, seed in any::<u64>()) {
        let data = blobs(&[(0.0, 0.0), (10.0, 0.0)], 10);
        let report = ThreadedKMeans::new(KMeansConfig::default())
            .cluster(&data, &mut RandomInit::seeded(seed), &SequentialExecutor::new(lanes))
            .unwrap();
        prop_assert_eq!(report.assignments.len(), 20);
        prop_assert!(report.assignments.iter().all(|&c| c < 2));
        prop_assert_eq!(report.cluster_sizes.iter().sum::<usize>(), 20);
    }
}
