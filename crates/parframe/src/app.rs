//! Application entry point and dispatch.

use std::time::{Duration, Instant};

use anyhow::Result;
use serde::Serialize;

use parframe_comm::LocalWorld;
use parframe_core::{
    parallel_for_indexed, parallel_reduce, AnyExecutor, EngineConfig, Executor, Max,
    PartitionedVec, Sum,
};
use parframe_ml::{
    BatchGradientDescent, DistributedKMeans, Hypothesis, KMeansReport, LinearHypothesis,
    MseFunction, RandomInit, Termination, ThreadedKMeans,
};

use crate::config::{Algo, AppConfig, Settings};
use crate::errors::AppError;
use crate::workload;

/// Result of one run, as printed.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub algo: Algo,
    pub executor: &'static str,
    pub workers: usize,
    pub n: usize,
    pub elapsed_ms: f64,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Workload-specific part of a [`RunSummary`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "kebab-case")]
pub enum Outcome {
    Sum {
        sum: u64,
        max: u64,
    },
    Kmeans {
        ranks: usize,
        termination: Termination,
        iterations: usize,
        restarts: usize,
        cluster_sizes: Vec<usize>,
        centroids: Vec<Vec<f64>>,
        inertia: f64,
    },
    Gd {
        converged: bool,
        iterations: usize,
        cost: f64,
        residual: f64,
        coeffs: Vec<f64>,
    },
}

/// Run the application.
pub fn run(config: &AppConfig) -> Result<()> {
    let summary = execute(config)?;
    present(config, &summary)?;
    Ok(())
}

/// Resolve the configuration, run the selected workload, and summarize it.
pub fn execute(config: &AppConfig) -> Result<RunSummary> {
    let settings = config.resolve()?;
    let executor = AnyExecutor::from_config(&settings.engine)?;
    tracing::info!(
        algo = ?config.algo,
        executor = executor.name(),
        workers = executor.n_processing_elements(),
        n = config.n,
        "starting run"
    );

    let start = Instant::now();
    let outcome = match config.algo {
        Algo::Sum => run_sum(config.n, &settings.engine, &executor)?,
        Algo::Kmeans => run_kmeans(config, &settings, &executor)?,
        Algo::Gd => run_gd(config, &settings, &executor)?,
    };

    Ok(RunSummary {
        algo: config.algo,
        executor: executor.name(),
        workers: executor.n_processing_elements(),
        n: config.n,
        elapsed_ms: start.elapsed().as_secs_f64() * 1e3,
        outcome,
    })
}

fn run_sum(n: usize, engine: &EngineConfig, executor: &AnyExecutor) -> Result<Outcome> {
    if n == 0 {
        return Err(AppError::Config("the sum workload needs n > 0".into()).into());
    }
    let mut values = PartitionedVec::filled(n, 0u64);
    values.partition_into_with_grain(executor.n_processing_elements(), engine.grain_size)?;

    let filled = parallel_for_indexed(&mut values, &|i: usize, x: &mut u64| *x = i as u64, executor)?;
    if !filled.is_valid() {
        return Err(AppError::InvalidResult("fill did not finish".into()).into());
    }

    let (sum, sum_ok) = parallel_reduce(&values, &Sum::new(), executor)?.get();
    let (max, max_ok) = parallel_reduce(&values, &Max::new(), executor)?.get();
    if !(sum_ok && max_ok) {
        return Err(AppError::InvalidResult("reduction did not finish".into()).into());
    }

    let n = n as u64;
    let expected = n * (n - 1) / 2;
    if sum != expected || max != n - 1 {
        return Err(AppError::InvalidResult(format!(
            "sum {sum} (expected {expected}), max {max} (expected {})",
            n - 1
        ))
        .into());
    }
    Ok(Outcome::Sum { sum, max })
}

fn run_kmeans(config: &AppConfig, settings: &Settings, executor: &AnyExecutor) -> Result<Outcome> {
    let data = workload::blobs(config.n, settings.kmeans.k.max(1), config.seed)?;

    let report: KMeansReport = if config.ranks > 1 {
        let kmeans = DistributedKMeans::new(settings.kmeans.clone());
        let mut world = LocalWorld::new(config.ranks)?;
        if config.receive_timeout > 0 {
            world = world.with_receive_timeout(Duration::from_secs(config.receive_timeout));
        }
        let mut reports = world
            .launch(|comm| kmeans.cluster(comm, &data, &mut RandomInit::seeded(config.seed)))?
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;
        reports.swap_remove(0)
    } else {
        ThreadedKMeans::new(settings.kmeans.clone()).cluster(
            &data,
            &mut RandomInit::seeded(config.seed),
            executor,
        )?
    };

    Ok(Outcome::Kmeans {
        ranks: config.ranks.max(1),
        termination: report.termination,
        iterations: report.iterations,
        restarts: report.restarts,
        cluster_sizes: report.cluster_sizes,
        centroids: report.centroids,
        inertia: report.inertia,
    })
}

fn run_gd(config: &AppConfig, settings: &Settings, executor: &AnyExecutor) -> Result<Outcome> {
    let data = workload::linear(config.n, 2.0, 3.0, 0.01, config.seed)?;
    let mut hypothesis = LinearHypothesis::zeros(1);
    let report = BatchGradientDescent::new(settings.gd.clone()).solve(
        &data,
        &mut hypothesis,
        &MseFunction::new(executor),
    )?;
    Ok(Outcome::Gd {
        converged: report.converged,
        iterations: report.iterations,
        cost: report.cost,
        residual: report.residual,
        coeffs: hypothesis.coeffs().to_vec(),
    })
}

fn present(config: &AppConfig, summary: &RunSummary) -> Result<()> {
    if config.json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }
    if !config.quiet {
        println!(
            "{:?} on {} ({} workers), n = {}, {:.3} ms",
            summary.algo, summary.executor, summary.workers, summary.n, summary.elapsed_ms
        );
    }
    println!("{}", result_line(&summary.outcome));
    Ok(())
}

fn result_line(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Sum { sum, max } => format!("sum = {sum}, max = {max}"),
        Outcome::Kmeans {
            ranks,
            termination,
            iterations,
            restarts,
            cluster_sizes,
            inertia,
            ..
        } => format!(
            "k-means ({ranks} ranks): {termination} after {iterations} iterations, \
             {restarts} restarts, sizes {cluster_sizes:?}, inertia {inertia:.6}"
        ),
        Outcome::Gd {
            converged,
            iterations,
            cost,
            coeffs,
            ..
        } => format!(
            "gradient descent: {} after {iterations} iterations, cost {cost:.3e}, coeffs {coeffs:.4?}",
            if *converged { "converged" } else { "stopped" }
        ),
    }
}
