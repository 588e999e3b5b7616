//! Application configuration from CLI flags, environment, and an optional
//! JSON file.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use parframe_core::{EngineConfig, ExecutorKind, Schedule};
use parframe_ml::{EmptyClusterPolicy, GdConfig, KMeansConfig};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Workload to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algo {
    /// Parallel sum and max over `0..n`.
    Sum,
    /// K-means over synthetic clusters.
    Kmeans,
    /// Linear regression by batch gradient descent.
    Gd,
}

/// parframe: run partitioned parallel workloads on a chosen executor.
#[derive(Parser, Debug)]
#[command(name = "parframe", version, about)]
pub struct AppConfig {
    /// Workload to run.
    #[arg(long, value_enum, default_value = "sum")]
    pub algo: Algo,

    /// Problem size (elements or data points).
    #[arg(short, long, default_value = "100000", env = "PARFRAME_N")]
    pub n: usize,

    /// Worker threads (0 = available parallelism).
    #[arg(short, long, env = "PARFRAME_THREADS")]
    pub threads: Option<usize>,

    /// Executor: sequential, thread-pool, or parallel-loop.
    #[arg(short, long, env = "PARFRAME_EXECUTOR")]
    pub executor: Option<ExecutorKind>,

    /// Parallel-loop schedule: default, dynamic, static, or static:<chunk>.
    #[arg(long)]
    pub schedule: Option<Schedule>,

    /// Pin thread-pool workers to cores.
    #[arg(long)]
    pub pin: bool,

    /// Grain size of the partitions built for the sum workload.
    #[arg(long)]
    pub grain_size: Option<usize>,

    /// Ranks of the in-process world for distributed k-means (1 = threaded).
    #[arg(long, default_value = "1")]
    pub ranks: usize,

    /// Seconds a rank waits for a message before failing (0 = no limit).
    #[arg(long, default_value = "60", env = "PARFRAME_RECEIVE_TIMEOUT")]
    pub receive_timeout: u64,

    /// Number of clusters.
    #[arg(short, long)]
    pub k: Option<usize>,

    /// Iteration limit for k-means and gradient descent.
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Convergence tolerance.
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Nearest-centroid tie slack for k-means.
    #[arg(long)]
    pub tie_tolerance: Option<f64>,

    /// Empty-cluster policy: restart, stop, or continue.
    #[arg(long)]
    pub on_empty: Option<EmptyClusterPolicy>,

    /// Restart budget for the restart policy.
    #[arg(long)]
    pub max_restarts: Option<usize>,

    /// Gradient descent step size.
    #[arg(long)]
    pub learning_rate: Option<f64>,

    /// Seed for data generation and centroid initialization.
    #[arg(long, default_value = "42", env = "PARFRAME_SEED")]
    pub seed: u64,

    /// JSON file with `engine`, `kmeans`, and `gd` sections. Flags given on
    /// the command line take precedence.
    #[arg(long, env = "PARFRAME_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print the summary as JSON.
    #[arg(long)]
    pub json: bool,

    /// Verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode (only the result line).
    #[arg(short, long)]
    pub quiet: bool,
}

/// Contents of a `--config` file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub engine: EngineConfig,
    pub kmeans: KMeansConfig,
    pub gd: GdConfig,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub engine: EngineConfig,
    pub kmeans: KMeansConfig,
    pub gd: GdConfig,
}

impl AppConfig {
    /// Parse CLI arguments.
    #[must_use]
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Load the config file, if any, and apply the command-line overrides.
    pub fn resolve(&self) -> Result<Settings, AppError> {
        let file = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .map_err(|e| AppError::Config(format!("{}: {e}", path.display())))?;
                serde_json::from_str(&text)
                    .map_err(|e| AppError::Config(format!("{}: {e}", path.display())))?
            }
            None => FileConfig::default(),
        };
        Ok(self.overlay(file))
    }

    fn overlay(&self, file: FileConfig) -> Settings {
        let FileConfig {
            mut engine,
            mut kmeans,
            mut gd,
        } = file;

        if let Some(threads) = self.threads {
            engine.threads = threads;
        }
        if let Some(executor) = self.executor {
            engine.executor = executor;
        }
        if let Some(schedule) = self.schedule {
            engine.schedule = schedule;
        }
        engine.pin_workers |= self.pin;
        if let Some(grain_size) = self.grain_size {
            engine.grain_size = grain_size;
        }
        if let Some(tolerance) = self.tolerance {
            kmeans.tolerance = tolerance;
            gd.tolerance = tolerance;
        }

        if let Some(k) = self.k {
            kmeans.k = k;
        }
        if let Some(max_iterations) = self.max_iterations {
            kmeans.max_iterations = max_iterations;
            gd.max_iterations = max_iterations;
        }
        if let Some(tie_tolerance) = self.tie_tolerance {
            kmeans.tie_tolerance = tie_tolerance;
        }
        if let Some(on_empty) = self.on_empty {
            kmeans.on_empty = on_empty;
        }
        if let Some(max_restarts) = self.max_restarts {
            kmeans.max_restarts = max_restarts;
        }
        if let Some(learning_rate) = self.learning_rate {
            gd.learning_rate = learning_rate;
        }

        Settings { engine, kmeans, gd }
    }
}
