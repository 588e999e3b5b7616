//! Engine configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_GRAIN_SIZE;
use crate::error::ParError;
use crate::executor::Schedule;

/// Which executor backend to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutorKind {
    Sequential,
    #[default]
    ThreadPool,
    ParallelLoop,
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sequential => "sequential",
            Self::ThreadPool => "thread-pool",
            Self::ParallelLoop => "parallel-loop",
        })
    }
}

impl FromStr for ExecutorKind {
    type Err = ParError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" | "seq" => Ok(Self::Sequential),
            "thread-pool" | "threadpool" | "pool" => Ok(Self::ThreadPool),
            "parallel-loop" | "loop" | "omp" => Ok(Self::ParallelLoop),
            other => Err(ParError::Config(format!("unknown executor '{other}'"))),
        }
    }
}

/// Settings shared by every parallel algorithm.
///
/// Convergence tolerances belong to the iterative algorithms and live in
/// their own configs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Worker count (0 = available parallelism).
    pub threads: usize,
    pub executor: ExecutorKind,
    /// Schedule used by the parallel-loop executor.
    pub schedule: Schedule,
    /// Pin thread-pool workers to cores.
    pub pin_workers: bool,
    /// Grain size stamped on the partitions built for a run.
    pub grain_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            executor: ExecutorKind::default(),
            schedule: Schedule::default(),
            pin_workers: false,
            grain_size: DEFAULT_GRAIN_SIZE,
        }
    }
}

impl EngineConfig {
    /// Resolve zero values to defaults and reject invalid settings.
    pub fn normalize(mut self) -> Result<Self, ParError> {
        if self.threads == 0 {
            self.threads =
                std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        }
        if self.grain_size == 0 {
            self.grain_size = DEFAULT_GRAIN_SIZE;
        }
        self.schedule = self.schedule.validate()?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.threads, 0);
        assert_eq!(config.executor, ExecutorKind::ThreadPool);
        assert_eq!(config.grain_size, DEFAULT_GRAIN_SIZE);
    }

    #[test]
    fn normalize_resolves_zero_values() {
        let config = EngineConfig {
            grain_size: 0,
            ..Default::default()
        }
        .normalize()
        .unwrap();
        assert!(config.threads >= 1);
        assert_eq!(config.grain_size, DEFAULT_GRAIN_SIZE);
    }

    #[test]
    fn normalize_rejects_bad_values() {
        let bad_schedule = EngineConfig {
            schedule: Schedule::Static { chunk: 0 },
            ..Default::default()
        };
        assert!(bad_schedule.normalize().is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed: EngineConfig = serde_json::from_str(r#"{"grain_size": 16}"#).unwrap();
        assert_eq!(parsed.grain_size, 16);
        assert!(serde_json::from_str::<EngineConfig>(r#"{"tolerance": 0.1}"#).is_err());
    }

    #[test]
    fn executor_kind_parsing() {
        assert_eq!("loop".parse::<ExecutorKind>().unwrap(), ExecutorKind::ParallelLoop);
        assert_eq!("Sequential".parse::<ExecutorKind>().unwrap(), ExecutorKind::Sequential);
        assert!("gpu".parse::<ExecutorKind>().is_err());
        assert_eq!(ExecutorKind::ThreadPool.to_string(), "thread-pool");
    }
}
