//! Run configuration — TOML file describing data, engine and search.
//!
//! Validation happens at load time: a structurally invalid configuration
//! (non-positive cash, degenerate fractions, wrong mask length) is rejected
//! before any backtest or search runs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stratlab_core::engine::{EngineConfig, EntryStyle};
use stratlab_core::signals::{rule_mask::RULE_COUNT, SignalSpec};
use thiserror::Error;

use crate::walk_forward::WalkForwardConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    #[error("{field} must be a fraction in (0, 1), got {value}")]
    FractionOutOfRange { field: &'static str, value: f64 },
    #[error("{field} must be at least {min}, got {value}")]
    WindowTooShort {
        field: &'static str,
        min: usize,
        value: usize,
    },
    #[error("rule mask must have {expected} entries, got {actual}")]
    MaskLength { expected: usize, actual: usize },
    #[error("mutation_rate must be in [0, 1], got {0}")]
    BadMutationRate(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSection {
    /// CSV bar series path.
    pub path: PathBuf,
}

/// Search settings shared by both optimizers; each reads the fields it
/// understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerSection {
    #[serde(default = "default_budget")]
    pub budget: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_population")]
    pub population: usize,
    #[serde(default = "default_generations")]
    pub generations: usize,
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
}

fn default_budget() -> usize {
    50
}
fn default_seed() -> u64 {
    42
}
fn default_population() -> usize {
    10
}
fn default_generations() -> usize {
    20
}
fn default_mutation_rate() -> f64 {
    0.2
}

impl Default for OptimizerSection {
    fn default() -> Self {
        Self {
            budget: default_budget(),
            seed: default_seed(),
            population: default_population(),
            generations: default_generations(),
            mutation_rate: default_mutation_rate(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub data: DataSection,
    pub engine: EngineConfig,
    #[serde(default)]
    pub walk_forward: Option<WalkForwardConfig>,
    #[serde(default)]
    pub optimizer: Option<OptimizerSection>,
}

impl RunConfig {
    /// Read and validate a TOML run configuration.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: RunConfig = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let engine = &self.engine;
        if engine.initial_cash <= 0.0 {
            return Err(ConfigError::NonPositive {
                field: "initial_cash",
                value: engine.initial_cash,
            });
        }
        if engine.size <= 0.0 {
            return Err(ConfigError::NonPositive {
                field: "size",
                value: engine.size,
            });
        }
        if engine.round_trip_cost < 0.0 {
            return Err(ConfigError::NonPositive {
                field: "round_trip_cost",
                value: engine.round_trip_cost,
            });
        }
        check_fraction("trailing_stop_pct", engine.trailing_stop_pct)?;
        if let Some(pct) = engine.stop_loss_pct {
            check_fraction("stop_loss_pct", pct)?;
        }
        if let EntryStyle::Bracket { spread, .. } = engine.entry {
            check_fraction("spread", spread)?;
        }
        match &engine.signal {
            SignalSpec::MaInflection { period, .. } => {
                check_window("signal period", *period, 2)?;
            }
            SignalSpec::RegressionBreakout { lookback } => {
                check_window("signal lookback", *lookback, 2)?;
            }
            SignalSpec::RuleMask { mask, lookback } => {
                if mask.len() != RULE_COUNT {
                    return Err(ConfigError::MaskLength {
                        expected: RULE_COUNT,
                        actual: mask.len(),
                    });
                }
                check_window("signal lookback", *lookback, 2)?;
            }
        }
        if let Some(optimizer) = &self.optimizer {
            check_window("budget", optimizer.budget, 1)?;
            check_window("population", optimizer.population, 2)?;
            check_window("generations", optimizer.generations, 1)?;
            if !(0.0..=1.0).contains(&optimizer.mutation_rate) {
                return Err(ConfigError::BadMutationRate(optimizer.mutation_rate));
            }
        }
        Ok(())
    }
}

fn check_fraction(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value <= 0.0 || value >= 1.0 {
        return Err(ConfigError::FractionOutOfRange { field, value });
    }
    Ok(())
}

fn check_window(field: &'static str, value: usize, min: usize) -> Result<(), ConfigError> {
    if value < min {
        return Err(ConfigError::WindowTooShort { field, min, value });
    }
    Ok(())
}
