//! Parameter search — shared space, objective and history types.
//!
//! Both searchers minimize `objective(params) = -(final NAV gain)` over a
//! bounded categorical space and log every evaluation, so a run can be
//! stopped after any completed evaluation without corrupting its history.

pub mod genetic;
pub mod surrogate;

pub use genetic::GaSearch;
pub use surrogate::SurrogateSearch;

use rand::Rng;
use serde::{Deserialize, Serialize};
use stratlab_core::domain::{Bar, ParamValue, ParamVector};
use stratlab_core::engine::EngineConfig;
use thiserror::Error;

use crate::harness::run_backtest;

/// Errors surfaced before or during a search.
#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("parameter space has no dimensions")]
    EmptySpace,
    #[error("dimension '{name}' has no choices")]
    EmptyDimension { name: String },
    #[error("duplicate dimension name '{name}'")]
    DuplicateDimension { name: String },
    #[error("call budget must be at least 1")]
    ZeroBudget,
    #[error("population size must be at least 2")]
    PopulationTooSmall,
    #[error("dimension '{name}' is not binary; the genetic search requires 0/1 choices")]
    NonBinaryDimension { name: String },
}

/// One named categorical dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDim {
    pub name: String,
    pub choices: Vec<ParamValue>,
}

impl ParamDim {
    pub fn new(name: impl Into<String>, choices: Vec<ParamValue>) -> Self {
        Self {
            name: name.into(),
            choices,
        }
    }

    /// A 0/1 integer dimension, the genome unit of the genetic search.
    pub fn binary(name: impl Into<String>) -> Self {
        Self::new(name, vec![ParamValue::Int(0), ParamValue::Int(1)])
    }

    fn is_binary(&self) -> bool {
        self.choices == [ParamValue::Int(0), ParamValue::Int(1)]
    }
}

/// Bounded, categorical parameter space. Searchers work in index space
/// (one choice index per dimension) and materialize `ParamVector`s at
/// evaluation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpace {
    dims: Vec<ParamDim>,
}

impl ParamSpace {
    pub fn new(dims: Vec<ParamDim>) -> Result<Self, OptimizeError> {
        if dims.is_empty() {
            return Err(OptimizeError::EmptySpace);
        }
        for (i, dim) in dims.iter().enumerate() {
            if dim.choices.is_empty() {
                return Err(OptimizeError::EmptyDimension {
                    name: dim.name.clone(),
                });
            }
            if dims[..i].iter().any(|d| d.name == dim.name) {
                return Err(OptimizeError::DuplicateDimension {
                    name: dim.name.clone(),
                });
            }
        }
        Ok(Self { dims })
    }

    pub fn dims(&self) -> &[ParamDim] {
        &self.dims
    }

    pub fn len(&self) -> usize {
        self.dims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dims.is_empty()
    }

    /// Number of distinct vectors, saturating on overflow.
    pub fn cardinality(&self) -> usize {
        self.dims
            .iter()
            .fold(1usize, |acc, d| acc.saturating_mul(d.choices.len()))
    }

    /// Uniformly random choice indices.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Vec<usize> {
        self.dims
            .iter()
            .map(|d| rng.gen_range(0..d.choices.len()))
            .collect()
    }

    /// Materialize the vector at the given choice indices.
    pub fn vector_at(&self, indices: &[usize]) -> ParamVector {
        debug_assert_eq!(indices.len(), self.dims.len());
        self.dims
            .iter()
            .zip(indices)
            .fold(ParamVector::new(), |v, (d, &i)| {
                v.with(d.name.as_str(), d.choices[i])
            })
    }

    /// True when every dimension is a 0/1 integer choice.
    pub fn is_binary(&self) -> bool {
        self.dims.iter().all(ParamDim::is_binary)
    }
}

/// One evaluated vector and its objective score (lower is better).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub params: ParamVector,
    pub score: f64,
}

/// Outcome of one search: the best vector seen and the full evaluation log.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub best: ParamVector,
    pub best_score: f64,
    pub history: Vec<HistoryEntry>,
}

/// Scalar objective; lower is better.
pub trait Objective: Sync {
    fn evaluate(&self, params: &ParamVector) -> f64;
}

impl<F> Objective for F
where
    F: Fn(&ParamVector) -> f64 + Sync,
{
    fn evaluate(&self, params: &ParamVector) -> f64 {
        self(params)
    }
}

/// The standard backtest objective: negated NAV gain over a fixed slice.
pub struct BacktestObjective<'a, F> {
    bars: &'a [Bar],
    build: F,
}

impl<'a, F> BacktestObjective<'a, F>
where
    F: Fn(&ParamVector) -> EngineConfig + Sync,
{
    pub fn new(bars: &'a [Bar], build: F) -> Self {
        Self { bars, build }
    }
}

impl<F> Objective for BacktestObjective<'_, F>
where
    F: Fn(&ParamVector) -> EngineConfig + Sync,
{
    fn evaluate(&self, params: &ParamVector) -> f64 {
        let config = (self.build)(params);
        -run_backtest(&config, self.bars).nav_gain()
    }
}

/// A bounded global search over a categorical space.
pub trait SearchStrategy {
    fn search(
        &self,
        space: &ParamSpace,
        objective: &dyn Objective,
    ) -> Result<SearchResult, OptimizeError>;
}
