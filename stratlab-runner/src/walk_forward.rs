//! Walk-forward validation — in-sample search, out-of-sample confirmation.
//!
//! The bar series is split at a fixed calendar boundary: the search only
//! ever sees the in-sample prefix, and the winning vector is evaluated
//! exactly once, unmodified, on the out-of-sample suffix. An empty slice
//! on either side is a configuration error raised before any search runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stratlab_core::domain::{Bar, ParamVector};
use stratlab_core::engine::EngineConfig;
use thiserror::Error;
use tracing::info;

use crate::harness::run_backtest;
use crate::metrics::Summary;
use crate::optimize::{BacktestObjective, HistoryEntry, OptimizeError, ParamSpace, SearchStrategy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardConfig {
    /// Bars strictly before this instant are in-sample; the rest are
    /// out-of-sample.
    pub split_date: DateTime<Utc>,
    /// Bar frequency used to annualize the Sharpe ratio.
    pub periods_per_year: f64,
}

#[derive(Debug, Error)]
pub enum WalkForwardError {
    #[error("no in-sample bars before split {split}")]
    EmptyInSample { split: DateTime<Utc> },
    #[error("no out-of-sample bars at or after split {split}")]
    EmptyOutOfSample { split: DateTime<Utc> },
    #[error("search failed: {0}")]
    Search(#[from] OptimizeError),
}

/// Outcome of one walk-forward run.
#[derive(Debug, Clone)]
pub struct WalkForwardReport {
    pub best: ParamVector,
    pub history: Vec<HistoryEntry>,
    pub in_sample: Summary,
    pub out_of_sample: Summary,
}

/// Split a time-ordered series at the calendar boundary.
pub fn split_bars(bars: &[Bar], split: DateTime<Utc>) -> (&[Bar], &[Bar]) {
    let boundary = bars.partition_point(|b| b.timestamp < split);
    bars.split_at(boundary)
}

/// Search in-sample, then confirm the winner once out-of-sample.
pub fn run_walk_forward<F>(
    bars: &[Bar],
    config: &WalkForwardConfig,
    space: &ParamSpace,
    strategy: &dyn SearchStrategy,
    build: F,
) -> Result<WalkForwardReport, WalkForwardError>
where
    F: Fn(&ParamVector) -> EngineConfig + Sync,
{
    let (in_sample, out_of_sample) = split_bars(bars, config.split_date);
    if in_sample.is_empty() {
        return Err(WalkForwardError::EmptyInSample {
            split: config.split_date,
        });
    }
    if out_of_sample.is_empty() {
        return Err(WalkForwardError::EmptyOutOfSample {
            split: config.split_date,
        });
    }

    let objective = BacktestObjective::new(in_sample, &build);
    let result = strategy.search(space, &objective)?;
    info!(
        evaluations = result.history.len(),
        best_score = result.best_score,
        "in-sample search complete"
    );

    let best_config = build(&result.best);
    let is_report = run_backtest(&best_config, in_sample);
    let oos_report = run_backtest(&best_config, out_of_sample);

    Ok(WalkForwardReport {
        best: result.best,
        history: result.history,
        in_sample: Summary::compute(&is_report, config.periods_per_year),
        out_of_sample: Summary::compute(&oos_report, config.periods_per_year),
    })
}
