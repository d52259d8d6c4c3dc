//! StratLab Runner — backtest orchestration, metrics, search, validation.
//!
//! This crate builds on `stratlab-core` to provide:
//! - CSV bar loading with ordering/sanity validation
//! - Hermetic single-backtest harness with NAV/trade extraction
//! - Performance metrics (PnL, Sharpe, drawdown, win rate)
//! - Surrogate-model and genetic-algorithm parameter search
//! - Walk-forward in-sample/out-of-sample validation
//! - Tabular CSV export of NAV, trade and optimization-history series

pub mod config;
pub mod data_loader;
pub mod export;
pub mod harness;
pub mod metrics;
pub mod optimize;
pub mod walk_forward;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{ConfigError, OptimizerSection, RunConfig};
pub use data_loader::{load_bars, LoadError};
pub use export::{write_history_csv, write_nav_csv, write_trades_csv};
pub use harness::{run_backtest, BacktestReport};
pub use metrics::Summary;
pub use optimize::{
    BacktestObjective, GaSearch, HistoryEntry, Objective, OptimizeError, ParamDim, ParamSpace,
    SearchResult, SearchStrategy, SurrogateSearch,
};
pub use walk_forward::{
    run_walk_forward, split_bars, WalkForwardConfig, WalkForwardError, WalkForwardReport,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn report_types_are_send_sync() {
        assert_send::<BacktestReport>();
        assert_sync::<BacktestReport>();
        assert_send::<Summary>();
        assert_sync::<Summary>();
    }

    #[test]
    fn search_types_are_send_sync() {
        assert_send::<ParamSpace>();
        assert_sync::<ParamSpace>();
        assert_send::<HistoryEntry>();
        assert_sync::<HistoryEntry>();
        assert_send::<SearchResult>();
        assert_sync::<SearchResult>();
        assert_send::<SurrogateSearch>();
        assert_sync::<SurrogateSearch>();
        assert_send::<GaSearch>();
        assert_sync::<GaSearch>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<RunConfig>();
        assert_sync::<RunConfig>();
        assert_send::<WalkForwardConfig>();
        assert_sync::<WalkForwardConfig>();
    }
}
