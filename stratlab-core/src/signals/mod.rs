//! Signal generators — pluggable entry-signal logic.
//!
//! One `StrategyEngine` is parameterized by a signal generator trait object
//! instead of subclassing per strategy variant; long-only, short-only and
//! bidirectional behavior comes from `TradeDirection`, not from separate
//! implementations.

pub mod ma_inflection;
pub mod regression_breakout;
pub mod rule_mask;

pub use ma_inflection::MaInflection;
pub use regression_breakout::RegressionBreakout;
pub use rule_mask::RuleMask;

use crate::domain::Bar;
use serde::{Deserialize, Serialize};

/// Direction of a proposed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

/// Which entry directions a strategy variant is allowed to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeDirection {
    LongOnly,
    ShortOnly,
    #[default]
    Both,
}

impl TradeDirection {
    pub fn allows(self, direction: Direction) -> bool {
        match (self, direction) {
            (TradeDirection::Both, _) => true,
            (TradeDirection::LongOnly, Direction::Long) => true,
            (TradeDirection::ShortOnly, Direction::Short) => true,
            _ => false,
        }
    }
}

/// Entry-signal logic evaluated once per bar over the history so far.
///
/// `bars` runs up to and including the current bar; `closes` is its close
/// column, maintained incrementally by the caller so implementations never
/// rebuild it per bar. Implementations return `None` until `warmup_bars()`
/// bars exist; the engine also suppresses evaluation before that point.
pub trait SignalGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Bars of history required before the first signal can fire.
    fn warmup_bars(&self) -> usize;

    fn evaluate(&self, bars: &[Bar], closes: &[f64]) -> Option<Direction>;
}

/// Serializable choice of signal generator, built into a trait object per
/// run so parallel backtests never share one instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalSpec {
    MaInflection { period: usize, smoothed: bool },
    RegressionBreakout { lookback: usize },
    RuleMask { mask: Vec<bool>, lookback: usize },
}

impl SignalSpec {
    pub fn build(&self) -> Box<dyn SignalGenerator> {
        match self {
            SignalSpec::MaInflection { period, smoothed } => {
                Box::new(MaInflection::new(*period, *smoothed))
            }
            SignalSpec::RegressionBreakout { lookback } => {
                Box::new(RegressionBreakout::new(*lookback))
            }
            SignalSpec::RuleMask { mask, lookback } => {
                Box::new(RuleMask::new(mask.clone(), *lookback))
            }
        }
    }
}
