//! Regression-line breakout signal.
//!
//! Fits a least-squares line over the lookback window and compares the
//! current close to the fitted value at the window's end: above → long,
//! below → short.

use crate::domain::Bar;
use crate::indicators::linear_regression;

use super::{Direction, SignalGenerator};

#[derive(Debug, Clone)]
pub struct RegressionBreakout {
    lookback: usize,
}

impl RegressionBreakout {
    pub fn new(lookback: usize) -> Self {
        assert!(lookback >= 2, "regression lookback must be at least 2");
        Self { lookback }
    }
}

impl SignalGenerator for RegressionBreakout {
    fn name(&self) -> &str {
        "regression_breakout"
    }

    fn warmup_bars(&self) -> usize {
        self.lookback
    }

    fn evaluate(&self, bars: &[Bar], closes: &[f64]) -> Option<Direction> {
        if bars.len() < self.lookback {
            return None;
        }
        let (slope, intercept) = linear_regression(closes, self.lookback)?;
        let reg_value = slope * (self.lookback as f64 - 1.0) + intercept;
        let close = *closes.last()?;

        if close > reg_value {
            Some(Direction::Long)
        } else if close < reg_value {
            Some(Direction::Short)
        } else {
            None
        }
    }
}
