//! Rule-combination signal driven by a boolean inclusion mask.
//!
//! Five fixed conditions are evaluated per bar; the mask selects which ones
//! participate. All selected conditions true → long, all false → short,
//! anything mixed (or an empty selection) → no signal. The mask is the
//! genome the genetic optimizer searches over.

use crate::domain::Bar;
use crate::indicators::{linear_regression, rsi, sma};

use super::{Direction, SignalGenerator};

/// Number of rule conditions; masks must have exactly this length.
pub const RULE_COUNT: usize = 5;

const MA_PERIOD: usize = 60;
const RSI_PERIOD: usize = 14;
const RSI_OVERSOLD: f64 = 30.0;

#[derive(Debug, Clone)]
pub struct RuleMask {
    mask: Vec<bool>,
    lookback: usize,
}

impl RuleMask {
    pub fn new(mask: Vec<bool>, lookback: usize) -> Self {
        assert_eq!(mask.len(), RULE_COUNT, "mask must have {RULE_COUNT} entries");
        assert!(lookback >= 2, "regression lookback must be at least 2");
        Self { mask, lookback }
    }

    fn conditions(&self, bars: &[Bar], closes: &[f64]) -> Option<[bool; RULE_COUNT]> {
        let current = bars.last()?;
        let previous = bars.get(bars.len().checked_sub(2)?)?;

        let ma0 = sma(closes, MA_PERIOD, 0)?;
        let ma1 = sma(closes, MA_PERIOD, 1)?;
        let (slope, intercept) = linear_regression(closes, self.lookback)?;
        let reg_value = slope * (self.lookback as f64 - 1.0) + intercept;
        let rsi_now = rsi(closes, RSI_PERIOD)?;

        Some([
            ma0 > ma1,
            current.close > reg_value,
            current.volume > previous.volume,
            rsi_now < RSI_OVERSOLD,
            current.close > current.open,
        ])
    }
}

impl SignalGenerator for RuleMask {
    fn name(&self) -> &str {
        "rule_mask"
    }

    fn warmup_bars(&self) -> usize {
        (MA_PERIOD + 1).max(self.lookback).max(RSI_PERIOD + 1)
    }

    fn evaluate(&self, bars: &[Bar], closes: &[f64]) -> Option<Direction> {
        if bars.len() < self.warmup_bars() {
            return None;
        }
        let conditions = self.conditions(bars, closes)?;
        let selected: Vec<bool> = conditions
            .iter()
            .zip(&self.mask)
            .filter(|(_, &flag)| flag)
            .map(|(&cond, _)| cond)
            .collect();
        if selected.is_empty() {
            return None;
        }
        if selected.iter().all(|&c| c) {
            Some(Direction::Long)
        } else if selected.iter().all(|&c| !c) {
            Some(Direction::Short)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::testutil::{bars_from_closes, closes_of};

    /// 70 rising closes: MA rising, close above regression is false on a
    /// straight line, volume flat.
    fn rising_bars() -> Vec<Bar> {
        let closes: Vec<f64> = (0..70).map(|i| 100.0 + i as f64).collect();
        bars_from_closes(&closes)
    }

    #[test]
    fn single_rule_long() {
        // Only C0 (MA rising) selected: rising series → all selected true.
        let sig = RuleMask::new(vec![true, false, false, false, false], 20);
        let bars = rising_bars();
        assert_eq!(sig.evaluate(&bars, &closes_of(&bars)), Some(Direction::Long));
    }

    #[test]
    fn single_rule_short() {
        // Only C0 selected on a falling series → all selected false.
        let closes: Vec<f64> = (0..70).map(|i| 200.0 - i as f64).collect();
        let sig = RuleMask::new(vec![true, false, false, false, false], 20);
        let bars = bars_from_closes(&closes);
        assert_eq!(sig.evaluate(&bars, &closes), Some(Direction::Short));
    }

    #[test]
    fn mixed_rules_no_signal() {
        // C0 (MA rising, true) + C3 (RSI < 30, false on a rising series).
        let sig = RuleMask::new(vec![true, false, false, true, false], 20);
        let bars = rising_bars();
        assert_eq!(sig.evaluate(&bars, &closes_of(&bars)), None);
    }

    #[test]
    fn empty_selection_no_signal() {
        let sig = RuleMask::new(vec![false; RULE_COUNT], 20);
        let bars = rising_bars();
        assert_eq!(sig.evaluate(&bars, &closes_of(&bars)), None);
    }

    #[test]
    fn suppressed_during_warmup() {
        let sig = RuleMask::new(vec![true; RULE_COUNT], 20);
        let closes = [100.0; 30];
        let bars = bars_from_closes(&closes);
        assert_eq!(sig.evaluate(&bars, &closes), None);
    }

    #[test]
    #[should_panic(expected = "mask must have")]
    fn wrong_mask_length_panics() {
        RuleMask::new(vec![true, false], 20);
    }
}
