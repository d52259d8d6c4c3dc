//! Moving-average slope inflection signal.
//!
//! Long when the MA slope turns from falling to rising
//! (`ma[0] - ma[-1] > 0` and `ma[-1] - ma[-2] < 0`); short on the mirror
//! inflection. Works on a simple or smoothed (Wilder) moving average.

use crate::domain::Bar;
use crate::indicators::{sma, smoothed_ma};

use super::{Direction, SignalGenerator};

#[derive(Debug, Clone)]
pub struct MaInflection {
    period: usize,
    smoothed: bool,
}

impl MaInflection {
    pub fn new(period: usize, smoothed: bool) -> Self {
        assert!(period >= 2, "MA period must be at least 2");
        Self { period, smoothed }
    }

    fn ma(&self, closes: &[f64], offset: usize) -> Option<f64> {
        if self.smoothed {
            smoothed_ma(closes, self.period, offset)
        } else {
            sma(closes, self.period, offset)
        }
    }
}

impl SignalGenerator for MaInflection {
    fn name(&self) -> &str {
        "ma_inflection"
    }

    fn warmup_bars(&self) -> usize {
        // Three MA readings are needed to see a slope change.
        self.period + 2
    }

    fn evaluate(&self, bars: &[Bar], closes: &[f64]) -> Option<Direction> {
        if bars.len() < self.warmup_bars() {
            return None;
        }
        let ma0 = self.ma(closes, 0)?;
        let ma1 = self.ma(closes, 1)?;
        let ma2 = self.ma(closes, 2)?;

        if ma0 - ma1 > 0.0 && ma1 - ma2 < 0.0 {
            Some(Direction::Long)
        } else if ma0 - ma1 < 0.0 && ma1 - ma2 > 0.0 {
            Some(Direction::Short)
        } else {
            None
        }
    }
}
