//! Performance metrics computed from NAV and trade series.
//!
//! Pure functions over the harness output; no engine state is consulted.

use serde::{Deserialize, Serialize};
use stratlab_core::domain::{NavRecord, Trade};

use crate::harness::BacktestReport;

/// Sum of realized trade PnL, net of costs.
pub fn total_pnl(trades: &[Trade]) -> f64 {
    trades.iter().map(|t| t.pnl).sum()
}

/// Fraction of trades with positive PnL. Zero when there are no trades.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Annualized Sharpe-style ratio over per-bar NAV returns.
///
/// `periods_per_year` is the bar frequency (e.g. 2190 for 4h bars). Returns
/// zero when there are fewer than two records or the returns have no
/// variance.
pub fn sharpe_ratio(nav: &[NavRecord], periods_per_year: f64) -> f64 {
    if nav.len() < 2 {
        return 0.0;
    }
    let returns: Vec<f64> = nav
        .windows(2)
        .map(|w| {
            if w[0].nav == 0.0 {
                0.0
            } else {
                w[1].nav / w[0].nav - 1.0
            }
        })
        .collect();
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    if std == 0.0 {
        return 0.0;
    }
    mean / std * periods_per_year.sqrt()
}

/// Maximum peak-to-trough NAV decline, as a fraction of the peak.
/// Zero for monotonically rising (or empty) series.
pub fn max_drawdown(nav: &[NavRecord]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst: f64 = 0.0;
    for record in nav {
        peak = peak.max(record.nav);
        if peak > 0.0 {
            worst = worst.max((peak - record.nav) / peak);
        }
    }
    worst
}

/// Summary statistics for one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_pnl: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub trade_count: usize,
    pub final_nav: f64,
}

impl Summary {
    pub fn compute(report: &BacktestReport, periods_per_year: f64) -> Self {
        Self {
            total_pnl: total_pnl(&report.trades),
            sharpe: sharpe_ratio(&report.nav_records, periods_per_year),
            max_drawdown: max_drawdown(&report.nav_records),
            win_rate: win_rate(&report.trades),
            trade_count: report.trades.len(),
            final_nav: report.final_nav,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::bars_from_closes;
    use chrono::{TimeZone, Utc};

    fn nav_series(values: &[f64]) -> Vec<NavRecord> {
        bars_from_closes(&vec![0.0; values.len()])
            .into_iter()
            .zip(values)
            .map(|(bar, &nav)| NavRecord {
                timestamp: bar.timestamp,
                nav,
                cash: nav,
                position_value: 0.0,
                position_size: 0.0,
            })
            .collect()
    }

    fn trade(pnl: f64) -> Trade {
        Trade {
            entry_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            exit_time: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            entry_price: 100.0,
            exit_price: 100.0 + pnl,
            pnl,
        }
    }

    #[test]
    fn total_pnl_sums_trades() {
        let trades = [trade(10.0), trade(-4.0), trade(6.0)];
        assert_eq!(total_pnl(&trades), 12.0);
    }

    #[test]
    fn win_rate_counts_positive_pnl() {
        let trades = [trade(10.0), trade(-4.0), trade(6.0), trade(0.0)];
        assert_eq!(win_rate(&trades), 0.5);
        assert_eq!(win_rate(&[]), 0.0);
    }

    #[test]
    fn max_drawdown_peak_to_trough() {
        // Peak 120, trough 90: drawdown 25%.
        let nav = nav_series(&[100.0, 120.0, 90.0, 110.0]);
        assert!((max_drawdown(&nav) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn max_drawdown_zero_for_rising_series() {
        let nav = nav_series(&[100.0, 110.0, 120.0]);
        assert_eq!(max_drawdown(&nav), 0.0);
    }

    #[test]
    fn sharpe_zero_for_constant_nav() {
        let nav = nav_series(&[100.0, 100.0, 100.0]);
        assert_eq!(sharpe_ratio(&nav, 252.0), 0.0);
    }

    #[test]
    fn sharpe_zero_for_short_series() {
        let nav = nav_series(&[100.0]);
        assert_eq!(sharpe_ratio(&nav, 252.0), 0.0);
    }

    #[test]
    fn sharpe_positive_for_upward_drift() {
        // Alternating +2% / +1% returns: positive mean, small variance.
        let nav = nav_series(&[100.0, 102.0, 103.02, 105.08, 106.13]);
        assert!(sharpe_ratio(&nav, 252.0) > 0.0);
    }

    #[test]
    fn sharpe_sign_follows_drift() {
        let down = nav_series(&[100.0, 98.0, 97.0, 95.0, 92.0]);
        assert!(sharpe_ratio(&down, 252.0) < 0.0);
    }
}
