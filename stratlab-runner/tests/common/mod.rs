//! Shared fixtures for integration tests.

use chrono::{Duration, TimeZone, Utc};
use stratlab_core::domain::Bar;
use stratlab_core::engine::{EngineConfig, EntryStyle};
use stratlab_core::signals::{SignalSpec, TradeDirection};

/// Bars with the given closes, one per 4h interval, flat OHLC around close.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            timestamp: start + Duration::hours(4 * i as i64),
            open: close,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume: 1_000.0,
        })
        .collect()
}

/// Long-only market-entry variant with a short inflection signal.
pub fn ma3_config() -> EngineConfig {
    EngineConfig {
        signal: SignalSpec::MaInflection {
            period: 3,
            smoothed: false,
        },
        direction: TradeDirection::LongOnly,
        entry: EntryStyle::Market,
        size: 1.0,
        initial_cash: 10_000.0,
        trailing_stop_pct: 0.5,
        stop_loss_pct: None,
        allow_reversal: false,
        round_trip_cost: 10.0,
    }
}
