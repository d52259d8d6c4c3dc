//! Backtest harness — one hermetic run per call.
//!
//! Each run constructs a fresh replay feed, broker and engine; no state
//! survives across calls, so runs are independently repeatable and safe to
//! execute in parallel from optimizer workers.

use stratlab_core::broker::{BrokerGateway, SimBroker};
use stratlab_core::domain::{Bar, NavRecord, Trade};
use stratlab_core::engine::{EngineConfig, StrategyEngine};
use stratlab_core::feed::{BarFeed, FeedPoll, ReplayFeed};
use tracing::debug;

/// Accumulated output of one backtest run.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestReport {
    pub nav_records: Vec<NavRecord>,
    pub trades: Vec<Trade>,
    pub initial_cash: f64,
    pub final_nav: f64,
}

impl BacktestReport {
    /// Net change in account value over the run.
    pub fn nav_gain(&self) -> f64 {
        self.final_nav - self.initial_cash
    }
}

/// Replay `bars` through a fresh engine and broker.
///
/// Per bar: the broker evaluates resting orders first, its notifications
/// are relayed into the engine, then the engine processes the bar and any
/// same-bar fills are relayed back. Notifications never cross a bar
/// boundary unprocessed.
pub fn run_backtest(config: &EngineConfig, bars: &[Bar]) -> BacktestReport {
    let mut feed = ReplayFeed::new(bars.to_vec());
    let mut broker = SimBroker::new();
    let mut engine = StrategyEngine::new(config.clone());
    let mut last_close = None;

    loop {
        let bar = match feed.next_bar() {
            FeedPoll::Bar(bar) => bar,
            FeedPoll::Finished => break,
            // Replay feeds never report Pending.
            FeedPoll::Pending => continue,
        };
        broker.on_bar(&bar);
        relay(&mut engine, &mut broker);
        engine.on_bar(&bar, &mut broker);
        relay(&mut engine, &mut broker);
        last_close = Some(bar.close);
    }

    let initial_cash = config.initial_cash;
    // Mark after the last bar's fills: the per-bar NAV record is written
    // before same-bar exits, so it would miss the final round-trip cost.
    let final_nav = engine.cash() + engine.position() * last_close.unwrap_or(0.0);
    let (nav_records, trades) = engine.into_records();
    debug!(
        bars = bars.len(),
        trades = trades.len(),
        final_nav,
        "backtest complete"
    );
    BacktestReport {
        nav_records,
        trades,
        initial_cash,
        final_nav,
    }
}

/// Drain broker notifications into the engine until none remain. Closing
/// fills can submit reversal entries that fill in the same pass, so one
/// drain is not always enough.
fn relay(engine: &mut StrategyEngine, broker: &mut SimBroker) {
    loop {
        let events = broker.take_events();
        if events.is_empty() {
            return;
        }
        for event in &events {
            engine.on_broker_event(event, broker);
        }
    }
}
