//! StratLab Core — engine, domain types, feeds, broker boundary.
//!
//! This crate contains the heart of the trading stack:
//! - Domain types (bars, orders, order groups, trades, NAV records, parameters)
//! - Market data feeds: deterministic replay and live websocket ingestion
//! - Broker gateway boundary with a thin fill simulator
//! - Per-bar strategy engine with bracket entries, trailing/fixed stops,
//!   and position lifecycle bookkeeping
//! - Pluggable signal generators (MA inflection, regression breakout, rule mask)

pub mod broker;
pub mod domain;
pub mod engine;
pub mod feed;
pub mod indicators;
pub mod signals;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: core types cross thread boundaries.
    ///
    /// The live feed hands bars from a background thread to the consumer, and
    /// optimizer workers run backtests in parallel; both need these bounds.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Order>();
        require_sync::<domain::Order>();
        require_send::<domain::OrderGroup>();
        require_sync::<domain::OrderGroup>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();
        require_send::<domain::NavRecord>();
        require_sync::<domain::NavRecord>();
        require_send::<domain::ParamVector>();
        require_sync::<domain::ParamVector>();

        require_send::<broker::BrokerEvent>();
        require_sync::<broker::BrokerEvent>();
        require_send::<broker::SimBroker>();
        require_sync::<broker::SimBroker>();

        require_send::<engine::EngineConfig>();
        require_send::<engine::StrategyEngine>();

        require_send::<feed::FeedPoll>();
        require_send::<feed::ReplayFeed>();
    }
}
