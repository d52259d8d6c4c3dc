//! Per-bar strategy engine.
//!
//! One engine replaces the family of near-duplicate strategy variants: the
//! entry signal is a pluggable generator, direction gating and exit policy
//! are configuration. Each bar is processed in a fixed order — mark NAV,
//! check exits (trailing stop, then fixed stop, then reversal, at most one
//! per bar), then consider an entry if the account is flat with nothing
//! outstanding. Fills, cancels and expiries arrive asynchronously through
//! `on_broker_event`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::broker::{BrokerEvent, BrokerGateway};
use crate::domain::{Bar, ExpiryUnit, NavRecord, Order, OrderGroup, OrderId, OrderKind, OrderSide, Trade};
use crate::signals::{Direction, SignalGenerator, SignalSpec, TradeDirection};

/// How an entry signal is turned into orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum EntryStyle {
    /// Market order at the signal bar's close.
    Market,
    /// Limit entry at the signal bar's close plus a protective stop child
    /// offset by `spread` (below the close for longs, above for shorts).
    /// The entry leg expires after `ttl` units if unfilled.
    Bracket {
        spread: f64,
        ttl: u32,
        expiry_unit: ExpiryUnit,
    },
}

/// Full configuration of one strategy variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub signal: SignalSpec,
    pub direction: TradeDirection,
    pub entry: EntryStyle,
    /// Position size in units per trade.
    pub size: f64,
    pub initial_cash: f64,
    /// Trailing stop distance as a fraction of the best close since entry.
    pub trailing_stop_pct: f64,
    /// Fixed stop distance as a fraction of the entry price, if any.
    pub stop_loss_pct: Option<f64>,
    /// Close and flip when the signal points the other way.
    pub allow_reversal: bool,
    /// Flat cost charged once per round trip, in cash units.
    pub round_trip_cost: f64,
}

/// Position lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Flat,
    /// Entry submitted, not yet filled.
    PendingEntry,
    Long,
    Short,
    /// Exit submitted, not yet filled.
    Exiting,
}

/// Drives one strategy variant over a bar stream via a broker gateway.
pub struct StrategyEngine {
    config: EngineConfig,
    signal: Box<dyn SignalGenerator>,
    state: EngineState,
    history: Vec<Bar>,
    /// Close column of `history`, grown in step so signals never rebuild it.
    closes: Vec<f64>,
    cash: f64,
    /// Signed position in units; negative when short.
    position: f64,
    entry_price: Option<f64>,
    entry_time: Option<DateTime<Utc>>,
    /// Best close since entry: highest for longs, lowest for shorts.
    extreme: Option<f64>,
    bracket: Option<OrderGroup>,
    entry_order: Option<OrderId>,
    exit_order: Option<OrderId>,
    pending_direction: Option<Direction>,
    pending_reversal: Option<Direction>,
    nav_records: Vec<NavRecord>,
    trades: Vec<Trade>,
}

impl StrategyEngine {
    pub fn new(config: EngineConfig) -> Self {
        let signal = config.signal.build();
        let cash = config.initial_cash;
        Self {
            config,
            signal,
            state: EngineState::Flat,
            history: Vec::new(),
            closes: Vec::new(),
            cash,
            position: 0.0,
            entry_price: None,
            entry_time: None,
            extreme: None,
            bracket: None,
            entry_order: None,
            exit_order: None,
            pending_direction: None,
            pending_reversal: None,
            nav_records: Vec::new(),
            trades: Vec::new(),
        }
    }

    /// Process one bar. Exactly one `NavRecord` is appended per call.
    pub fn on_bar(&mut self, bar: &Bar, broker: &mut dyn BrokerGateway) {
        self.history.push(bar.clone());
        self.closes.push(bar.close);
        self.record_nav(bar);

        // An exit is already in flight; its fill may arrive bars later.
        // Re-evaluating stops here would submit a duplicate exit order.
        if self.state == EngineState::Exiting {
            return;
        }
        if self.position != 0.0 && self.check_exits(bar, broker) {
            return;
        }
        self.maybe_enter(bar, broker);
    }

    /// Handle a broker notification. Closing fills may submit the queued
    /// reversal entry, hence the gateway parameter.
    pub fn on_broker_event(&mut self, event: &BrokerEvent, broker: &mut dyn BrokerGateway) {
        match *event {
            BrokerEvent::Filled {
                order_id,
                price,
                timestamp,
            } => {
                if self.entry_order == Some(order_id) && self.position == 0.0 {
                    self.open_position(price, timestamp);
                } else if self.position != 0.0 {
                    self.close_position(order_id, price, timestamp, broker);
                }
            }
            BrokerEvent::Cancelled { order_id } | BrokerEvent::Expired { order_id } => {
                // An entry leg that died unfilled returns the engine to flat;
                // the broker already resolved its protective children.
                if self.entry_order == Some(order_id) {
                    debug!(order_id = order_id.0, "entry resolved unfilled");
                    self.entry_order = None;
                    self.pending_direction = None;
                    self.bracket = None;
                    self.state = EngineState::Flat;
                }
            }
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn nav_records(&self) -> &[NavRecord] {
        &self.nav_records
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn outstanding_bracket(&self) -> Option<&OrderGroup> {
        self.bracket.as_ref()
    }

    /// Consume the engine, yielding its bookkeeping.
    pub fn into_records(self) -> (Vec<NavRecord>, Vec<Trade>) {
        (self.nav_records, self.trades)
    }

    fn record_nav(&mut self, bar: &Bar) {
        let position_value = self.position * bar.close;
        self.nav_records.push(NavRecord {
            timestamp: bar.timestamp,
            nav: self.cash + position_value,
            cash: self.cash,
            position_value,
            position_size: self.position,
        });
    }

    /// Returns true if an exit was submitted this bar.
    fn check_exits(&mut self, bar: &Bar, broker: &mut dyn BrokerGateway) -> bool {
        let long = self.position > 0.0;
        let close = bar.close;

        let extreme = match self.extreme {
            Some(prev) if long => prev.max(close),
            Some(prev) => prev.min(close),
            None => close,
        };
        self.extreme = Some(extreme);

        // Trailing stop takes precedence over the fixed stop.
        let trailing_hit = if long {
            close <= extreme * (1.0 - self.config.trailing_stop_pct)
        } else {
            close >= extreme * (1.0 + self.config.trailing_stop_pct)
        };
        if trailing_hit {
            debug!(close, extreme, "trailing stop hit");
            self.submit_exit(broker);
            return true;
        }

        if let (Some(pct), Some(entry)) = (self.config.stop_loss_pct, self.entry_price) {
            let stop_hit = if long {
                close <= entry * (1.0 - pct)
            } else {
                close >= entry * (1.0 + pct)
            };
            if stop_hit {
                debug!(close, entry, "fixed stop hit");
                self.submit_exit(broker);
                return true;
            }
        }

        if self.config.allow_reversal {
            let opposite = if long { Direction::Short } else { Direction::Long };
            if self.signal.evaluate(&self.history, &self.closes) == Some(opposite)
                && self.config.direction.allows(opposite)
            {
                debug!(?opposite, "reversal signal");
                self.pending_reversal = Some(opposite);
                self.submit_exit(broker);
                return true;
            }
        }
        false
    }

    fn maybe_enter(&mut self, bar: &Bar, broker: &mut dyn BrokerGateway) {
        if self.state != EngineState::Flat
            || self.position != 0.0
            || self.bracket.is_some()
            || self.entry_order.is_some()
        {
            return;
        }
        if self.history.len() < self.signal.warmup_bars() {
            return;
        }
        let Some(direction) = self.signal.evaluate(&self.history, &self.closes) else {
            return;
        };
        if !self.config.direction.allows(direction) {
            return;
        }
        match self.config.entry {
            EntryStyle::Market => self.enter_market(direction, broker),
            EntryStyle::Bracket {
                spread,
                ttl,
                expiry_unit,
            } => self.enter_bracket(direction, bar.close, spread, ttl, expiry_unit, broker),
        }
    }

    fn enter_market(&mut self, direction: Direction, broker: &mut dyn BrokerGateway) {
        let side = entry_side(direction);
        let id = broker.submit(Order::new(side, OrderKind::Market, self.config.size));
        self.entry_order = Some(id);
        self.pending_direction = Some(direction);
        self.state = EngineState::PendingEntry;
    }

    fn enter_bracket(
        &mut self,
        direction: Direction,
        close: f64,
        spread: f64,
        ttl: u32,
        expiry_unit: ExpiryUnit,
        broker: &mut dyn BrokerGateway,
    ) {
        let side = entry_side(direction);
        let stop_price = match direction {
            Direction::Long => close * (1.0 - spread),
            Direction::Short => close * (1.0 + spread),
        };
        let entry = Order::new(side, OrderKind::Limit { price: close }, self.config.size)
            .with_ttl(ttl, expiry_unit);
        let stop = Order::new(
            side.opposite(),
            OrderKind::Stop { price: stop_price },
            self.config.size,
        );
        let group = broker.submit_bracket(vec![entry, stop]);
        debug!(group_id = group.id.0, close, stop_price, "bracket submitted");
        self.entry_order = group.order_ids.first().copied();
        self.bracket = Some(group);
        self.pending_direction = Some(direction);
        self.state = EngineState::PendingEntry;
    }

    fn submit_exit(&mut self, broker: &mut dyn BrokerGateway) {
        let side = if self.position > 0.0 {
            OrderSide::Sell
        } else {
            OrderSide::Buy
        };
        let id = broker.submit(Order::new(side, OrderKind::Market, self.position.abs()));
        self.exit_order = Some(id);
        self.state = EngineState::Exiting;
    }

    fn open_position(&mut self, price: f64, timestamp: DateTime<Utc>) {
        let Some(direction) = self.pending_direction.take() else {
            return;
        };
        let sign = match direction {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        };
        self.position = self.config.size * sign;
        self.cash -= price * self.position;
        self.entry_price = Some(price);
        self.entry_time = Some(timestamp);
        self.extreme = Some(price);
        self.entry_order = None;
        self.state = match direction {
            Direction::Long => EngineState::Long,
            Direction::Short => EngineState::Short,
        };
        debug!(price, position = self.position, "position opened");
    }

    fn close_position(
        &mut self,
        order_id: OrderId,
        price: f64,
        timestamp: DateTime<Utc>,
        broker: &mut dyn BrokerGateway,
    ) {
        let is_exit = self.exit_order == Some(order_id)
            || self
                .bracket
                .as_ref()
                .is_some_and(|group| group.contains(order_id));
        if !is_exit {
            return;
        }
        self.cash += price * self.position;
        self.cash -= self.config.round_trip_cost;
        let entry_price = self.entry_price.take().unwrap_or(price);
        let entry_time = self.entry_time.take().unwrap_or(timestamp);
        let pnl = (price - entry_price) * self.position - self.config.round_trip_cost;
        self.trades.push(Trade {
            entry_time,
            exit_time: timestamp,
            entry_price,
            exit_price: price,
            pnl,
        });
        debug!(price, pnl, "position closed");

        self.position = 0.0;
        self.extreme = None;
        self.exit_order = None;
        self.state = EngineState::Flat;
        if let Some(group) = self.bracket.take() {
            broker.cancel_group(&group);
        }
        if let Some(direction) = self.pending_reversal.take() {
            self.enter_market(direction, broker);
        }
    }
}

fn entry_side(direction: Direction) -> OrderSide {
    match direction {
        Direction::Long => OrderSide::Buy,
        Direction::Short => OrderSide::Sell,
    }
}
