//! Broker gateway boundary.
//!
//! The real matching engine and cost model live outside the core; the
//! engine only ever talks through `BrokerGateway`. `SimBroker` is the thin
//! default collaborator used by backtests and tests.

pub mod sim;

pub use sim::SimBroker;

use chrono::{DateTime, Utc};

use crate::domain::{Order, OrderGroup, OrderId};

/// Asynchronous notification from the broker back to the strategy layer.
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerEvent {
    Filled {
        order_id: OrderId,
        price: f64,
        timestamp: DateTime<Utc>,
    },
    Cancelled {
        order_id: OrderId,
    },
    Expired {
        order_id: OrderId,
    },
}

/// Order submission/cancellation interface.
///
/// `submit` and `submit_bracket` assign the authoritative order ids; any id
/// on the passed orders is ignored. Notifications are pulled with
/// `take_events` rather than pushed, so the backtest loop controls when
/// they reach the engine.
pub trait BrokerGateway {
    /// Submit a standalone order; returns the assigned handle.
    fn submit(&mut self, order: Order) -> OrderId;

    /// Submit linked sibling orders. The first order is the entry leg;
    /// later orders become its protective children, inactive until the
    /// entry fills. Cancellation of any member cancels the rest.
    fn submit_bracket(&mut self, orders: Vec<Order>) -> OrderGroup;

    fn cancel(&mut self, order_id: OrderId);

    /// Cancel every still-active member of a group.
    fn cancel_group(&mut self, group: &OrderGroup);

    /// Drain pending fill/cancel/expire notifications in arrival order.
    fn take_events(&mut self) -> Vec<BrokerEvent>;
}
