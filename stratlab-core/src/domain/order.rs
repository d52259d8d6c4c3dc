//! Order types, lifecycle states, and bracket groups.

use super::ids::{OrderGroupId, OrderId};
use serde::{Deserialize, Serialize};

/// Direction of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }

    /// Signed direction: +1 for buy, -1 for sell.
    pub fn sign(self) -> f64 {
        match self {
            OrderSide::Buy => 1.0,
            OrderSide::Sell => -1.0,
        }
    }
}

/// What kind of order and its price parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OrderKind {
    /// Fill at the reference price of the bar it is seen on.
    Market,
    /// Fill at the limit price or better.
    Limit { price: f64 },
    /// Trigger when price reaches the level, then fill as market.
    Stop { price: f64 },
}

/// Unit in which an order's time-to-live is measured.
///
/// The original strategies passed a bar count into a day-denominated
/// expiry; the unit is an explicit configuration here so neither reading
/// is silently assumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExpiryUnit {
    #[default]
    Bars,
    Days,
}

/// Order lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Resting at the broker, not yet filled.
    Pending,
    /// Completely filled (terminal).
    Filled,
    /// Cancelled (terminal): OCO sibling filled, group cancel, user cancel.
    Cancelled,
    /// Time-to-live elapsed before a fill (terminal).
    Expired,
}

/// A single order submitted to the broker gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub side: OrderSide,
    pub kind: OrderKind,
    pub size: f64,
    /// Time-to-live, measured in `expiry_unit` units. Zero means good
    /// until cancelled.
    pub ttl: u32,
    pub expiry_unit: ExpiryUnit,
    /// Entry leg this protective order hangs off, if any.
    pub parent: Option<OrderId>,
    /// Bracket group this order belongs to.
    pub group: Option<OrderGroupId>,
    pub status: OrderStatus,
}

impl Order {
    /// A fresh good-till-cancelled order. The id is assigned by the broker
    /// gateway on submission.
    pub fn new(side: OrderSide, kind: OrderKind, size: f64) -> Self {
        Self {
            id: OrderId(0),
            side,
            kind,
            size,
            ttl: 0,
            expiry_unit: ExpiryUnit::Bars,
            parent: None,
            group: None,
            status: OrderStatus::Pending,
        }
    }

    pub fn with_ttl(mut self, ttl: u32, unit: ExpiryUnit) -> Self {
        self.ttl = ttl;
        self.expiry_unit = unit;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == OrderStatus::Pending
    }
}

/// A bracket: sibling orders that live and die together.
///
/// Cancelling the group cancels every member; a fill of any member cancels
/// the others (one-cancels-others).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderGroup {
    pub id: OrderGroupId,
    pub order_ids: Vec<OrderId>,
}

impl OrderGroup {
    pub fn new(id: OrderGroupId, order_ids: Vec<OrderId>) -> Self {
        Self { id, order_ids }
    }

    pub fn contains(&self, order_id: OrderId) -> bool {
        self.order_ids.contains(&order_id)
    }

    /// Sibling ids of `order_id` within the group.
    pub fn siblings(&self, order_id: OrderId) -> impl Iterator<Item = OrderId> + '_ {
        self.order_ids.iter().copied().filter(move |&id| id != order_id)
    }
}
