//! Bar-driven fill simulator.
//!
//! Fill model: market orders fill at the close of the bar on which they are
//! submitted (or at the next open if no bar has been seen yet); limit and
//! stop orders rest and are tested against each subsequent bar's range,
//! gap-aware (an open already through the trigger fills at the open).
//! Protective children stay dormant until their entry leg fills; a fill or
//! terminal entry leg resolves the rest of the group.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::{
    Bar, ExpiryUnit, Order, OrderGroup, OrderGroupId, OrderId, OrderKind, OrderSide, OrderStatus,
};

use super::{BrokerEvent, BrokerGateway};

#[derive(Debug)]
struct SimOrder {
    order: Order,
    /// Full bars this order has rested through without filling.
    age_bars: u32,
    submitted_at: Option<DateTime<Utc>>,
}

/// In-memory `BrokerGateway` used by backtests.
#[derive(Debug, Default)]
pub struct SimBroker {
    orders: Vec<SimOrder>,
    groups: HashMap<OrderGroupId, OrderGroup>,
    events: Vec<BrokerEvent>,
    next_order: u64,
    next_group: u64,
    current_bar: Option<Bar>,
}

impl SimBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the simulation by one bar: test resting orders for fills,
    /// then age and expire what remains.
    pub fn on_bar(&mut self, bar: &Bar) {
        self.current_bar = Some(bar.clone());
        for i in 0..self.orders.len() {
            if self.orders[i].order.status != OrderStatus::Pending {
                continue;
            }
            if let Some(parent) = self.orders[i].order.parent {
                // Dormant until the entry leg fills.
                if self.status_of(parent) != Some(OrderStatus::Filled) {
                    continue;
                }
            }
            if let Some(price) = fill_price(&self.orders[i].order, bar) {
                self.fill(i, price, bar.timestamp);
                continue;
            }
            self.orders[i].age_bars += 1;
            if self.is_expired(i, bar.timestamp) {
                self.expire(i);
            }
        }
    }

    pub fn order(&self, order_id: OrderId) -> Option<&Order> {
        self.orders
            .iter()
            .find(|o| o.order.id == order_id)
            .map(|o| &o.order)
    }

    pub fn status_of(&self, order_id: OrderId) -> Option<OrderStatus> {
        self.order(order_id).map(|o| o.status)
    }

    pub fn active_order_count(&self) -> usize {
        self.orders.iter().filter(|o| o.order.is_active()).count()
    }

    fn register(&mut self, mut order: Order) -> OrderId {
        self.next_order += 1;
        let id = OrderId(self.next_order);
        order.id = id;
        order.status = OrderStatus::Pending;
        let submitted_at = self.current_bar.as_ref().map(|b| b.timestamp);
        self.orders.push(SimOrder {
            order,
            age_bars: 0,
            submitted_at,
        });
        id
    }

    fn index_of(&self, order_id: OrderId) -> Option<usize> {
        self.orders.iter().position(|o| o.order.id == order_id)
    }

    fn is_expired(&self, i: usize, now: DateTime<Utc>) -> bool {
        let slot = &self.orders[i];
        if slot.order.ttl == 0 {
            // Good till cancelled.
            return false;
        }
        match slot.order.expiry_unit {
            ExpiryUnit::Bars => slot.age_bars >= slot.order.ttl,
            ExpiryUnit::Days => slot
                .submitted_at
                .map(|t| (now - t).num_days() >= i64::from(slot.order.ttl))
                .unwrap_or(false),
        }
    }

    fn fill(&mut self, i: usize, price: f64, timestamp: DateTime<Utc>) {
        let id = self.orders[i].order.id;
        self.orders[i].order.status = OrderStatus::Filled;
        debug!(order_id = id.0, price, "order filled");
        self.events.push(BrokerEvent::Filled {
            order_id: id,
            price,
            timestamp,
        });
        // One-cancels-all: a fill resolves every sibling except the filled
        // order's own protective children.
        if let Some(group_id) = self.orders[i].order.group {
            for j in 0..self.orders.len() {
                let sibling = &self.orders[j].order;
                if sibling.group == Some(group_id)
                    && sibling.status == OrderStatus::Pending
                    && sibling.parent != Some(id)
                {
                    self.cancel_index(j);
                }
            }
        }
    }

    fn expire(&mut self, i: usize) {
        let id = self.orders[i].order.id;
        self.orders[i].order.status = OrderStatus::Expired;
        debug!(order_id = id.0, "order expired");
        self.events.push(BrokerEvent::Expired { order_id: id });
        self.resolve_children(id);
    }

    fn cancel_index(&mut self, i: usize) {
        let id = self.orders[i].order.id;
        self.orders[i].order.status = OrderStatus::Cancelled;
        self.events.push(BrokerEvent::Cancelled { order_id: id });
        self.resolve_children(id);
    }

    /// An entry leg that dies unfilled takes its dormant children with it.
    fn resolve_children(&mut self, parent: OrderId) {
        for j in 0..self.orders.len() {
            if self.orders[j].order.parent == Some(parent)
                && self.orders[j].order.status == OrderStatus::Pending
            {
                self.cancel_index(j);
            }
        }
    }
}

impl BrokerGateway for SimBroker {
    fn submit(&mut self, order: Order) -> OrderId {
        let id = self.register(order);
        let i = self.orders.len() - 1;
        // A market order seen mid-stream fills against the current close.
        if matches!(self.orders[i].order.kind, OrderKind::Market) {
            if let Some(bar) = self.current_bar.clone() {
                self.fill(i, bar.close, bar.timestamp);
            }
        }
        id
    }

    fn submit_bracket(&mut self, orders: Vec<Order>) -> OrderGroup {
        self.next_group += 1;
        let group_id = OrderGroupId(self.next_group);
        let mut ids = Vec::with_capacity(orders.len());
        let mut entry_id = None;
        for mut order in orders {
            order.group = Some(group_id);
            order.parent = entry_id;
            let id = self.register(order);
            if entry_id.is_none() {
                entry_id = Some(id);
            }
            ids.push(id);
        }
        let group = OrderGroup::new(group_id, ids);
        self.groups.insert(group_id, group.clone());
        group
    }

    fn cancel(&mut self, order_id: OrderId) {
        if let Some(i) = self.index_of(order_id) {
            if self.orders[i].order.status == OrderStatus::Pending {
                self.cancel_index(i);
            }
        }
    }

    fn cancel_group(&mut self, group: &OrderGroup) {
        for &id in &group.order_ids {
            self.cancel(id);
        }
    }

    fn take_events(&mut self) -> Vec<BrokerEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Price at which `order` would fill against `bar`, if at all.
fn fill_price(order: &Order, bar: &Bar) -> Option<f64> {
    match order.kind {
        OrderKind::Market => Some(bar.open),
        OrderKind::Limit { price } => match order.side {
            OrderSide::Buy => {
                if bar.open <= price {
                    Some(bar.open)
                } else if bar.low <= price {
                    Some(price)
                } else {
                    None
                }
            }
            OrderSide::Sell => {
                if bar.open >= price {
                    Some(bar.open)
                } else if bar.high >= price {
                    Some(price)
                } else {
                    None
                }
            }
        },
        OrderKind::Stop { price } => match order.side {
            OrderSide::Buy => {
                if bar.open >= price {
                    Some(bar.open)
                } else if bar.high >= price {
                    Some(price)
                } else {
                    None
                }
            }
            OrderSide::Sell => {
                if bar.open <= price {
                    Some(bar.open)
                } else if bar.low <= price {
                    Some(price)
                } else {
                    None
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::testutil::bars_from_closes;

    fn order(side: OrderSide, kind: OrderKind) -> Order {
        Order::new(side, kind, 1.0)
    }

    fn bar_with_range(close: f64, low: f64, high: f64) -> Bar {
        let mut bar = bars_from_closes(&[close]).remove(0);
        bar.low = low;
        bar.high = high;
        bar
    }

    #[test]
    fn market_order_fills_on_submission_bar() {
        let mut broker = SimBroker::new();
        let bar = bars_from_closes(&[100.0]).remove(0);
        broker.on_bar(&bar);
        let id = broker.submit(order(OrderSide::Buy, OrderKind::Market));
        let events = broker.take_events();
        assert_eq!(
            events,
            vec![BrokerEvent::Filled {
                order_id: id,
                price: 100.0,
                timestamp: bar.timestamp,
            }]
        );
    }

    #[test]
    fn resting_limit_buy_fills_when_low_crosses() {
        let mut broker = SimBroker::new();
        let id = broker.submit(order(OrderSide::Buy, OrderKind::Limit { price: 95.0 }));

        broker.on_bar(&bar_with_range(100.0, 98.0, 101.0));
        assert!(broker.take_events().is_empty());

        broker.on_bar(&bar_with_range(96.0, 94.0, 100.0));
        let events = broker.take_events();
        assert!(matches!(
            events.as_slice(),
            [BrokerEvent::Filled { order_id, price, .. }] if *order_id == id && *price == 95.0
        ));
    }

    #[test]
    fn gapped_open_fills_at_open() {
        let mut broker = SimBroker::new();
        broker.submit(order(OrderSide::Buy, OrderKind::Limit { price: 95.0 }));
        // Opens below the limit: fill at the better open.
        let mut bar = bar_with_range(92.0, 90.0, 93.0);
        bar.open = 91.0;
        broker.on_bar(&bar);
        let events = broker.take_events();
        assert!(matches!(
            events.as_slice(),
            [BrokerEvent::Filled { price, .. }] if *price == 91.0
        ));
    }

    #[test]
    fn stop_sell_triggers_on_drop() {
        let mut broker = SimBroker::new();
        let id = broker.submit(order(OrderSide::Sell, OrderKind::Stop { price: 90.0 }));

        broker.on_bar(&bar_with_range(95.0, 93.0, 96.0));
        assert!(broker.take_events().is_empty());

        broker.on_bar(&bar_with_range(91.0, 89.5, 95.0));
        let events = broker.take_events();
        assert!(matches!(
            events.as_slice(),
            [BrokerEvent::Filled { order_id, price, .. }] if *order_id == id && *price == 90.0
        ));
    }

    #[test]
    fn bracket_child_stays_dormant_until_entry_fills() {
        let mut broker = SimBroker::new();
        let entry = order(OrderSide::Buy, OrderKind::Limit { price: 95.0 });
        let stop = order(OrderSide::Sell, OrderKind::Stop { price: 93.0 });
        let group = broker.submit_bracket(vec![entry, stop]);

        // Bar trades through the stop price but not the entry: nothing fires.
        broker.on_bar(&bar_with_range(96.0, 95.5, 99.0));
        assert!(broker.take_events().is_empty());

        // Entry crosses; child remains resting, not cancelled.
        broker.on_bar(&bar_with_range(95.0, 94.5, 97.0));
        let events = broker.take_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            BrokerEvent::Filled { order_id, .. } if order_id == group.order_ids[0]
        ));
        assert_eq!(
            broker.status_of(group.order_ids[1]),
            Some(OrderStatus::Pending)
        );

        // Now the protective stop can fire.
        let mut bar = bar_with_range(92.0, 91.0, 95.0);
        bar.open = 94.5;
        broker.on_bar(&bar);
        let events = broker.take_events();
        assert!(matches!(
            events.as_slice(),
            [BrokerEvent::Filled { order_id, price, .. }]
                if *order_id == group.order_ids[1] && *price == 93.0
        ));
    }

    #[test]
    fn expired_entry_cancels_its_child() {
        let mut broker = SimBroker::new();
        let mut entry = order(OrderSide::Buy, OrderKind::Limit { price: 50.0 });
        entry.ttl = 2;
        let stop = order(OrderSide::Sell, OrderKind::Stop { price: 45.0 });
        let group = broker.submit_bracket(vec![entry, stop]);

        // Price never reaches the entry; after two bars the entry expires
        // and the dormant child is cancelled with it.
        broker.on_bar(&bar_with_range(100.0, 99.0, 101.0));
        assert!(broker.take_events().is_empty());
        broker.on_bar(&bar_with_range(100.0, 99.0, 101.0));
        let events = broker.take_events();
        assert_eq!(
            events,
            vec![
                BrokerEvent::Expired {
                    order_id: group.order_ids[0]
                },
                BrokerEvent::Cancelled {
                    order_id: group.order_ids[1]
                },
            ]
        );
        assert_eq!(broker.active_order_count(), 0);
    }

    #[test]
    fn day_based_expiry_uses_elapsed_time() {
        let mut broker = SimBroker::new();
        let bars = bars_from_closes(&[100.0; 12]); // 4h bars → 2 days span
        broker.on_bar(&bars[0]);
        let mut entry = order(OrderSide::Buy, OrderKind::Limit { price: 50.0 });
        entry.ttl = 1;
        entry.expiry_unit = ExpiryUnit::Days;
        let id = broker.submit(entry);

        for bar in &bars[1..6] {
            broker.on_bar(bar);
        }
        // Less than a full day elapsed.
        assert!(broker.take_events().is_empty());

        broker.on_bar(&bars[6]);
        assert_eq!(broker.take_events(), vec![BrokerEvent::Expired { order_id: id }]);
    }

    #[test]
    fn cancel_group_cancels_all_pending_members() {
        let mut broker = SimBroker::new();
        let entry = order(OrderSide::Buy, OrderKind::Limit { price: 50.0 });
        let stop = order(OrderSide::Sell, OrderKind::Stop { price: 45.0 });
        let group = broker.submit_bracket(vec![entry, stop]);
        broker.cancel_group(&group);
        let events = broker.take_events();
        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .all(|e| matches!(e, BrokerEvent::Cancelled { .. })));
        assert_eq!(broker.active_order_count(), 0);
    }

    #[test]
    fn sibling_exit_fill_cancels_the_other_exit() {
        let mut broker = SimBroker::new();
        // Entry plus two protective children: stop below, target above.
        let entry = order(OrderSide::Buy, OrderKind::Limit { price: 100.0 });
        let stop = order(OrderSide::Sell, OrderKind::Stop { price: 95.0 });
        let target = order(OrderSide::Sell, OrderKind::Limit { price: 105.0 });
        let group = broker.submit_bracket(vec![entry, stop, target]);

        broker.on_bar(&bar_with_range(100.0, 99.0, 101.0));
        let _ = broker.take_events(); // entry fill

        let mut bar = bar_with_range(105.5, 103.0, 106.0);
        bar.open = 103.5;
        broker.on_bar(&bar);
        let events = broker.take_events();
        assert!(matches!(
            events[0],
            BrokerEvent::Filled { order_id, price, .. }
                if order_id == group.order_ids[2] && price == 105.0
        ));
        assert_eq!(
            broker.status_of(group.order_ids[1]),
            Some(OrderStatus::Cancelled)
        );
    }
}
