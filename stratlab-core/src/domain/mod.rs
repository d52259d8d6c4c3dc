//! Domain types: bars, orders, trades, NAV records, parameter vectors.

pub mod bar;
pub mod ids;
pub mod nav;
pub mod order;
pub mod params;
pub mod trade;

pub use bar::Bar;
pub use ids::{OrderGroupId, OrderId};
pub use nav::NavRecord;
pub use order::{ExpiryUnit, Order, OrderGroup, OrderKind, OrderSide, OrderStatus};
pub use params::{ParamError, ParamValue, ParamVector};
pub use trade::Trade;
