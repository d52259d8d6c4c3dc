//! Newtype identifiers for orders and order groups.

use serde::{Deserialize, Serialize};

/// Broker-assigned order handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u64);

/// Identifier of a bracket/OCO group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderGroupId(pub u64);
