//! Trade — a completed round trip, recorded when a position fully closes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A complete round-trip trade: entry → exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_price: f64,
    /// Realized PnL net of the fixed round-trip cost.
    pub pnl: f64,
}

impl Trade {
    /// PnL as a fraction of the entry price.
    pub fn return_frac(&self) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        self.pnl / self.entry_price
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}
