//! NavRecord — per-bar net asset value snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Net asset value at a bar: cash plus position marked at the bar close.
///
/// Exactly one record is appended per bar processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavRecord {
    pub timestamp: DateTime<Utc>,
    pub nav: f64,
    pub cash: f64,
    pub position_value: f64,
    pub position_size: f64,
}
