//! Market data feeds — a single pull interface over replay and live sources.

pub mod live;

pub use live::{decode_kline, DecodeError, FeedChannel, FeedError, LiveFeed, LiveFeedConfig};

use crate::domain::Bar;

/// Result of one pull from a feed.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedPoll {
    /// The next bar in sequence.
    Bar(Bar),
    /// No bar available yet; poll again later. Live feeds only.
    Pending,
    /// End of stream. Replay feeds only; a live feed never finishes.
    Finished,
}

/// Produces an ordered sequence of bars.
pub trait BarFeed {
    fn next_bar(&mut self) -> FeedPoll;
}

/// Deterministic replay of a finite, pre-sorted historical series.
///
/// A fresh instance is constructed per backtest run, so runs never share a
/// cursor.
#[derive(Debug, Clone)]
pub struct ReplayFeed {
    bars: Vec<Bar>,
    cursor: usize,
}

impl ReplayFeed {
    pub fn new(bars: Vec<Bar>) -> Self {
        debug_assert!(
            bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp),
            "replay bars must be strictly time-ordered"
        );
        Self { bars, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

impl BarFeed for ReplayFeed {
    fn next_bar(&mut self) -> FeedPoll {
        match self.bars.get(self.cursor) {
            Some(bar) => {
                self.cursor += 1;
                FeedPoll::Bar(bar.clone())
            }
            None => FeedPoll::Finished,
        }
    }
}
