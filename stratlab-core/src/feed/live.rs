//! Live kline ingestion over a blocking websocket.
//!
//! A dedicated background thread owns the socket: it decodes incoming kline
//! messages, enqueues a `Bar` only when the interval-closed flag is set, and
//! on any connection error logs, sleeps a fixed backoff and reconnects
//! forever. The consumer pulls through `FeedChannel` with a bounded wait,
//! so a polling scheduler is never blocked indefinitely.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};
use tungstenite::Message;

use crate::domain::Bar;

use super::{BarFeed, FeedPoll};

/// Errors from decoding a single stream message. Recovered locally: the
/// offending message is dropped and logged, never surfaced to the strategy.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed kline message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid interval-start timestamp {0}")]
    BadTimestamp(i64),
}

#[derive(Debug, Deserialize)]
struct KlineEnvelope {
    k: KlinePayload,
}

#[derive(Debug, Deserialize)]
struct KlinePayload {
    /// Interval start, epoch milliseconds.
    t: i64,
    o: String,
    h: String,
    l: String,
    c: String,
    v: String,
    /// Interval-closed flag; only closed intervals become bars.
    x: bool,
}

/// Decode one kline stream message.
///
/// Returns `Ok(None)` for an in-progress interval (closed flag unset).
pub fn decode_kline(text: &str) -> Result<Option<Bar>, DecodeError> {
    let envelope: KlineEnvelope = serde_json::from_str(text)?;
    let k = envelope.k;
    if !k.x {
        return Ok(None);
    }
    let timestamp = parse_millis(k.t)?;
    // Price fields arrive as strings; a failed parse is a malformed message.
    let bar = Bar {
        timestamp,
        open: parse_price(&k.o)?,
        high: parse_price(&k.h)?,
        low: parse_price(&k.l)?,
        close: parse_price(&k.c)?,
        volume: parse_price(&k.v)?,
    };
    Ok(Some(bar))
}

fn parse_price(s: &str) -> Result<f64, DecodeError> {
    s.parse::<f64>().map_err(|_| {
        DecodeError::Malformed(<serde_json::Error as serde::de::Error>::custom(format!(
            "non-numeric price field '{s}'"
        )))
    })
}

fn parse_millis(ms: i64) -> Result<DateTime<Utc>, DecodeError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or(DecodeError::BadTimestamp(ms))
}

/// Owned single-producer single-consumer queue between the ingestion thread
/// and the polling consumer.
///
/// Unbounded FIFO; arrival order equals interval-close order because the
/// source emits in time order. `poll` waits at most `timeout` and reports
/// `Pending` rather than blocking.
#[derive(Debug)]
pub struct FeedChannel {
    tx: Sender<Bar>,
    rx: Receiver<Bar>,
}

impl FeedChannel {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<Bar> {
        self.tx.clone()
    }

    pub fn poll(&self, timeout: Duration) -> FeedPoll {
        match self.rx.recv_timeout(timeout) {
            Ok(bar) => FeedPoll::Bar(bar),
            // The producer thread holds a sender for the feed's lifetime,
            // so Disconnected only happens after LiveFeed is dropped.
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                FeedPoll::Pending
            }
        }
    }
}

impl Default for FeedChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the live feed connection.
#[derive(Debug, Clone)]
pub struct LiveFeedConfig {
    /// Websocket URL of the kline stream, e.g.
    /// `wss://stream.binance.com:9443/ws/btcusdt@kline_1m`.
    pub url: String,
    /// Fixed wait before reconnecting after a connection failure.
    pub reconnect_backoff: Duration,
    /// Maximum wait inside a single `next_bar` call.
    pub poll_timeout: Duration,
}

impl Default for LiveFeedConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            reconnect_backoff: Duration::from_secs(5),
            poll_timeout: Duration::from_secs(1),
        }
    }
}

/// Errors surfaced to the caller at feed construction time. Everything
/// after a successful spawn is recovered internally.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("invalid stream url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to spawn ingestion thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Live variant of `BarFeed`: background ingestion thread plus a polled
/// channel. Never reports `Finished`.
pub struct LiveFeed {
    channel: FeedChannel,
    poll_timeout: Duration,
    _worker: JoinHandle<()>,
}

impl LiveFeed {
    /// Validate the URL, spawn the ingestion thread, and return the
    /// consumer handle.
    pub fn connect(config: LiveFeedConfig) -> Result<Self, FeedError> {
        url::Url::parse(&config.url).map_err(|source| FeedError::InvalidUrl {
            url: config.url.clone(),
            source,
        })?;
        let channel = FeedChannel::new();
        let tx = channel.sender();
        let poll_timeout = config.poll_timeout;
        let worker = thread::Builder::new()
            .name("live-feed".into())
            .spawn(move || ingest_loop(config, tx))?;
        Ok(Self {
            channel,
            poll_timeout,
            _worker: worker,
        })
    }
}

impl BarFeed for LiveFeed {
    fn next_bar(&mut self) -> FeedPoll {
        self.channel.poll(self.poll_timeout)
    }
}

/// Connect → read → decode → enqueue, reconnecting forever on failure.
///
/// Exits only when the consumer side has been dropped (send fails).
fn ingest_loop(config: LiveFeedConfig, tx: Sender<Bar>) {
    loop {
        let mut socket = match tungstenite::connect(config.url.as_str()) {
            Ok((socket, _response)) => {
                info!(url = %config.url, "live feed connected");
                socket
            }
            Err(err) => {
                warn!(error = %err, "live feed connect failed, retrying");
                thread::sleep(config.reconnect_backoff);
                continue;
            }
        };

        loop {
            let message = match socket.read() {
                Ok(message) => message,
                Err(err) => {
                    warn!(error = %err, "live feed read failed, reconnecting");
                    break;
                }
            };
            match message {
                Message::Text(text) => match decode_kline(text.as_str()) {
                    Ok(Some(bar)) => {
                        if tx.send(bar).is_err() {
                            // Consumer gone; stop ingesting.
                            return;
                        }
                    }
                    Ok(None) => {} // interval still open
                    Err(err) => warn!(error = %err, "dropping malformed message"),
                },
                Message::Ping(payload) => {
                    let _ = socket.send(Message::Pong(payload));
                }
                Message::Close(_) => {
                    warn!("live feed stream closed by server, reconnecting");
                    break;
                }
                _ => {}
            }
        }
        thread::sleep(config.reconnect_backoff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kline_json(closed: bool) -> String {
        format!(
            r#"{{"e":"kline","E":1704170400123,"s":"BTCUSDT",
                "k":{{"t":1704170400000,"T":1704170459999,"s":"BTCUSDT","i":"1m",
                "o":"42000.1","h":"42100.5","l":"41950.0","c":"42050.2",
                "v":"13.37","x":{closed}}}}}"#
        )
    }

    #[test]
    fn closed_interval_decodes_to_bar() {
        let bar = decode_kline(&kline_json(true)).unwrap().unwrap();
        assert_eq!(bar.timestamp.timestamp_millis(), 1_704_170_400_000);
        assert_eq!(bar.open, 42000.1);
        assert_eq!(bar.high, 42100.5);
        assert_eq!(bar.low, 41950.0);
        assert_eq!(bar.close, 42050.2);
        assert_eq!(bar.volume, 13.37);
    }

    #[test]
    fn open_interval_decodes_to_none() {
        assert!(decode_kline(&kline_json(false)).unwrap().is_none());
    }

    #[test]
    fn malformed_message_is_an_error() {
        assert!(decode_kline("not json").is_err());
        assert!(decode_kline(r#"{"k":{"t":1,"o":"x","h":"1","l":"1","c":"1","v":"1","x":true}}"#).is_err());
    }

    /// Scenario: an in-progress interval enqueues nothing; the same interval
    /// arriving later with the closed flag enqueues exactly one bar.
    #[test]
    fn only_closed_intervals_reach_the_channel() {
        let channel = FeedChannel::new();
        let tx = channel.sender();

        for text in [kline_json(false), kline_json(true)] {
            if let Ok(Some(bar)) = decode_kline(&text) {
                tx.send(bar).unwrap();
            }
        }

        assert!(matches!(
            channel.poll(Duration::from_millis(10)),
            FeedPoll::Bar(_)
        ));
        assert_eq!(channel.poll(Duration::from_millis(10)), FeedPoll::Pending);
    }

    #[test]
    fn invalid_url_is_rejected_before_spawning() {
        let config = LiveFeedConfig {
            url: "not a url".into(),
            ..LiveFeedConfig::default()
        };
        assert!(matches!(
            LiveFeed::connect(config),
            Err(FeedError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn poll_times_out_to_pending() {
        let channel = FeedChannel::new();
        assert_eq!(channel.poll(Duration::from_millis(1)), FeedPoll::Pending);
    }

    #[test]
    fn channel_preserves_arrival_order() {
        let channel = FeedChannel::new();
        let tx = channel.sender();
        for i in 0..3 {
            let mut bar = decode_kline(&kline_json(true)).unwrap().unwrap();
            bar.close = 100.0 + i as f64;
            tx.send(bar).unwrap();
        }
        for i in 0..3 {
            match channel.poll(Duration::from_millis(10)) {
                FeedPoll::Bar(bar) => assert_eq!(bar.close, 100.0 + i as f64),
                other => panic!("expected bar, got {other:?}"),
            }
        }
    }
}
