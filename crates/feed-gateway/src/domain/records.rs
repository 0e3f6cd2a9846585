//! Intermediate records produced by venue adapters.
//!
//! Adapters translate raw wire payloads into these types; the synchronizer
//! and dispatcher never look at venue JSON directly.

use feed_core::{BookSide, PriceLevel, RawPayload};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One price/size pair of a delta. Zero size removes the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelChange {
    pub side: BookSide,
    pub price: Decimal,
    pub size: Decimal,
}

impl LevelChange {
    pub fn new(side: BookSide, price: Decimal, size: Decimal) -> Self {
        LevelChange { side, price, size }
    }

    pub fn bid(price: Decimal, size: Decimal) -> Self {
        LevelChange::new(BookSide::Bid, price, size)
    }

    pub fn ask(price: Decimal, size: Decimal) -> Self {
        LevelChange::new(BookSide::Ask, price, size)
    }

    pub fn is_removal(&self) -> bool {
        self.size.is_zero()
    }

    pub fn level(&self) -> PriceLevel {
        PriceLevel::new(self.price, self.size)
    }
}

/// Inclusive venue sequence range covered by one delta batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceRange {
    pub start: u64,
    pub end: u64,
}

impl SequenceRange {
    pub fn new(start: u64, end: u64) -> Self {
        SequenceRange { start, end }
    }
}

impl fmt::Display for SequenceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// One atomic venue update batch for a single symbol
#[derive(Debug, Clone, PartialEq)]
pub struct BookDelta {
    /// Canonical symbol
    pub symbol: String,
    pub changes: Vec<LevelChange>,
    /// `None` for venues that do not sequence their book stream
    pub sequence: Option<SequenceRange>,
    pub exchange_timestamp_ms: Option<i64>,
    pub raw: Option<RawPayload>,
}

impl BookDelta {
    pub fn new(symbol: impl Into<String>, changes: Vec<LevelChange>) -> Self {
        BookDelta {
            symbol: symbol.into(),
            changes,
            sequence: None,
            exchange_timestamp_ms: None,
            raw: None,
        }
    }

    pub fn with_sequence(mut self, start: u64, end: u64) -> Self {
        self.sequence = Some(SequenceRange::new(start, end));
        self
    }

    pub fn with_exchange_timestamp(mut self, ts_ms: i64) -> Self {
        self.exchange_timestamp_ms = Some(ts_ms);
        self
    }
}

/// Full book state returned by a venue snapshot endpoint
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BookSnapshot {
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    pub sequence: Option<u64>,
    pub exchange_timestamp_ms: Option<i64>,
    pub raw: Option<RawPayload>,
}

impl BookSnapshot {
    pub fn new(bids: Vec<PriceLevel>, asks: Vec<PriceLevel>, sequence: Option<u64>) -> Self {
        BookSnapshot {
            bids,
            asks,
            sequence,
            exchange_timestamp_ms: None,
            raw: None,
        }
    }
}

/// Request for a bootstrap snapshot, tagged with the epoch it was issued in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRequest {
    pub symbol: String,
    pub epoch: u64,
}

/// Canonical channel tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    L2Book,
    Trades,
    OrderInfo,
    Balances,
}

impl Channel {
    /// Private channels need account credentials and are not symbol-scoped
    /// on every venue.
    pub fn is_private(&self) -> bool {
        matches!(self, Channel::OrderInfo | Channel::Balances)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::L2Book => write!(f, "l2_book"),
            Channel::Trades => write!(f, "trades"),
            Channel::OrderInfo => write!(f, "order_info"),
            Channel::Balances => write!(f, "balances"),
        }
    }
}

/// Shape of a decoded venue frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    /// Market or account data on a venue topic
    Data { topic: String },
    /// Welcome, ack, pong and similar housekeeping
    Control,
    /// The venue reported an error on the stream
    VenueError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_delta_builder() {
        let delta = BookDelta::new("BTC-USDT", vec![LevelChange::bid(dec!(100), dec!(0))])
            .with_sequence(52, 53)
            .with_exchange_timestamp(1_700_000_000_000);

        assert_eq!(delta.sequence, Some(SequenceRange::new(52, 53)));
        assert!(delta.changes[0].is_removal());
        assert_eq!(delta.sequence.unwrap().to_string(), "52..53");
    }

    #[test]
    fn test_channel_serde() {
        let channels: Vec<Channel> =
            serde_json::from_str(r#"["l2_book", "trades", "order_info", "balances"]"#).unwrap();
        assert_eq!(
            channels,
            vec![Channel::L2Book, Channel::Trades, Channel::OrderInfo, Channel::Balances]
        );
        assert!(Channel::Balances.is_private());
        assert!(!Channel::L2Book.is_private());
    }
}
