use async_trait::async_trait;
use feed_core::{BalanceEvent, ExchangeId, OrderStatusEvent, TradeEvent};
use serde_json::Value;

use super::error::{FetchError, ParseError};
use super::records::{BookDelta, BookSnapshot, Channel, Envelope};
use super::symbols::SymbolRegistry;

/// Trait for fetching bootstrap order book snapshots
///
/// Implementations own routing, headers and retry policy. Uses domain-level
/// FetchError to avoid infrastructure leakage.
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    /// Fetch a snapshot for a canonical symbol
    async fn fetch_snapshot(&self, symbol: &str) -> Result<BookSnapshot, FetchError>;
}

/// Venue translation layer.
///
/// Pure functions over decoded JSON: no I/O and no state beyond the venue's
/// symbol table. Events are returned without `raw`; the dispatcher attaches
/// the shared payload.
pub trait VenueAdapter: Send + Sync {
    fn exchange_id(&self) -> ExchangeId;

    fn registry(&self) -> &SymbolRegistry;

    /// Decide whether a frame carries data, housekeeping, or a venue error
    fn inspect(&self, msg: &Value) -> Envelope;

    /// Map a raw venue topic to a canonical channel
    fn classify_channel(&self, topic: &str) -> Option<Channel>;

    /// Venue channel name for a canonical channel
    fn venue_channel(&self, channel: Channel) -> &'static str;

    fn parse_delta(&self, msg: &Value) -> Result<BookDelta, ParseError>;

    fn parse_snapshot(&self, response: &Value) -> Result<BookSnapshot, ParseError>;

    fn parse_trade(&self, msg: &Value, receipt_ms: i64) -> Result<TradeEvent, ParseError>;

    fn parse_order_status(
        &self,
        msg: &Value,
        receipt_ms: i64,
    ) -> Result<OrderStatusEvent, ParseError>;

    fn parse_balance(&self, msg: &Value, receipt_ms: i64) -> Result<BalanceEvent, ParseError>;

    /// Parse the REST balance listing fetched when balances are subscribed
    fn parse_balance_snapshot(
        &self,
        response: &Value,
        receipt_ms: i64,
    ) -> Result<Vec<BalanceEvent>, ParseError>;

    /// REST path (relative to the venue base URL) of the book snapshot
    fn snapshot_path(&self, venue_symbol: &str, depth: usize) -> String;

    /// REST path of the balance listing, if the venue has one
    fn balance_path(&self, account: Option<&str>) -> Option<String>;

    /// Subscribe frames for one channel, without request ids
    fn subscribe_messages(
        &self,
        channel: Channel,
        venue_symbols: &[String],
        account: Option<&str>,
    ) -> Vec<Value>;

    /// Application-level keepalive, if the venue needs one
    fn heartbeat_message(&self) -> Option<Value> {
        None
    }

    /// Maximum symbols one connection may subscribe
    fn max_symbols_per_connection(&self) -> Option<usize> {
        None
    }
}
