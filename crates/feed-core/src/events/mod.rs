//! Immutable events published to feed consumers.
//!
//! Every event carries the venue, the canonical symbol, exact-decimal values,
//! exchange and receipt timestamps in milliseconds, and the raw venue payload
//! it was translated from.

mod balance_events;
mod book_events;
mod order_events;
mod trade_events;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::value_objects::ExchangeId;

pub use balance_events::BalanceEvent;
pub use book_events::{BookEventKind, OrderBookEvent};
pub use order_events::{OrderStatus, OrderStatusEvent, OrderType};
pub use trade_events::TradeEvent;

/// Shared handle to the untouched venue message
pub type RawPayload = Arc<serde_json::Value>;

/// Any event the gateway publishes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEvent {
    OrderBook(OrderBookEvent),
    Trade(TradeEvent),
    OrderStatus(OrderStatusEvent),
    Balance(BalanceEvent),
}

impl FeedEvent {
    pub fn exchange(&self) -> &ExchangeId {
        match self {
            FeedEvent::OrderBook(e) => &e.exchange,
            FeedEvent::Trade(e) => &e.exchange,
            FeedEvent::OrderStatus(e) => &e.exchange,
            FeedEvent::Balance(e) => &e.exchange,
        }
    }

    /// Canonical symbol, or `None` for account-level events
    pub fn symbol(&self) -> Option<&str> {
        match self {
            FeedEvent::OrderBook(e) => Some(&e.symbol),
            FeedEvent::Trade(e) => Some(&e.symbol),
            FeedEvent::OrderStatus(e) => Some(&e.symbol),
            FeedEvent::Balance(_) => None,
        }
    }

    pub fn receipt_timestamp_ms(&self) -> i64 {
        match self {
            FeedEvent::OrderBook(e) => e.receipt_timestamp_ms,
            FeedEvent::Trade(e) => e.receipt_timestamp_ms,
            FeedEvent::OrderStatus(e) => e.receipt_timestamp_ms,
            FeedEvent::Balance(e) => e.receipt_timestamp_ms,
        }
    }
}

impl From<OrderBookEvent> for FeedEvent {
    fn from(e: OrderBookEvent) -> Self {
        FeedEvent::OrderBook(e)
    }
}

impl From<TradeEvent> for FeedEvent {
    fn from(e: TradeEvent) -> Self {
        FeedEvent::Trade(e)
    }
}

impl From<OrderStatusEvent> for FeedEvent {
    fn from(e: OrderStatusEvent) -> Self {
        FeedEvent::OrderStatus(e)
    }
}

impl From<BalanceEvent> for FeedEvent {
    fn from(e: BalanceEvent) -> Self {
        FeedEvent::Balance(e)
    }
}
