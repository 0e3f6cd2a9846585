use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::RawPayload;
use crate::value_objects::{ExchangeId, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Canceled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Limit,
    Market,
}

/// Status change of one of the account's own orders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusEvent {
    pub exchange: ExchangeId,
    pub symbol: String,
    pub order_id: String,
    pub side: Side,
    pub order_type: Option<OrderType>,
    pub status: OrderStatus,
    pub price: Option<Decimal>,
    /// Original order size
    pub size: Decimal,
    pub remaining: Decimal,
    pub account: Option<String>,
    pub exchange_timestamp_ms: Option<i64>,
    pub receipt_timestamp_ms: i64,
    pub raw: Option<RawPayload>,
}

impl OrderStatusEvent {
    pub fn filled(&self) -> Decimal {
        self.size - self.remaining
    }
}
