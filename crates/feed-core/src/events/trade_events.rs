use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::RawPayload;
use crate::value_objects::{ExchangeId, Side};

/// Public trade print
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub exchange: ExchangeId,
    pub symbol: String,
    /// Taker side
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    pub trade_id: Option<String>,
    pub exchange_timestamp_ms: Option<i64>,
    pub receipt_timestamp_ms: i64,
    pub raw: Option<RawPayload>,
}

impl TradeEvent {
    pub fn notional(&self) -> Decimal {
        self.price * self.size
    }
}
