use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::RawPayload;
use crate::value_objects::ExchangeId;

/// Account balance for one currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceEvent {
    pub exchange: ExchangeId,
    pub currency: String,
    pub available: Decimal,
    /// Held by open orders or otherwise not withdrawable
    pub reserved: Decimal,
    pub account: Option<String>,
    pub exchange_timestamp_ms: Option<i64>,
    pub receipt_timestamp_ms: i64,
    pub raw: Option<RawPayload>,
}

impl BalanceEvent {
    pub fn total(&self) -> Decimal {
        self.available + self.reserved
    }
}
