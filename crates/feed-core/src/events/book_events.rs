use serde::{Deserialize, Serialize};

use super::RawPayload;
use crate::value_objects::{ExchangeId, PriceLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookEventKind {
    Snapshot,
    Delta,
}

/// Level-2 book event.
///
/// For `Snapshot` the level lists are the full book, bids best-first
/// (descending) and asks best-first (ascending). For `Delta` they hold only
/// the changed levels, where a zero size removes the level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookEvent {
    pub exchange: ExchangeId,
    pub symbol: String,
    pub kind: BookEventKind,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    /// Book sequence cursor after this event, if the venue sequences its book
    pub sequence: Option<u64>,
    pub exchange_timestamp_ms: Option<i64>,
    pub receipt_timestamp_ms: i64,
    pub raw: Option<RawPayload>,
}

impl OrderBookEvent {
    pub fn is_snapshot(&self) -> bool {
        self.kind == BookEventKind::Snapshot
    }
}
